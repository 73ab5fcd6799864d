use crate::{DomainResult, TelemetrySample};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Inbound event type the gateway acts on.
pub const ACTIVATION_STATUS_RESPONSE: &str = "activation-status-response";

/// Pairing status value that activates the device.
pub const PAIRED_STATUS: &str = "PAIRED";

/// Outbound protocol event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    ActivationRequest,
    DrivingSessionStart,
    DrivingSessionEnd,
    Metric,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ActivationRequest => "activation-request",
            EventKind::DrivingSessionStart => "driving-session-start",
            EventKind::DrivingSessionEnd => "driving-session-end",
            EventKind::Metric => "metric",
        }
    }

    /// Topic suffix appended to `{prefix}/{device_id}`.
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            EventKind::ActivationRequest => "/activation-request",
            EventKind::DrivingSessionStart => "/driving-session-start",
            EventKind::DrivingSessionEnd => "/driving-session-end",
            EventKind::Metric => "/metric",
        }
    }
}

/// Outbound event envelope: `{type, subject, data}` with the device id
/// as subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub subject: String,
    pub data: serde_json::Value,
}

impl ProtocolEvent {
    pub fn activation_request(device_id: &str) -> Self {
        Self {
            kind: EventKind::ActivationRequest,
            subject: device_id.to_string(),
            data: json!({ "device": device_id }),
        }
    }

    pub fn driving_session_start(device_id: &str, vehicle_id: &str) -> Self {
        Self {
            kind: EventKind::DrivingSessionStart,
            subject: device_id.to_string(),
            data: json!({ "device": device_id, "vehicle": vehicle_id }),
        }
    }

    pub fn driving_session_end(device_id: &str, vehicle_id: &str) -> Self {
        Self {
            kind: EventKind::DrivingSessionEnd,
            subject: device_id.to_string(),
            data: json!({ "device": device_id, "vehicle": vehicle_id }),
        }
    }

    pub fn metric(sample: &TelemetrySample) -> DomainResult<Self> {
        Ok(Self {
            kind: EventKind::Metric,
            subject: sample.device_id.clone(),
            data: serde_json::to_value(sample)?,
        })
    }

    pub fn topic_suffix(&self) -> &'static str {
        self.kind.topic_suffix()
    }

    pub fn to_payload(&self) -> DomainResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Inbound envelope, parsed loosely so unrecognized types can be
/// logged and dropped instead of failing the whole message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl InboundEnvelope {
    pub fn parse(payload: &[u8]) -> DomainResult<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Payload of an activation-status-response event.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivationStatus {
    pub status: String,
}

impl ActivationStatus {
    pub fn is_paired(&self) -> bool {
        self.status == PAIRED_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObdReading;

    #[test]
    fn test_event_kind_serializes_kebab_case() {
        let event = ProtocolEvent::driving_session_start("dev-001", "vin-001");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "driving-session-start");
        assert_eq!(json["subject"], "dev-001");
        assert_eq!(json["data"]["device"], "dev-001");
        assert_eq!(json["data"]["vehicle"], "vin-001");
    }

    #[test]
    fn test_topic_suffixes() {
        assert_eq!(
            EventKind::ActivationRequest.topic_suffix(),
            "/activation-request"
        );
        assert_eq!(
            EventKind::DrivingSessionEnd.topic_suffix(),
            "/driving-session-end"
        );
        assert_eq!(EventKind::Metric.topic_suffix(), "/metric");
    }

    #[test]
    fn test_metric_event_carries_sample_fields() {
        let sample = TelemetrySample::new(
            "vin-001",
            "dev-001",
            ObdReading {
                fuel_rate: 1.0,
                vehicle_speed: 2.0,
                engine_speed: 3.0,
                relative_accel_pos: 4.0,
            },
        );
        let event = ProtocolEvent::metric(&sample).unwrap();
        assert_eq!(event.subject, "dev-001");
        assert_eq!(event.data["vehicle"], "vin-001");
        assert_eq!(event.data["obd_data"]["engine_speed"], 3.0);
    }

    #[test]
    fn test_inbound_parse_recognizes_activation_response() {
        let payload = br#"{"type":"activation-status-response","subject":"dev-001","data":{"status":"PAIRED"}}"#;
        let envelope = InboundEnvelope::parse(payload).unwrap();
        assert_eq!(envelope.kind, ACTIVATION_STATUS_RESPONSE);
        let status: ActivationStatus = serde_json::from_value(envelope.data).unwrap();
        assert!(status.is_paired());
    }

    #[test]
    fn test_inbound_parse_tolerates_unknown_type() {
        let payload = br#"{"type":"firmware-update","data":{"url":"x"}}"#;
        let envelope = InboundEnvelope::parse(payload).unwrap();
        assert_eq!(envelope.kind, "firmware-update");
    }

    #[test]
    fn test_inbound_parse_rejects_garbage() {
        assert!(InboundEnvelope::parse(b"not json").is_err());
    }

    #[test]
    fn test_unpaired_status_is_not_paired() {
        let status = ActivationStatus {
            status: "UNPAIRED".to_string(),
        };
        assert!(!status.is_paired());
    }
}
