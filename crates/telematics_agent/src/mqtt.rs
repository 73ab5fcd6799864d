use crate::config::AgentConfig;
use agent_domain::{
    ActivationStatus, AgentState, DomainError, DomainResult, EventPublisher, InboundEnvelope,
    ProtocolEvent, ACTIVATION_STATUS_RESPONSE,
};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delivery assurance for every outbound event.
const PUBLISH_QOS: QoS = QoS::ExactlyOnce;

const STATUS_SUFFIX: &str = "/status";

/// Owns the broker session: activation handshake, outbound event
/// publishes (retained, QoS 2), and the inbound subscription for this
/// device.
pub struct MqttGateway {
    client: AsyncClient,
    topic_prefix: String,
    device_id: String,
}

/// Open a broker session authenticated with the given access token.
/// The last-will flips the retained online status to false if the
/// session drops.
pub fn connect(config: &AgentConfig, access_token: &str) -> DomainResult<(MqttGateway, EventLoop)> {
    let mut options = MqttOptions::new(&config.device_id, &config.mqtt_host, config.mqtt_port);
    options.set_keep_alive(Duration::from_secs(30));
    options.set_credentials(&config.mqtt_username, access_token);

    let status_topic = format!(
        "{}/{}{}",
        config.topic_prefix, config.device_id, STATUS_SUFFIX
    );
    let will_payload = serde_json::to_vec(&serde_json::json!({ "online": false }))?;
    options.set_last_will(LastWill::new(&status_topic, will_payload, PUBLISH_QOS, true));

    let (client, eventloop) = AsyncClient::new(options, 100);
    info!(
        host = %config.mqtt_host,
        port = config.mqtt_port,
        device_id = %config.device_id,
        "opening broker session"
    );

    Ok((
        MqttGateway {
            client,
            topic_prefix: config.topic_prefix.clone(),
            device_id: config.device_id.clone(),
        },
        eventloop,
    ))
}

impl MqttGateway {
    fn topic(&self, suffix: &str) -> String {
        format!("{}/{}{}", self.topic_prefix, self.device_id, suffix)
    }

    /// Startup handshake: publish the retained online status, announce
    /// activation, then subscribe to this device's inbound wildcard.
    pub async fn announce(&self) -> DomainResult<()> {
        let online = serde_json::to_vec(&serde_json::json!({ "online": true }))?;
        self.client
            .publish(self.topic(STATUS_SUFFIX), PUBLISH_QOS, true, online)
            .await
            .map_err(transport_err)?;

        self.publish(&ProtocolEvent::activation_request(&self.device_id))
            .await?;

        let filter = self.topic("/+");
        self.client
            .subscribe(&filter, QoS::AtLeastOnce)
            .await
            .map_err(transport_err)?;
        info!(filter = %filter, "subscribed to inbound events");
        Ok(())
    }

    pub async fn disconnect(&self) -> DomainResult<()> {
        self.client.disconnect().await.map_err(transport_err)
    }
}

#[async_trait]
impl EventPublisher for MqttGateway {
    async fn publish(&self, event: &ProtocolEvent) -> DomainResult<()> {
        let topic = self.topic(event.topic_suffix());
        let payload = event.to_payload()?;
        self.client
            .publish(&topic, PUBLISH_QOS, true, payload)
            .await
            .map_err(transport_err)?;
        debug!(topic = %topic, kind = event.kind.as_str(), "published event");
        Ok(())
    }
}

fn transport_err(err: rumqttc::ClientError) -> DomainError {
    DomainError::Transport(err.to_string())
}

/// Pump the broker event loop and dispatch inbound publishes until
/// cancelled. A transport error ends the loop; supervision is a
/// deployment concern, the gateway does not reconnect on its own.
pub async fn run_event_loop(
    state: Arc<AgentState>,
    mut eventloop: EventLoop,
    token: CancellationToken,
) -> Result<(), anyhow::Error> {
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("event loop cancelled");
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        handle_inbound(&state, &publish.topic, &publish.payload);
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("subscription acknowledged");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        error!(error = %err, "MQTT event loop error");
                        return Err(anyhow::anyhow!("broker session lost: {err}"));
                    }
                }
            }
        }
    }
}

/// Parse one inbound message. The only recognized type is
/// `activation-status-response`; a PAIRED status activates the device,
/// everything else is logged and dropped.
pub(crate) fn handle_inbound(state: &AgentState, topic: &str, payload: &[u8]) {
    let envelope = match InboundEnvelope::parse(payload) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(topic = %topic, error = %err, "dropping malformed inbound message");
            return;
        }
    };

    match envelope.kind.as_str() {
        ACTIVATION_STATUS_RESPONSE => {
            match serde_json::from_value::<ActivationStatus>(envelope.data) {
                Ok(status) if status.is_paired() => {
                    info!("activation confirmed by platform");
                    state.set_active(true);
                }
                Ok(status) => {
                    info!(status = %status.status, "device not paired");
                }
                Err(err) => {
                    warn!(topic = %topic, error = %err, "activation response without status field");
                }
            }
        }
        other => {
            debug!(kind = %other, topic = %topic, "ignoring unrecognized event type");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_domain::{Device, Vehicle};

    fn state() -> AgentState {
        AgentState::new(Device::new("vin-001", "dev-001"), Vehicle::new("vin-001"))
    }

    #[test]
    fn test_paired_response_activates_device() {
        let state = state();
        handle_inbound(
            &state,
            "telematics/dev-001/activation-status-response",
            br#"{"type":"activation-status-response","data":{"status":"PAIRED"}}"#,
        );
        assert!(state.snapshot().active);
    }

    #[test]
    fn test_unpaired_response_leaves_device_inactive() {
        let state = state();
        handle_inbound(
            &state,
            "telematics/dev-001/activation-status-response",
            br#"{"type":"activation-status-response","data":{"status":"UNPAIRED"}}"#,
        );
        assert!(!state.snapshot().active);
    }

    #[test]
    fn test_unrecognized_type_is_dropped() {
        let state = state();
        handle_inbound(
            &state,
            "telematics/dev-001/firmware-update",
            br#"{"type":"firmware-update","data":{"url":"https://example.com"}}"#,
        );
        assert!(!state.snapshot().active);
    }

    #[test]
    fn test_malformed_payload_is_dropped() {
        let state = state();
        handle_inbound(&state, "telematics/dev-001/metric", b"not json at all");
        assert!(!state.snapshot().active);
    }

    #[test]
    fn test_response_without_status_is_dropped() {
        let state = state();
        handle_inbound(
            &state,
            "telematics/dev-001/activation-status-response",
            br#"{"type":"activation-status-response","data":{}}"#,
        );
        assert!(!state.snapshot().active);
    }
}
