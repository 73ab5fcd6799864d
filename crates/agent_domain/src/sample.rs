use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reading from the OBD-II collaborator. Opaque to the pipeline;
/// the agent only stamps and forwards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObdReading {
    pub fuel_rate: f64,
    pub vehicle_speed: f64,
    pub engine_speed: f64,
    pub relative_accel_pos: f64,
}

/// A collected telemetry sample, immutable once created. Serialized as
/// one JSON document per durable-buffer entry and as the `metric` event
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    #[serde(rename = "vehicle")]
    pub vehicle_id: String,
    #[serde(rename = "device")]
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub obd_data: ObdReading,
}

impl TelemetrySample {
    pub fn new(
        vehicle_id: impl Into<String>,
        device_id: impl Into<String>,
        obd_data: ObdReading,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            device_id: device_id.into(),
            timestamp: Utc::now(),
            obd_data,
        }
    }
}
