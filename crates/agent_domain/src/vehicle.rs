use serde::{Deserialize, Serialize};
use tracing::info;

/// Vehicle the device is mounted in. The engine switch is flipped
/// externally through the control surface.
#[derive(Debug, Clone)]
pub struct Vehicle {
    vehicle_id: String,
    engine_on: bool,
}

impl Vehicle {
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            engine_on: false,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn engine_on(&self) -> bool {
        self.engine_on
    }

    pub fn set_engine(&mut self, on: bool) {
        if self.engine_on != on {
            info!(vehicle_id = %self.vehicle_id, engine_on = on, "engine state changed");
        }
        self.engine_on = on;
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            vehicle_id: self.vehicle_id.clone(),
            engine_on: self.engine_on,
        }
    }
}

/// Engine state as reported back by the control endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub vehicle_id: String,
    pub engine_on: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_toggles() {
        let mut vehicle = Vehicle::new("vin-001");
        assert!(!vehicle.engine_on());
        vehicle.set_engine(true);
        assert!(vehicle.engine_on());
        vehicle.set_engine(false);
        assert!(!vehicle.engine_on());
    }

    #[test]
    fn test_status_reflects_current_state() {
        let mut vehicle = Vehicle::new("vin-001");
        vehicle.set_engine(true);
        let status = vehicle.status();
        assert_eq!(status.vehicle_id, "vin-001");
        assert!(status.engine_on);
    }
}
