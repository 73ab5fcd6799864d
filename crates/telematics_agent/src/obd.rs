use agent_domain::{ObdReading, ObdSource};

/// Simulated OBD-II reader for the development profile; returns fixed
/// values in place of a real vehicle-bus query.
#[derive(Debug, Default)]
pub struct FixedObdSource;

impl FixedObdSource {
    pub fn new() -> Self {
        Self
    }
}

impl ObdSource for FixedObdSource {
    fn read(&self) -> ObdReading {
        ObdReading {
            fuel_rate: 1.0,
            vehicle_speed: 1.0,
            engine_speed: 1.0,
            relative_accel_pos: 1.0,
        }
    }
}
