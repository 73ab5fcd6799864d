use crate::{Device, DrivingSession, EngineStatus, Vehicle};
use std::sync::{Mutex, MutexGuard};

/// Point-in-time view of the flags the tick guards evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub active: bool,
    pub busy: bool,
    pub session_open: bool,
    pub engine_on: bool,
}

struct Inner {
    device: Device,
    vehicle: Vehicle,
}

/// Coordinator-owned shared state for one device/vehicle pair.
///
/// All mutation is funneled through these methods. The lock is held
/// only inside each method, never across an await point; tick bodies
/// are serialized on a single scheduler task, so the busy flag's
/// read-check-then-set sequence cannot interleave between ticks.
pub struct AgentState {
    inner: Mutex<Inner>,
}

impl AgentState {
    pub fn new(device: Device, vehicle: Vehicle) -> Self {
        Self {
            inner: Mutex::new(Inner { device, vehicle }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a panic mid-update elsewhere; the
        // flags stay boolean-valid, so recover the guard.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.lock();
        StateSnapshot {
            active: inner.device.is_active(),
            busy: inner.device.is_busy(),
            session_open: inner.device.session_open(),
            engine_on: inner.vehicle.engine_on(),
        }
    }

    /// (vehicle_id, device_id) for stamping outbound data.
    pub fn identity(&self) -> (String, String) {
        let inner = self.lock();
        (
            inner.device.vehicle_id().to_string(),
            inner.device.device_id().to_string(),
        )
    }

    pub fn set_active(&self, active: bool) {
        self.lock().device.set_active(active);
    }

    pub fn set_busy(&self, busy: bool) {
        self.lock().device.set_busy(busy);
    }

    pub fn set_engine(&self, on: bool) -> EngineStatus {
        let mut inner = self.lock();
        inner.vehicle.set_engine(on);
        inner.vehicle.status()
    }

    pub fn start_driving_session(&self) {
        self.lock().device.start_driving_session();
    }

    pub fn end_driving_session(&self) {
        self.lock().device.end_driving_session();
    }

    pub fn sessions(&self) -> Vec<DrivingSession> {
        self.lock().device.sessions().to_vec()
    }
}
