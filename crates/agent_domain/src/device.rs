use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// One driving interval for a vehicle. Closed sessions are immutable;
/// the open session, if any, is always the last record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingSession {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl DrivingSession {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// Tracking device mounted in one vehicle.
///
/// Holds the activation status (set only from an inbound
/// activation-status-response), the advisory busy flag gating outbound
/// sends, and the ordered driving-session history. At most one session
/// is open at a time.
#[derive(Debug, Clone)]
pub struct Device {
    vehicle_id: String,
    device_id: String,
    active: bool,
    busy: bool,
    sessions: Vec<DrivingSession>,
}

impl Device {
    pub fn new(vehicle_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            device_id: device_id.into(),
            active: false,
            busy: false,
            sessions: Vec::new(),
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn session_open(&self) -> bool {
        self.sessions.last().is_some_and(DrivingSession::is_open)
    }

    pub fn sessions(&self) -> &[DrivingSession] {
        &self.sessions
    }

    /// Idempotent; activation is driven by the platform's pairing response.
    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            info!(device_id = %self.device_id, active, "device activation changed");
        }
        self.active = active;
    }

    /// Idempotent. The busy flag is the only gate for outbound sends;
    /// callers must release it on every exit path.
    pub fn set_busy(&mut self, busy: bool) {
        if self.busy != busy {
            debug!(device_id = %self.device_id, busy, "device busy flag changed");
        }
        self.busy = busy;
    }

    /// Opens a new driving session. Logs and leaves state untouched if
    /// one is already open.
    pub fn start_driving_session(&mut self) {
        if self.session_open() {
            error!(device_id = %self.device_id, "last driving session has not ended yet");
            return;
        }
        self.sessions.push(DrivingSession {
            start: Utc::now(),
            end: None,
        });
        info!(device_id = %self.device_id, "driving session started");
    }

    /// Closes the open driving session. Logs and leaves state untouched
    /// if none is open.
    pub fn end_driving_session(&mut self) {
        match self.sessions.last_mut() {
            Some(session) if session.is_open() => {
                session.end = Some(Utc::now());
                info!(device_id = %self.device_id, "driving session ended");
            }
            _ => error!(device_id = %self.device_id, "no driving session is open"),
        }
    }
}
