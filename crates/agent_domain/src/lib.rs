mod device;
mod error;
mod event;
mod sample;
mod state;
mod traits;
mod vehicle;

pub use device::{Device, DrivingSession};
pub use error::{DomainError, DomainResult};
pub use event::{
    ActivationStatus, EventKind, InboundEnvelope, ProtocolEvent, ACTIVATION_STATUS_RESPONSE,
    PAIRED_STATUS,
};
pub use sample::{ObdReading, TelemetrySample};
pub use state::{AgentState, StateSnapshot};
pub use traits::{EventPublisher, ObdSource};
pub use vehicle::{EngineStatus, Vehicle};

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use traits::MockEventPublisher;
#[cfg(any(test, feature = "testing"))]
pub use traits::MockObdSource;
