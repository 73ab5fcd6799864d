use crate::{DomainResult, ObdReading, ProtocolEvent};
use async_trait::async_trait;

/// Trait for sending protocol events upstream
///
/// Implementations should:
/// - Serialize the event envelope to JSON
/// - Publish on the event's topic with the fixed delivery assurance
/// - Return a transport error on failure, without retrying
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single protocol event
    ///
    /// # Arguments
    /// * `event` - ProtocolEvent to publish
    ///
    /// # Returns
    /// () on success, DomainError on failure
    async fn publish(&self, event: &ProtocolEvent) -> DomainResult<()>;
}

/// Trait for the vehicle-bus read collaborator. The returned reading is
/// opaque to the pipeline.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ObdSource: Send + Sync {
    fn read(&self) -> ObdReading;
}
