//! Event bus port — publish/subscribe for SSE-facing domain events.

use std::future::Future;

use gateway_domain::error::GatewayError;
use gateway_domain::event::Event;

/// Publishes domain events to interested subscribers.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
