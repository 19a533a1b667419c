use std::sync::Arc;

use async_trait::async_trait;

use super::error::SinkError;
use crate::domain::StructuredEvent;

/// Downstream receiver of encoded events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event; the caller does not retry
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError> {
        (**self).deliver(event).await
    }
}
