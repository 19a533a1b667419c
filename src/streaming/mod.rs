pub mod backoff;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod queue;

// Re-export commonly used types
pub use backoff::Backoff;
pub use consumer::{ConsumerSettings, ShardConsumer, ShardOutcome, ShardResult, ShardStats};
pub use dispatch::{DispatchLoop, DispatchSettings, DispatchStats};
pub use error::{AbortBatch, QueueClosed, RecordErrorPolicy, SilentSkip, SkipInvalid};
pub use pipeline::{Pipeline, PipelineReport, PipelineSettings};
pub use queue::{MAX_BOUNDED_CAPACITY, QueuePolicy, QueueReceiver, QueueSender, fan_in};
