pub mod error;
pub mod event;
pub mod payload;
pub mod shard;

// Re-export commonly used types
pub use error::DomainError;
pub use event::{CloudEvent, EVENT_SOURCE, EVENT_TYPE, EventAttributes, StructuredEvent};
pub use payload::{Classification, DEFAULT_RESULT_FIELD, Payload, PayloadFilter};
pub use shard::{Record, RecordBatch, Shard, ShardCursor};
