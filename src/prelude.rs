//! Prelude module for convenient imports
//!
//! Import everything you need with: `use ingest::prelude::*;`

// Domain types
pub use crate::domain::{
    Classification, CloudEvent, DomainError, EventAttributes, Payload, PayloadFilter, Record,
    RecordBatch, Shard, ShardCursor, StructuredEvent,
};

// Stream source types
pub use crate::source::{KinesisSource, SourceError, StreamSource, enumerate_shards};

// Sink types
pub use crate::sink::{EventSink, HttpSink, SinkError};

// Streaming types
pub use crate::streaming::{
    AbortBatch, ConsumerSettings, DispatchLoop, DispatchSettings, DispatchStats, Pipeline,
    PipelineReport, PipelineSettings, QueuePolicy, RecordErrorPolicy, ShardConsumer, ShardOutcome,
    ShardResult, SilentSkip, SkipInvalid, fan_in,
};

// App types
pub use crate::app::{AppError, ConfigError, IngestConfig, ServiceApp, ShutdownCoordinator};
