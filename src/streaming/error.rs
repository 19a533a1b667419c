use thiserror::Error;
use tracing::warn;

use crate::domain::{DomainError, Payload, Record, Shard};

/// The fan-in queue's receiver is gone; carries the payload that was refused
#[derive(Error, Debug)]
#[error("Fan-in queue closed")]
pub struct QueueClosed(pub Payload);

/// Policy for records that fail to decode or lack the result field
pub trait RecordErrorPolicy: Send + Sync {
    /// Return true to continue with the rest of the batch, false to drop it
    fn handle_invalid_record(&self, shard: &Shard, record: &Record, error: DomainError) -> bool;
}

/// Skip the record and log a warning (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipInvalid;

impl RecordErrorPolicy for SkipInvalid {
    fn handle_invalid_record(&self, shard: &Shard, record: &Record, error: DomainError) -> bool {
        warn!(
            shard_id = %shard.shard_id,
            sequence_number = %record.sequence_number,
            partition_key = record.partition_key.as_deref(),
            error = %error,
            "Skipping invalid record"
        );
        true
    }
}

/// Drop the remainder of the batch on the first invalid record
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortBatch;

impl RecordErrorPolicy for AbortBatch {
    fn handle_invalid_record(&self, shard: &Shard, record: &Record, error: DomainError) -> bool {
        warn!(
            shard_id = %shard.shard_id,
            sequence_number = %record.sequence_number,
            partition_key = record.partition_key.as_deref(),
            error = %error,
            "Invalid record, dropping rest of batch"
        );
        false
    }
}

/// Skip the record without logging
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSkip;

impl RecordErrorPolicy for SilentSkip {
    fn handle_invalid_record(&self, _shard: &Shard, _record: &Record, _error: DomainError) -> bool {
        true
    }
}
