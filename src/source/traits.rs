use std::sync::Arc;

use async_trait::async_trait;

use super::error::SourceError;
use crate::domain::{RecordBatch, Shard, ShardCursor};

/// Operations the pipeline needs from a shard-based stream service
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// List every shard currently in the stream
    async fn list_shards(&self, stream_name: &str) -> Result<Vec<Shard>, SourceError>;

    /// Acquire a cursor at the earliest retained record (trim horizon)
    async fn shard_cursor(&self, shard: &Shard) -> Result<ShardCursor, SourceError>;

    /// Fetch the batch at `cursor`
    async fn fetch(&self, shard: &Shard, cursor: &ShardCursor) -> Result<RecordBatch, SourceError>;
}

#[async_trait]
impl<T: StreamSource + ?Sized> StreamSource for Arc<T> {
    async fn list_shards(&self, stream_name: &str) -> Result<Vec<Shard>, SourceError> {
        (**self).list_shards(stream_name).await
    }

    async fn shard_cursor(&self, shard: &Shard) -> Result<ShardCursor, SourceError> {
        (**self).shard_cursor(shard).await
    }

    async fn fetch(&self, shard: &Shard, cursor: &ShardCursor) -> Result<RecordBatch, SourceError> {
        (**self).fetch(shard, cursor).await
    }
}
