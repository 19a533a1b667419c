use thiserror::Error;

/// Errors raised at the stream service boundary
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Invalid stream name: {0:?}")]
    InvalidStreamName(String),

    #[error("Failed to list shards for stream {stream}: {message}")]
    ListShards { stream: String, message: String },

    #[error("Failed to acquire cursor for shard {shard_id}: {message}")]
    ShardCursor { shard_id: String, message: String },

    #[error("Failed to fetch records from shard {shard_id}: {message}")]
    Fetch { shard_id: String, message: String },
}
