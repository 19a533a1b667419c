use std::fmt;

/// One partition of a stream, as discovered at enumeration time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shard {
    pub stream_name: String,
    pub shard_id: String,
}

impl Shard {
    pub fn new(stream_name: impl Into<String>, shard_id: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            shard_id: shard_id.into(),
        }
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stream_name, self.shard_id)
    }
}

/// Opaque position token into a single shard
///
/// Only the consumer that acquired a cursor ever holds it; it is replaced
/// after every successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardCursor(String);

impl ShardCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw record as returned by the stream service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub sequence_number: String,
    pub partition_key: Option<String>,
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(sequence_number: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            sequence_number: sequence_number.into(),
            partition_key: None,
            data: data.into(),
        }
    }
}

/// Result of one fetch call
///
/// `next_cursor == None` means the shard is closed and fully read.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    pub records: Vec<Record>,
    pub next_cursor: Option<ShardCursor>,
    pub millis_behind_latest: Option<i64>,
}

impl RecordBatch {
    pub fn is_exhausted(&self) -> bool {
        self.next_cursor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_displays_stream_and_id() {
        let shard = Shard::new("orders", "shardId-000000000001");
        assert_eq!(shard.to_string(), "orders/shardId-000000000001");
    }

    #[test]
    fn batch_without_next_cursor_is_exhausted() {
        let open = RecordBatch {
            next_cursor: Some(ShardCursor::new("abc")),
            ..Default::default()
        };
        assert!(!open.is_exhausted());
        assert!(RecordBatch::default().is_exhausted());
    }
}
