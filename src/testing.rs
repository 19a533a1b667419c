//! In-memory stream source and recording sink
//!
//! Used by the unit and integration tests to drive the pipeline without AWS
//! or a live HTTP endpoint.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::{
    Classification, Payload, PayloadFilter, Record, RecordBatch, Shard, ShardCursor,
    StructuredEvent,
};
use crate::sink::{EventSink, SinkError};
use crate::source::{SourceError, StreamSource};

/// Build a forwardable payload using the default result field
///
/// # Panics
/// If `value` would be dropped or rejected by the default filter.
pub fn payload(value: Value) -> Payload {
    match PayloadFilter::default().classify_value(value) {
        Ok(Classification::Forward(payload)) => payload,
        other => panic!("value is not a forwardable payload: {other:?}"),
    }
}

/// One scripted response to a fetch call
#[derive(Debug, Clone)]
pub enum FetchStep {
    /// Return these record bodies
    Records(Vec<Vec<u8>>),
    /// Fail the fetch with this message, leaving the position unchanged
    Fail(String),
}

impl FetchStep {
    pub fn records<I, B>(bodies: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self::Records(bodies.into_iter().map(Into::into).collect())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

#[derive(Debug)]
struct ShardScript {
    steps: VecDeque<FetchStep>,
    close_when_drained: bool,
    cursor_fails: bool,
    position: u64,
    next_sequence: u64,
}

/// Scripted [`StreamSource`] holding one stream
///
/// Closed shards return `next_cursor: None` after their last step. Open
/// shards keep answering with empty batches.
#[derive(Debug)]
pub struct MemorySource {
    stream_name: String,
    shard_order: Vec<String>,
    shards: DashMap<String, ShardScript>,
    fetch_times: DashMap<String, Vec<Instant>>,
    listing_fails: bool,
    listing_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            shard_order: Vec::new(),
            shards: DashMap::new(),
            fetch_times: DashMap::new(),
            listing_fails: false,
            listing_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_closed_shard(self, shard_id: &str, steps: Vec<FetchStep>) -> Self {
        self.with_shard(shard_id, steps, true, false)
    }

    pub fn with_open_shard(self, shard_id: &str, steps: Vec<FetchStep>) -> Self {
        self.with_shard(shard_id, steps, false, false)
    }

    /// Add a shard whose cursor acquisition always fails
    pub fn with_failing_cursor(self, shard_id: &str) -> Self {
        self.with_shard(shard_id, Vec::new(), true, true)
    }

    pub fn failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    fn with_shard(
        mut self,
        shard_id: &str,
        steps: Vec<FetchStep>,
        close_when_drained: bool,
        cursor_fails: bool,
    ) -> Self {
        self.shard_order.push(shard_id.to_string());
        self.shards.insert(
            shard_id.to_string(),
            ShardScript {
                steps: steps.into(),
                close_when_drained,
                cursor_fails,
                position: 0,
                next_sequence: 0,
            },
        );
        self
    }

    pub fn listing_calls(&self) -> usize {
        self.listing_calls.load(Ordering::SeqCst)
    }

    /// Instants at which `shard_id` was fetched, oldest first
    pub fn fetch_times(&self, shard_id: &str) -> Vec<Instant> {
        self.fetch_times
            .get(shard_id)
            .map(|times| times.clone())
            .unwrap_or_default()
    }

    fn cursor_for(shard_id: &str, position: u64) -> ShardCursor {
        ShardCursor::new(format!("{shard_id}:{position}"))
    }
}

#[async_trait]
impl StreamSource for MemorySource {
    async fn list_shards(&self, stream_name: &str) -> Result<Vec<Shard>, SourceError> {
        self.listing_calls.fetch_add(1, Ordering::SeqCst);

        if self.listing_fails || stream_name != self.stream_name {
            return Err(SourceError::ListShards {
                stream: stream_name.to_string(),
                message: "stream not found".to_string(),
            });
        }

        Ok(self
            .shard_order
            .iter()
            .map(|shard_id| Shard::new(stream_name, shard_id.as_str()))
            .collect())
    }

    async fn shard_cursor(&self, shard: &Shard) -> Result<ShardCursor, SourceError> {
        let script = self
            .shards
            .get(&shard.shard_id)
            .ok_or_else(|| SourceError::ShardCursor {
                shard_id: shard.shard_id.clone(),
                message: "unknown shard".to_string(),
            })?;

        if script.cursor_fails {
            return Err(SourceError::ShardCursor {
                shard_id: shard.shard_id.clone(),
                message: "access denied".to_string(),
            });
        }

        Ok(Self::cursor_for(&shard.shard_id, script.position))
    }

    async fn fetch(&self, shard: &Shard, cursor: &ShardCursor) -> Result<RecordBatch, SourceError> {
        self.fetch_times
            .entry(shard.shard_id.clone())
            .or_default()
            .push(Instant::now());

        let fetch_error = |message: &str| SourceError::Fetch {
            shard_id: shard.shard_id.clone(),
            message: message.to_string(),
        };

        let mut script = self
            .shards
            .get_mut(&shard.shard_id)
            .ok_or_else(|| fetch_error("unknown shard"))?;

        if *cursor != Self::cursor_for(&shard.shard_id, script.position) {
            return Err(fetch_error("stale cursor"));
        }

        match script.steps.pop_front() {
            Some(FetchStep::Records(bodies)) => {
                script.position += 1;
                let mut records = Vec::with_capacity(bodies.len());
                for data in bodies {
                    script.next_sequence += 1;
                    records.push(Record::new(format!("{:020}", script.next_sequence), data));
                }

                let next_cursor = if script.close_when_drained && script.steps.is_empty() {
                    None
                } else {
                    Some(Self::cursor_for(&shard.shard_id, script.position))
                };

                Ok(RecordBatch {
                    records,
                    next_cursor,
                    millis_behind_latest: Some(0),
                })
            }
            Some(FetchStep::Fail(message)) => Err(fetch_error(&message)),
            None => Ok(RecordBatch {
                records: Vec::new(),
                next_cursor: (!script.close_when_drained).then(|| cursor.clone()),
                millis_behind_latest: Some(0),
            }),
        }
    }
}

/// [`EventSink`] that keeps every delivered event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<StructuredEvent>>,
    attempts: AtomicUsize,
    fail_first: usize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the first `n` deliveries with a 503
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Cancel `token` once `n` events have been accepted
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<StructuredEvent> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The `data` member of every delivered envelope
    pub fn delivered_data(&self) -> Vec<Value> {
        self.delivered()
            .iter()
            .map(|event| {
                serde_json::from_slice::<Value>(&event.body)
                    .map(|envelope| envelope["data"].clone())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(SinkError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let accepted = {
            let mut delivered = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
            delivered.push(event.clone());
            delivered.len()
        };

        if let Some((n, token)) = &self.cancel_after
            && accepted >= *n
        {
            token.cancel();
        }

        Ok(())
    }
}
