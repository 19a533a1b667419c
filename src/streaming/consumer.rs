use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::backoff::Backoff;
use super::error::{QueueClosed, RecordErrorPolicy};
use super::queue::QueueSender;
use crate::domain::{Classification, PayloadFilter, Record, RecordBatch, Shard};
use crate::source::StreamSource;

/// Timing knobs for a shard consumer
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Backoff increment per consecutive fetch failure
    pub backoff_step: Duration,
    /// Upper bound on the backoff delay; `None` for unbounded growth
    pub max_backoff: Option<Duration>,
    /// Wait after a batch with no records
    pub idle_poll_interval: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            backoff_step: Duration::from_secs(1),
            max_backoff: Some(Duration::from_secs(30)),
            idle_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Why a consumer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardOutcome {
    /// The shard is closed and every record has been read
    Exhausted,
    /// No cursor could be acquired; the shard is not read at all
    Abandoned,
    /// Shutdown was requested
    Cancelled,
    /// The dispatch side dropped the queue
    QueueClosed,
    /// Still running when the shutdown grace period ran out
    Aborted,
    /// The task panicked
    Panicked,
}

/// Per-shard counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardStats {
    pub records_seen: u64,
    pub payloads_forwarded: u64,
    pub payloads_dropped: u64,
    pub records_invalid: u64,
    pub fetch_failures: u64,
}

/// Result from running one shard consumer
#[derive(Debug, Clone)]
pub struct ShardResult {
    pub shard_id: String,
    pub outcome: ShardOutcome,
    pub stats: ShardStats,
}

impl ShardResult {
    pub fn without_stats(shard_id: impl Into<String>, outcome: ShardOutcome) -> Self {
        Self {
            shard_id: shard_id.into(),
            outcome,
            stats: ShardStats::default(),
        }
    }
}

/// Polls one shard from its trim horizon and pushes payloads to the fan-in queue
pub struct ShardConsumer<S: ?Sized, P> {
    shard: Shard,
    source: Arc<S>,
    filter: PayloadFilter,
    queue: QueueSender,
    policy: P,
    settings: ConsumerSettings,
    cancel: CancellationToken,
}

impl<S, P> ShardConsumer<S, P>
where
    S: StreamSource + ?Sized,
    P: RecordErrorPolicy,
{
    pub fn new(
        shard: Shard,
        source: Arc<S>,
        filter: PayloadFilter,
        queue: QueueSender,
        policy: P,
        settings: ConsumerSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            shard,
            source,
            filter,
            queue,
            policy,
            settings,
            cancel,
        }
    }

    /// Run until the shard is exhausted, the queue closes, or shutdown
    pub async fn run(self) -> ShardResult {
        let mut stats = ShardStats::default();
        let outcome = self.poll_shard(&mut stats).await;

        info!(
            shard_id = %self.shard.shard_id,
            outcome = ?outcome,
            records_seen = stats.records_seen,
            forwarded = stats.payloads_forwarded,
            fetch_failures = stats.fetch_failures,
            "Shard consumer stopped"
        );

        ShardResult {
            shard_id: self.shard.shard_id,
            outcome,
            stats,
        }
    }

    async fn poll_shard(&self, stats: &mut ShardStats) -> ShardOutcome {
        let shard_id = self.shard.shard_id.as_str();

        let acquired = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return ShardOutcome::Cancelled,
            result = self.source.shard_cursor(&self.shard) => result,
        };

        let mut cursor = match acquired {
            Ok(cursor) => {
                debug!(shard_id, "Acquired trim horizon cursor");
                Some(cursor)
            }
            Err(e) => {
                error!(shard_id, error = %e, "Could not acquire shard cursor, abandoning shard");
                return ShardOutcome::Abandoned;
            }
        };

        let mut backoff =
            Backoff::linear(self.settings.backoff_step).with_max(self.settings.max_backoff);

        while let Some(current) = cursor.as_ref() {
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ShardOutcome::Cancelled,
                result = self.source.fetch(&self.shard, current) => result,
            };

            match fetched {
                Ok(batch) => {
                    backoff.reset();

                    let RecordBatch {
                        records,
                        next_cursor,
                        millis_behind_latest,
                    } = batch;
                    cursor = next_cursor;

                    debug!(
                        shard_id,
                        records = records.len(),
                        millis_behind_latest,
                        "Fetched batch"
                    );

                    let idle = records.is_empty();
                    if self.forward(records, stats).await.is_err() {
                        return ShardOutcome::QueueClosed;
                    }

                    if idle && cursor.is_some() && !self.pause(self.settings.idle_poll_interval).await
                    {
                        return ShardOutcome::Cancelled;
                    }
                }
                Err(e) => {
                    stats.fetch_failures += 1;
                    let delay = backoff.record_failure();
                    warn!(
                        shard_id,
                        failures = backoff.failures(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, backing off"
                    );

                    if !self.pause(delay).await {
                        return ShardOutcome::Cancelled;
                    }
                }
            }
        }

        ShardOutcome::Exhausted
    }

    /// Classify each record in order and push the survivors
    async fn forward(&self, records: Vec<Record>, stats: &mut ShardStats) -> Result<(), QueueClosed> {
        for record in records {
            stats.records_seen += 1;

            match self.filter.classify(&record.data) {
                Ok(Classification::Forward(payload)) => {
                    self.queue.push(payload).await?;
                    stats.payloads_forwarded += 1;
                }
                Ok(Classification::Empty) => {
                    stats.payloads_dropped += 1;
                    trace!(
                        shard_id = %self.shard.shard_id,
                        sequence_number = %record.sequence_number,
                        "Dropping empty payload"
                    );
                }
                Err(e) => {
                    stats.records_invalid += 1;
                    if !self.policy.handle_invalid_record(&self.shard, &record, e) {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Sleep unless cancelled first; returns false on cancellation
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
