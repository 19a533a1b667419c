use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::consumer::{ConsumerSettings, ShardConsumer, ShardOutcome, ShardResult};
use super::dispatch::{DispatchLoop, DispatchSettings, DispatchStats};
use super::error::RecordErrorPolicy;
use super::queue::{QueuePolicy, fan_in};
use crate::domain::{DEFAULT_RESULT_FIELD, EventAttributes, PayloadFilter};
use crate::sink::EventSink;
use crate::source::{SourceError, StreamSource, enumerate_shards};

/// Everything tunable about a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub result_field: String,
    pub queue_policy: QueuePolicy,
    pub attributes: EventAttributes,
    pub consumer: ConsumerSettings,
    pub dispatch: DispatchSettings,
    /// How long to wait for consumers after dispatch stops
    pub shutdown_grace: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            result_field: DEFAULT_RESULT_FIELD.to_string(),
            queue_policy: QueuePolicy::Unbounded,
            attributes: EventAttributes::default(),
            consumer: ConsumerSettings::default(),
            dispatch: DispatchSettings::default(),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Shard stream to HTTP sink pipeline
///
/// One consumer task per shard feeds a shared queue; the dispatch loop runs on
/// the caller's task and drains it.
///
/// # Example
/// ```rust,ignore
/// let report = Pipeline::new(source, sink, SkipInvalid)
///     .with_queue_policy(QueuePolicy::Bounded(10_000))
///     .run("orders", shutdown.token())
///     .await?;
/// ```
pub struct Pipeline<S, K, P> {
    source: Arc<S>,
    sink: Arc<K>,
    error_policy: P,
    settings: PipelineSettings,
}

impl<S, K, P> Pipeline<S, K, P>
where
    S: StreamSource + 'static,
    K: EventSink + 'static,
    P: RecordErrorPolicy + Clone + 'static,
{
    pub fn new(source: S, sink: K, error_policy: P) -> Self {
        Self {
            source: Arc::new(source),
            sink: Arc::new(sink),
            error_policy,
            settings: PipelineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.settings.queue_policy = policy;
        self
    }

    pub fn with_consumer_settings(mut self, settings: ConsumerSettings) -> Self {
        self.settings.consumer = settings;
        self
    }

    pub fn with_dispatch_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings.dispatch = settings;
        self
    }

    /// Run until shutdown, or until every shard consumer has finished and
    /// the queue is drained
    ///
    /// Fails only when the shard set cannot be enumerated, in which case no
    /// consumer is started.
    pub async fn run(
        self,
        stream_name: &str,
        shutdown: CancellationToken,
    ) -> Result<PipelineReport, SourceError> {
        let Pipeline {
            source,
            sink,
            error_policy,
            settings,
        } = self;

        let shards = enumerate_shards(&*source, stream_name).await?;

        match settings.queue_policy {
            QueuePolicy::Unbounded => {
                info!("Fan-in queue is unbounded; backlog grows while the sink lags")
            }
            QueuePolicy::Bounded(capacity) => {
                info!(capacity, "Fan-in queue is bounded; consumers wait when full")
            }
        }

        let (tx, rx) = fan_in(settings.queue_policy);
        let filter = PayloadFilter::new(settings.result_field.clone());
        let consumers_cancel = shutdown.child_token();

        // Spawn one task per shard
        let consumers: Vec<_> = shards
            .into_iter()
            .map(|shard| {
                let shard_id = shard.shard_id.clone();
                let consumer = ShardConsumer::new(
                    shard,
                    source.clone(),
                    filter.clone(),
                    tx.clone(),
                    error_policy.clone(),
                    settings.consumer.clone(),
                    consumers_cancel.child_token(),
                );
                (shard_id, tokio::spawn(consumer.run()))
            })
            .collect();
        drop(tx);

        info!(stream = stream_name, consumers = consumers.len(), "Shard consumers started");

        let dispatch = DispatchLoop::new(
            rx,
            sink,
            settings.attributes.clone(),
            settings.dispatch.clone(),
            shutdown.child_token(),
        )
        .run()
        .await;

        consumers_cancel.cancel();

        let deadline = tokio::time::Instant::now() + settings.shutdown_grace;
        let shard_results = join_all(consumers.into_iter().map(|(shard_id, handle)| async move {
            let abort = handle.abort_handle();
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!(shard_id = %shard_id, error = %e, "Shard consumer task failed");
                    ShardResult::without_stats(shard_id, ShardOutcome::Panicked)
                }
                Err(_) => {
                    abort.abort();
                    warn!(shard_id = %shard_id, "Shard consumer did not stop in time, aborting");
                    ShardResult::without_stats(shard_id, ShardOutcome::Aborted)
                }
            }
        }))
        .await;

        let report = PipelineReport {
            stream_name: stream_name.to_string(),
            shard_results,
            dispatch,
        };
        report.log_summary();

        Ok(report)
    }
}

/// Results from one pipeline run
#[derive(Debug)]
pub struct PipelineReport {
    pub stream_name: String,
    pub shard_results: Vec<ShardResult>,
    pub dispatch: DispatchStats,
}

impl PipelineReport {
    pub fn total_shards(&self) -> usize {
        self.shard_results.len()
    }

    pub fn shards_with(&self, outcome: ShardOutcome) -> usize {
        self.shard_results
            .iter()
            .filter(|result| result.outcome == outcome)
            .count()
    }

    pub fn total_forwarded(&self) -> u64 {
        self.shard_results
            .iter()
            .map(|result| result.stats.payloads_forwarded)
            .sum()
    }

    pub fn log_summary(&self) {
        info!(
            stream = %self.stream_name,
            shards = self.total_shards(),
            exhausted = self.shards_with(ShardOutcome::Exhausted),
            abandoned = self.shards_with(ShardOutcome::Abandoned),
            forwarded = self.total_forwarded(),
            delivered = self.dispatch.delivered,
            failed = self.dispatch.failed,
            dropped_at_shutdown = self.dispatch.abandoned,
            "Pipeline finished"
        );
    }
}
