use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::QueueReceiver;
use crate::domain::{CloudEvent, EventAttributes, Payload};
use crate::sink::EventSink;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Pause after each delivery
    pub dispatch_interval: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_millis(500),
        }
    }
}

/// Counters reported when the dispatch loop exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub failed: u64,
    /// Payloads still queued when shutdown stopped the loop
    pub abandoned: u64,
}

/// Single consumer of the fan-in queue
///
/// Wraps each payload in a [`CloudEvent`] and delivers it, at most once, to
/// the sink. Stops on shutdown without draining the queue.
pub struct DispatchLoop<K: ?Sized> {
    queue: QueueReceiver,
    sink: Arc<K>,
    attributes: EventAttributes,
    settings: DispatchSettings,
    shutdown: CancellationToken,
}

impl<K> DispatchLoop<K>
where
    K: EventSink + ?Sized,
{
    pub fn new(
        queue: QueueReceiver,
        sink: Arc<K>,
        attributes: EventAttributes,
        settings: DispatchSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            sink,
            attributes,
            settings,
            shutdown,
        }
    }

    pub async fn run(mut self) -> DispatchStats {
        let mut stats = DispatchStats::default();
        let mut first = true;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let payload = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                item = self.queue.pop() => match item {
                    Some(payload) => payload,
                    None => {
                        info!("All shard consumers finished, dispatch loop exiting");
                        break;
                    }
                },
            };

            if self.shutdown.is_cancelled() {
                stats.abandoned += 1;
                break;
            }

            if first {
                info!("First payload received, dispatching");
                first = false;
            }

            self.dispatch(payload, &mut stats).await;

            let interval = self.settings.dispatch_interval;
            if !interval.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        stats.abandoned += self.queue.len() as u64;
        if stats.abandoned > 0 {
            warn!(
                abandoned = stats.abandoned,
                "Shutdown requested, dropping queued payloads"
            );
        }

        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "Dispatch loop stopped"
        );
        stats
    }

    async fn dispatch(&self, payload: Payload, stats: &mut DispatchStats) {
        let event = CloudEvent::new(&self.attributes, payload);

        let structured = match event.to_structured() {
            Ok(structured) => structured,
            Err(e) => {
                stats.failed += 1;
                warn!(event_id = event.id(), error = %e, "Could not encode event, dropping");
                return;
            }
        };

        match self.sink.deliver(&structured).await {
            Ok(()) => {
                stats.delivered += 1;
                debug!(event_id = event.id(), "Event delivered");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(event_id = event.id(), error = %e, "Delivery failed, dropping event");
            }
        }
    }
}
