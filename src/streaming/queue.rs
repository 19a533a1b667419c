use tokio::sync::mpsc;

use super::error::QueueClosed;
use crate::domain::Payload;

/// Largest capacity a bounded tokio channel accepts
pub const MAX_BOUNDED_CAPACITY: usize = usize::MAX >> 3;

/// Capacity policy of the fan-in queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Producers never wait; memory grows while the sink lags
    #[default]
    Unbounded,

    /// Producers wait while `n` payloads are pending, clamped to
    /// `1..=MAX_BOUNDED_CAPACITY`
    Bounded(usize),
}

/// Create the multi-producer single-consumer payload queue
///
/// Payloads from one sender are received in the order they were pushed.
pub fn fan_in(policy: QueuePolicy) -> (QueueSender, QueueReceiver) {
    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                QueueSender {
                    inner: SenderInner::Unbounded(tx),
                },
                QueueReceiver {
                    inner: ReceiverInner::Unbounded(rx),
                },
            )
        }
        QueuePolicy::Bounded(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_BOUNDED_CAPACITY));
            (
                QueueSender {
                    inner: SenderInner::Bounded(tx),
                },
                QueueReceiver {
                    inner: ReceiverInner::Bounded(rx),
                },
            )
        }
    }
}

#[derive(Clone, Debug)]
enum SenderInner {
    Unbounded(mpsc::UnboundedSender<Payload>),
    Bounded(mpsc::Sender<Payload>),
}

/// Producer handle, one clone per shard consumer
#[derive(Clone, Debug)]
pub struct QueueSender {
    inner: SenderInner,
}

impl QueueSender {
    /// Append a payload; fails only once the receiver is gone
    pub async fn push(&self, payload: Payload) -> Result<(), QueueClosed> {
        match &self.inner {
            SenderInner::Unbounded(tx) => tx.send(payload).map_err(|e| QueueClosed(e.0)),
            SenderInner::Bounded(tx) => tx.send(payload).await.map_err(|e| QueueClosed(e.0)),
        }
    }
}

#[derive(Debug)]
enum ReceiverInner {
    Unbounded(mpsc::UnboundedReceiver<Payload>),
    Bounded(mpsc::Receiver<Payload>),
}

/// Consumer end, owned by the dispatch loop
#[derive(Debug)]
pub struct QueueReceiver {
    inner: ReceiverInner,
}

impl QueueReceiver {
    /// Wait for the next payload; `None` once every sender is dropped and
    /// the queue is drained
    pub async fn pop(&mut self) -> Option<Payload> {
        match &mut self.inner {
            ReceiverInner::Unbounded(rx) => rx.recv().await,
            ReceiverInner::Bounded(rx) => rx.recv().await,
        }
    }

    pub fn try_pop(&mut self) -> Option<Payload> {
        match &mut self.inner {
            ReceiverInner::Unbounded(rx) => rx.try_recv().ok(),
            ReceiverInner::Bounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Payloads currently waiting
    pub fn len(&self) -> usize {
        match &self.inner {
            ReceiverInner::Unbounded(rx) => rx.len(),
            ReceiverInner::Bounded(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::payload;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_order_from_one_producer() {
        let (tx, mut rx) = fan_in(QueuePolicy::Unbounded);

        for i in 0..5 {
            tx.push(payload(json!({"FaceSearchResponse": [i]}))).await.unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(item) = rx.pop().await {
            seen.push(item.as_value()["FaceSearchResponse"][0].as_i64().unwrap());
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn gathers_from_many_producers() {
        let (tx, mut rx) = fan_in(QueuePolicy::Unbounded);

        let handles: Vec<_> = (0..4)
            .map(|producer| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for i in 0..10 {
                        tx.push(payload(json!({"FaceSearchResponse": [producer, i]})))
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();
        drop(tx);
        for handle in handles {
            handle.await.unwrap();
        }

        let mut per_producer = vec![Vec::new(); 4];
        while let Some(item) = rx.pop().await {
            let pair = &item.as_value()["FaceSearchResponse"];
            per_producer[pair[0].as_u64().unwrap() as usize].push(pair[1].as_i64().unwrap());
        }

        for seq in per_producer {
            assert_eq!(seq, (0..10i64).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn push_fails_after_receiver_dropped() {
        let (tx, rx) = fan_in(QueuePolicy::Unbounded);
        drop(rx);

        let result = tx.push(payload(json!({"FaceSearchResponse": [1]}))).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bounded_queue_holds_back_producers() {
        let (tx, mut rx) = fan_in(QueuePolicy::Bounded(1));

        tx.push(payload(json!({"FaceSearchResponse": [1]}))).await.unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            tx.push(payload(json!({"FaceSearchResponse": [2]}))),
        )
        .await;
        assert!(blocked.is_err());
        assert_eq!(rx.len(), 1);

        assert!(rx.try_pop().is_some());
        tx.push(payload(json!({"FaceSearchResponse": [3]}))).await.unwrap();
        assert!(!rx.is_empty());
    }

    #[tokio::test]
    async fn oversized_capacity_is_clamped() {
        let (tx, mut rx) = fan_in(QueuePolicy::Bounded(usize::MAX));

        tx.push(payload(json!({"FaceSearchResponse": [1]}))).await.unwrap();

        assert_eq!(rx.len(), 1);
        assert!(rx.try_pop().is_some());
    }
}
