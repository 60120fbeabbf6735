//! Bounded queue between the order service and the dispatcher.

use async_trait::async_trait;
use domain::{EventPublisher, OrderEvent, PublishError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Publishing end of the notification channel.
///
/// Publishing never waits: when the queue is full the event is rejected
/// and the order service logs it.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<OrderEvent>,
}

impl NotificationQueue {
    /// Creates a queue holding up to `capacity` pending events, with the
    /// receiver to hand to a dispatcher.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OrderEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventPublisher for NotificationQueue {
    async fn publish(&self, event: OrderEvent) -> Result<(), PublishError> {
        self.tx.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => PublishError::Full,
            TrySendError::Closed(_) => PublishError::Closed,
        })?;
        metrics::gauge!("notification_queue_depth")
            .set((self.tx.max_capacity() - self.tx.capacity()) as f64);
        Ok(())
    }
}
