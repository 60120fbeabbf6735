//! Background delivery of order notifications.

use std::sync::Arc;
use std::time::Duration;

use domain::OrderEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::email::{Email, EmailSender};
use crate::error::{NotifyError, Result};
use crate::template;

/// Retry settings for email delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Total attempts per email, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub base_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Renders order events into emails and delivers them.
pub struct NotificationDispatcher {
    sender: Arc<dyn EmailSender>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn EmailSender>, config: DispatcherConfig) -> Self {
        Self { sender, config }
    }

    /// Runs the dispatcher on its own task until every queue handle is
    /// dropped and the channel drains.
    pub fn spawn(self, rx: mpsc::Receiver<OrderEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(rx))
    }

    /// Consumes events until the channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<OrderEvent>) {
        tracing::info!("notification dispatcher started");
        while let Some(event) = rx.recv().await {
            self.handle(&event).await;
        }
        tracing::info!("notification dispatcher stopped");
    }

    /// Delivers the notification for one event. Failures are logged.
    #[tracing::instrument(
        skip(self, event),
        fields(event_type = event.event_type(), order_id = %event.order_id())
    )]
    pub async fn handle(&self, event: &OrderEvent) {
        let Some(email) = template::render(event) else {
            tracing::debug!("no contact address, notification skipped");
            return;
        };

        match self.deliver(&email).await {
            Ok(()) => {
                metrics::counter!("notifications_sent_total").increment(1);
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total").increment(1);
                tracing::error!(error = %e, "notification dropped");
            }
        }
    }

    /// Sends an email, retrying with exponential backoff.
    pub async fn deliver(&self, email: &Email) -> Result<()> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut delay = self.config.base_delay;
        let mut attempt = 1;

        loop {
            match self.sender.send(email).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= max_attempts => {
                    return Err(NotifyError::Exhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, ?delay, "email delivery failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryEmailSender, NotificationQueue};
    use chrono::Utc;
    use common::{OrderId, UserId};
    use domain::{EventPublisher, Money, OrderPlacedData};

    fn placed(email: Option<&str>) -> OrderEvent {
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: OrderId::new(),
            user_id: UserId::new(),
            contact_email: email.map(str::to_string),
            lines: Vec::new(),
            total: Money::from_cents(1000),
            placed_at: Utc::now(),
        })
    }

    fn dispatcher(sender: &InMemoryEmailSender, max_attempts: u32) -> NotificationDispatcher {
        NotificationDispatcher::new(
            Arc::new(sender.clone()),
            DispatcherConfig {
                max_attempts,
                base_delay: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_delivered() {
        let sender = InMemoryEmailSender::new();
        sender.fail_next(2);

        dispatcher(&sender, 3)
            .handle(&placed(Some("buyer@example.com")))
            .await;

        assert_eq!(sender.attempts(), 3);
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let sender = InMemoryEmailSender::new();
        sender.fail_next(10);
        let email = template::render(&placed(Some("buyer@example.com"))).unwrap();

        let result = dispatcher(&sender, 3).deliver(&email).await;

        assert!(matches!(result, Err(NotifyError::Exhausted { attempts: 3, .. })));
        assert_eq!(sender.attempts(), 3);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn skips_events_without_address() {
        let sender = InMemoryEmailSender::new();

        dispatcher(&sender, 3).handle(&placed(None)).await;

        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn drains_queue_and_stops_when_closed() {
        let sender = InMemoryEmailSender::new();
        let (queue, rx) = NotificationQueue::channel(8);
        let handle = dispatcher(&sender, 1).spawn(rx);

        queue.publish(placed(Some("a@example.com"))).await.unwrap();
        queue.publish(placed(Some("b@example.com"))).await.unwrap();
        drop(queue);
        handle.await.unwrap();

        let recipients: Vec<_> = sender.sent().into_iter().map(|e| e.to).collect();
        assert_eq!(recipients, vec!["a@example.com", "b@example.com"]);
    }
}
