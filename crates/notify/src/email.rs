//! Email sender trait and implementations.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{NotifyError, Result};

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivers emails.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Sender that only logs, for running without an email provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: &Email) -> Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryEmailState {
    sent: Vec<Email>,
    attempts: u32,
    failures_remaining: u32,
}

/// In-memory sender for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailSender {
    state: Arc<Mutex<InMemoryEmailState>>,
}

impl InMemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` sends fail.
    pub fn fail_next(&self, count: u32) {
        self.lock().failures_remaining = count;
    }

    /// Emails delivered so far.
    pub fn sent(&self) -> Vec<Email> {
        self.lock().sent.clone()
    }

    /// Number of send calls, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryEmailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send(&self, email: &Email) -> Result<()> {
        let mut state = self.lock();
        state.attempts += 1;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(NotifyError::Delivery("smtp unavailable".to_string()));
        }

        state.sent.push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email {
            to: "buyer@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn records_sent_emails() {
        let sender = InMemoryEmailSender::new();
        sender.send(&email()).await.unwrap();

        assert_eq!(sender.sent(), vec![email()]);
        assert_eq!(sender.attempts(), 1);
    }

    #[tokio::test]
    async fn fails_requested_number_of_times() {
        let sender = InMemoryEmailSender::new();
        sender.fail_next(2);

        assert!(sender.send(&email()).await.is_err());
        assert!(sender.send(&email()).await.is_err());
        assert!(sender.send(&email()).await.is_ok());
        assert_eq!(sender.attempts(), 3);
        assert_eq!(sender.sent().len(), 1);
    }
}
