//! Notification error types.

use thiserror::Error;

/// Errors that can occur while delivering notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The email provider rejected or failed the delivery.
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// Every delivery attempt failed.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
