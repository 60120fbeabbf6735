//! Order notifications.
//!
//! The order service publishes events to a [`NotificationQueue`]; a
//! [`NotificationDispatcher`] running on its own task renders each event
//! into an email and hands it to an [`EmailSender`], retrying failures with
//! exponential backoff.

pub mod dispatcher;
pub mod email;
pub mod error;
pub mod queue;
pub mod template;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use email::{Email, EmailSender, InMemoryEmailSender, LogEmailSender};
pub use error::{NotifyError, Result};
pub use queue::NotificationQueue;
pub use template::render;
