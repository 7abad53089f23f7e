//! Port for outbound user notifications (confirmation-code email).

use async_trait::async_trait;

use crate::domain::EmailAddress;

use super::define_port_error;

define_port_error! {
    /// Errors raised while delivering a notification.
    pub enum NotificationError {
        /// The message could not be built (bad sender, bad recipient).
        Compose { message: String } => "notification could not be composed: {message}",
        /// The transport refused or failed to deliver the message.
        Delivery { message: String } => "notification delivery failed: {message}",
    }
}

/// A plain-text message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: EmailAddress,
    pub subject: String,
    pub body: String,
}

/// Delivers notifications to users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Send one notification.
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}
