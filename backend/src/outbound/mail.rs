//! Confirmation-code delivery.
//!
//! [`SmtpNotificationSink`] sends plain-text mail through `lettre`'s async
//! SMTP transport. [`LogNotificationSink`] writes the message to the log
//! instead and is used when no SMTP host is configured.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

use crate::domain::ports::{Notification, NotificationError, NotificationSink};

/// Connection settings for the SMTP relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upgrade with STARTTLS. Off only for local relays such as MailHog.
    pub starttls: bool,
}

/// Sends notifications over SMTP.
#[derive(Clone)]
pub struct SmtpNotificationSink {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotificationSink {
    /// Build the transport. Fails on an unparseable sender or relay host.
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotificationError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|err| NotificationError::compose(format!("invalid sender address: {err}")))?;

        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|err| NotificationError::delivery(err.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        let builder = builder.port(settings.port);
        let builder = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn compose(from: &Mailbox, notification: &Notification) -> Result<Message, NotificationError> {
    let to: Mailbox = notification
        .recipient
        .as_str()
        .parse()
        .map_err(|err| NotificationError::compose(format!("invalid recipient: {err}")))?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(notification.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body.clone())
        .map_err(|err| NotificationError::compose(err.to_string()))
}

#[async_trait]
impl NotificationSink for SmtpNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let message = compose(&self.from, notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|err| NotificationError::delivery(err.to_string()))?;
        debug!(recipient = %notification.recipient, "notification sent");
        Ok(())
    }
}

/// Writes notifications to the log. Development only: codes appear in logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            body = %notification.body,
            "notification (log sink)"
        );
        Ok(())
    }
}
