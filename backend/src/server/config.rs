//! Application settings and the server configuration built from them.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use critique::domain::ports::NotificationSink;
use critique::outbound::mail::{LogNotificationSink, SmtpSettings};
use critique::outbound::persistence::DbPool;
use critique::outbound::token::JwtTokenService;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_MAIL_FROM: &str = "critique@localhost";

/// Settings loaded from CLI arguments, `CRITIQUE_*` environment variables
/// and the configuration file.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CRITIQUE")]
pub struct AppSettings {
    /// Listen address, `host:port`.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Bearer token lifetime.
    pub token_ttl_hours: Option<i64>,
    /// SMTP relay. Codes are only logged when unset.
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Talk to the relay without STARTTLS. Only for local catch-all relays.
    #[ortho_config(default = false)]
    pub smtp_insecure: bool,
    /// Sender address for confirmation mail.
    pub mail_from: Option<String>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
}

/// Rejected settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {message}")]
    BindAddr { value: String, message: String },
    #[error("database_url is required")]
    MissingDatabaseUrl,
    #[error("token_ttl_hours must be a positive number of hours within range, got {0}")]
    TokenTtl(i64),
}

impl AppSettings {
    /// Parsed listen address, defaulting to all interfaces on port 8080.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    pub fn token_ttl(&self) -> Result<Duration, SettingsError> {
        let hours = self.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS);
        if hours <= 0 {
            return Err(SettingsError::TokenTtl(hours));
        }
        Duration::try_hours(hours).ok_or(SettingsError::TokenTtl(hours))
    }

    /// Relay settings, or `None` when no SMTP host is configured.
    pub fn smtp(&self) -> Option<SmtpSettings> {
        let host = self.smtp_host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        Some(SmtpSettings {
            host: host.to_owned(),
            port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            from: self
                .mail_from
                .clone()
                .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_owned()),
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            starttls: !self.smtp_insecure,
        })
    }
}

/// Everything `create_server` needs beyond the health state.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) tokens: Arc<JwtTokenService>,
    pub(crate) notifications: Arc<dyn NotificationSink>,
}

impl ServerConfig {
    /// Configuration that logs confirmation codes instead of mailing them.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, db_pool: DbPool, tokens: Arc<JwtTokenService>) -> Self {
        Self {
            bind_addr,
            db_pool,
            tokens,
            notifications: Arc::new(LogNotificationSink),
        }
    }

    /// Deliver confirmation codes through `sink`.
    #[must_use]
    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = sink;
        self
    }
}
