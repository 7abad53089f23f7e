//! Builders for HTTP state ports and notification delivery.

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use tracing::info;

use critique::domain::ports::{NotificationError, NotificationSink};
use critique::inbound::http::state::{HttpState, HttpStatePorts};
use critique::outbound::codes::RandomCodeGenerator;
use critique::outbound::mail::{LogNotificationSink, SmtpNotificationSink, SmtpSettings};
use critique::outbound::persistence::{
    DbPool, DieselCatalogueRepository, DieselIdentityStore, DieselReviewRepository,
};

use super::ServerConfig;

/// Pick the SMTP sink when a relay is configured, else log codes.
pub(crate) fn build_notification_sink(
    smtp: Option<SmtpSettings>,
) -> Result<Arc<dyn NotificationSink>, NotificationError> {
    match smtp {
        Some(settings) => {
            info!(host = %settings.host, port = settings.port, "delivering codes over SMTP");
            Ok(Arc::new(SmtpNotificationSink::new(&settings)?))
        }
        None => {
            info!("no SMTP host configured; confirmation codes go to the log");
            Ok(Arc::new(LogNotificationSink))
        }
    }
}

fn postgres_ports(pool: &DbPool, config: &ServerConfig) -> HttpStatePorts {
    HttpStatePorts {
        identities: Arc::new(DieselIdentityStore::new(pool.clone())),
        catalogue: Arc::new(DieselCatalogueRepository::new(pool.clone())),
        reviews: Arc::new(DieselReviewRepository::new(pool.clone())),
        notifications: config.notifications.clone(),
        codes: Arc::new(RandomCodeGenerator),
        token_issuer: config.tokens.clone(),
        token_verifier: config.tokens.clone(),
        clock: Arc::new(DefaultClock),
    }
}

/// Build the shared HTTP state over the PostgreSQL adapters.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    web::Data::new(HttpState::new(postgres_ports(&config.db_pool, config)))
}
