//! Backend entry-point: loads settings, prepares the database and serves the API.

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use mockable::{DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use critique::inbound::http::health::HealthState;
use critique::inbound::http::token_config::{BuildMode, token_settings_from_env};
use critique::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use critique::outbound::token::JwtTokenService;

mod server;

use server::{AppSettings, ServerConfig, build_notification_sink, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| eyre!("failed to load settings: {err}"))?;
    let bind_addr = settings.bind_addr()?;
    let database_url = settings.database_url()?.to_owned();
    let token_ttl = settings.token_ttl()?;

    let token_settings =
        token_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
            .wrap_err("failed to load the token signing key")?;
    if token_settings.ephemeral {
        warn!("tokens are signed with a per-process key and will not survive a restart");
    }
    let tokens = Arc::new(JwtTokenService::new(
        token_settings.key,
        Arc::new(DefaultClock),
        token_ttl,
    ));

    if settings.run_migrations {
        run_migrations(&database_url)
            .await
            .wrap_err("failed to apply migrations")?;
        info!("migrations applied");
    }
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .wrap_err("failed to build the connection pool")?;

    let notifications =
        build_notification_sink(settings.smtp()).wrap_err("failed to configure SMTP delivery")?;
    let config = ServerConfig::new(bind_addr, pool, tokens).with_notifications(notifications);

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "listening");

    let outcome = server.await;
    health_state.mark_unhealthy();
    if let Err(err) = &outcome {
        error!(error = %err, "server stopped with an error");
    }
    outcome.wrap_err("server failed")
}
