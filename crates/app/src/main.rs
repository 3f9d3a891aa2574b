mod api;
mod auth;
mod problem;
mod router;
mod telemetry;
mod workflow;

use std::{net::SocketAddr, time::Duration};

use tracing::info;
use url::Url;

use placement_mailer::{HttpMailer, Mailer, Outbox};
use placement_storage::Database;
use placement_util::{load_env_file, AppConfig};

const MAILER_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", url = %config.database_url, "database ready");

    let mailer = build_mailer(&config)?;
    info!(stage = "mail", backend = mailer.backend(), "mailer configured");

    let tokens = auth::TokenService::new(&config.token_secret, config.token_ttl_secs);
    let state = router::AppState::new(metrics, database, mailer, tokens);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}

/// Relay delivery when configured, otherwise the in-process outbox.
fn build_mailer(config: &AppConfig) -> Result<Mailer, Box<dyn std::error::Error>> {
    let Some(relay) = &config.mailer else {
        return Ok(Mailer::Outbox(Outbox::default()));
    };

    // `Url::join` replaces the last segment unless the base ends with a slash.
    let mut base = relay.base_url.clone();
    if !base.ends_with('/') {
        base.push('/');
    }
    let http = reqwest::Client::builder().timeout(MAILER_TIMEOUT).build()?;
    Ok(Mailer::Http(HttpMailer::new(
        Url::parse(&base)?,
        relay.api_key.clone(),
        relay.from_address.clone(),
        http,
    )))
}
