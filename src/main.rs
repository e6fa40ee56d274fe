mod account;
mod app;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod handlers;
mod media;
mod payments;
mod plans;
mod response;
mod storage;
mod tasks;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use app::{AppSettings, AppState, Collaborators, build_router};
use auth::external::ExternalAuthProvider;
use auth::google::GoogleProvider;
use config::Config;
use db::pg_store::PgStore;
use email::resend::ResendClient;
use email::retry::RetryConfig;
use email::{EmailSender, LogOnlySender};
use payments::stripe::StripeClient;
use plans::expiration::ExpirationSweep;
use plans::notifications::NotificationTemplates;
use storage::s3::S3Storage;
use tasks::token_cleanup::TokenCleanupTask;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Si RUST_LOG n'est pas défini, utiliser ces règles par défaut
        tracing_subscriber::EnvFilter::new("info,reelbox=debug,hyper_util=warn,tower_http=info")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn EmailSender>> {
    match &config.email.resend_api_key {
        Some(key) => {
            let client = ResendClient::new(
                key.clone(),
                config.email.from.clone(),
                RetryConfig::default(),
            )?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("RESEND_API_KEY not set, notification emails are only logged");
            Ok(Arc::new(LogOnlySender))
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

// ----------------- Main -----------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging();
    tracing::info!("Starting reelbox...");

    let config = Config::from_env()?;
    tracing::info!(production = config.is_production(), "Configuration ready");

    db::connection::init_pool(&config.database_url, config.database_pool_size)?;
    db::connection::run_migrations()?;
    let store = Arc::new(PgStore);

    let storage = Arc::new(S3Storage::new(config.s3.clone()).context("Invalid S3 configuration")?);
    let oauth_providers: Vec<Arc<dyn ExternalAuthProvider>> = match &config.google {
        Some(google) => {
            let google: Arc<dyn ExternalAuthProvider> =
                Arc::new(GoogleProvider::new(google.clone()));
            vec![google]
        }
        None => {
            tracing::warn!("Google OAuth not configured, external login disabled");
            Vec::new()
        }
    };
    let collaborators = Collaborators {
        storage: storage.clone(),
        payments: Arc::new(StripeClient::new(config.stripe.clone())),
        oauth_providers,
    };

    let state = AppState::new(store.clone(), collaborators, &AppSettings::from(&config));
    for (email, role) in &config.role_grants {
        if !state.accounts.grant_role(email, *role)? {
            tracing::warn!(email, role = role.as_str(), "Role not granted, account not found");
        }
    }

    // Tâches de fond
    let shutdown = CancellationToken::new();
    let cleanup = Arc::new(TokenCleanupTask::new(
        (*state.tokens).clone(),
        config.token_cleanup_interval,
    ));
    let sweep = Arc::new(ExpirationSweep::new(
        store,
        storage,
        build_mailer(&config)?,
        NotificationTemplates::new(config.email.public_url.clone()),
        config.plan_sweep_interval,
    ));
    let workers = [
        tasks::spawn(cleanup, shutdown.clone()),
        tasks::spawn(sweep, shutdown.clone()),
    ];

    let app = build_router(state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Background task panicked");
        }
    }

    Ok(())
}
