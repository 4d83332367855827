//! TuneLobby Accounts service
//!
//! Account identity and session lifecycle for the TuneLobby music-sharing
//! platform: registration, email verification, login/logout, password reset.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunelobby_accounts::{
    routes, AccountStore, AuthService, Config, ConsoleMailer, InMemoryAccountStore,
    InMemorySessionStore, Mailer, SmtpConfig, SmtpMailer, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunelobby_accounts=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    // Pick a mailer: SMTP when configured, console links otherwise
    let mailer: Box<dyn Mailer> = match SmtpConfig::from_env() {
        Some(smtp) => {
            Box::new(SmtpMailer::new(smtp, config.base_url.clone()).map_err(anyhow::Error::msg)?)
        }
        None => {
            tracing::warn!("SMTP not configured; email links go to the console");
            Box::new(ConsoleMailer::new(config.base_url.clone()))
        }
    };

    // Pick stores: SQLite when a database path is configured
    let app = match &config.database_path {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            tracing::info!(path = %path, "Using SQLite store");
            spawn_token_cleanup(store.clone());
            let service = Arc::new(AuthService::new(store.clone(), store, mailer));
            routes::create_router(service)
        }
        None => {
            tracing::warn!("DATABASE_PATH not set; using in-memory stores");
            let store = Arc::new(InMemoryAccountStore::new());
            spawn_token_cleanup(store.clone());
            let service = Arc::new(AuthService::new(
                store,
                InMemorySessionStore::new(),
                mailer,
            ));
            routes::create_router(service)
        }
    };

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Accounts service listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Lazily purge expired tokens once an hour
fn spawn_token_cleanup<A: AccountStore + 'static>(store: A) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match store.cleanup_expired_tokens() {
                Ok(0) => {}
                Ok(n) => tracing::info!(purged = n, "Expired tokens purged"),
                Err(err) => tracing::warn!(error = %err, "Token cleanup failed"),
            }
        }
    });
}
