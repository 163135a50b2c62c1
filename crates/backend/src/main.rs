use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use login_backend::auth::{
    spawn_session_pruning, Authenticator, CookieSettings, GoogleProvider, SessionManager,
};
use login_backend::config::{AppConfig, StoreBackend};
use login_backend::memory::{InMemorySessionStore, InMemoryUserStore};
use login_backend::repository::{PgSessionStore, PgUserStore, SessionStore, UserStore};
use login_backend::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail before binding anything if configuration is incomplete
    let config = AppConfig::from_env().context("Invalid configuration")?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let (users, sessions) = match &config.store {
        StoreBackend::Postgres {
            database_url,
            pool_size,
        } => {
            let pool = db::establish_connection_pool(database_url, *pool_size)?;
            db::ensure_schema(&pool)
                .await
                .context("Failed to prepare database schema")?;
            tracing::info!("Database connection pool initialized");

            let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
            let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool));
            (users, sessions)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; users and sessions are lost on restart");

            let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
            let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
            (users, sessions)
        }
    };

    let provider = GoogleProvider::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
        config.provider_timeout,
    )
    .context("Failed to build HTTP client")?;

    let session_manager = SessionManager::new(sessions, users.clone(), config.session_ttl);
    spawn_session_pruning(session_manager.clone(), config.session_prune_interval);

    let cookies = CookieSettings::new(
        &config.session_secret,
        config.session_cookie_name.clone(),
        config.cookie_secure,
        config.session_ttl,
    )?;

    let state = AppState::new(
        Authenticator::new(Arc::new(provider), users, session_manager),
        cookies,
    );
    let app = routes::app_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
