mod api;
mod cache;
mod middleware;

use std::sync::Arc;

use labsync_core::Environment;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(labsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let is_development = matches!(config.env, Environment::Development);
    if config.webhook_secret.is_none() && !is_development {
        tracing::warn!("AIRTABLE_WEBHOOK_SECRET not set; /sync accepts unauthenticated requests");
    }

    let pool_config = labsync_db::PoolConfig::from_env();
    let pool = labsync_db::connect_pool(&config.database_url, pool_config).await?;
    labsync_db::run_migrations(&pool).await?;

    let articles = labsync_core::load_articles(&config.articles_path)?;
    tracing::info!(
        article_count = articles.len(),
        path = %config.articles_path.display(),
        "articles loaded"
    );

    let auth = AuthState::from_env(is_development)?;
    let state = AppState::from_config(pool, Arc::clone(&config), articles)?;
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "labsync server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
