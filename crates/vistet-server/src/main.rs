mod api;
mod middleware;

use tracing_subscriber::EnvFilter;
use vistet_core::{extract_store_origin, AppConfig};
use vistet_db::ScrapedStore;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = vistet_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting vistet server");

    let pool = vistet_db::connect_pool_from_config(&config).await?;
    let applied = vistet_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");

    let state = AppState {
        pool,
        scraped_store: scraped_store_for(&config),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// The ingestion owner store: configured name, storefront origin as site.
fn scraped_store_for(config: &AppConfig) -> ScrapedStore {
    let mut store = ScrapedStore::named(&config.scraped_store_name);
    store.site_url = Some(extract_store_origin(&config.storefront_url));
    store
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
