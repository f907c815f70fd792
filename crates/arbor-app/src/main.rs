use std::sync::Arc;

use salvo::Listener;
use salvo::conn::TcpListener;

use arbor_app::app::service_router;
use arbor_core::config::{StorageBackend, load_config};
use arbor_db::db::DataStore;
use arbor_db::db::connection::{create_pool, run_migrations};
use arbor_db::db::memory::MemoryStore;
use arbor_db::db::pg::PgStore;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting arbor server");

    let config = load_config()?;

    tracing::info!(
        backend = ?config.storage.backend,
        bind = %config.server.bind_addr(),
        "Configuration loaded"
    );

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let store: Arc<dyn DataStore> = match config.storage.backend {
        StorageBackend::Postgres => {
            if config.database.run_migrations {
                run_migrations(&config.database.url).await?;
                tracing::info!("Database migrations applied");
            }
            let pool = create_pool(
                &config.database.url,
                u32::from(config.database.max_connections),
            )
            .await?;
            tracing::info!("Database connection pool created.");
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let bind_addr = config.server.bind_addr();
    let router = service_router(store, config)?;
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
