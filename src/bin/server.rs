//! Sales API server: reads settings, prepares the store, serves the API.

use sales_api::{app, ensure_database_exists, ensure_tables, AppState, PgGateway, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sales_api=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let connect = settings.db.connect_options()?;
    if settings.auto_migrate {
        ensure_database_exists(&connect).await?;
    }
    let pool = settings.db.pool_options().connect_with(connect).await?;
    tracing::info!(max_connections = settings.db.max_connections, "connection pool ready");
    if settings.auto_migrate {
        ensure_tables(&pool).await?;
    }

    let state = AppState::new(Arc::new(PgGateway::new(pool)));
    let router = app(state, settings.body_limit);

    let listener = TcpListener::bind(&settings.listen_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
