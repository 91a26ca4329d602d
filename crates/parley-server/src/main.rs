use std::sync::Arc;

use tracing::{info, warn};

use parley_db::Database;
use parley_gateway::Gateway;
use parley_server::config::{Config, DEV_JWT_SECRET};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.jwt_secret == DEV_JWT_SECRET {
        warn!("PARLEY_JWT_SECRET not set, using the development secret");
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    let gateway = Gateway::new(db);

    let app = parley_server::app(&config, gateway);

    let addr = config.bind_addr()?;
    info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
