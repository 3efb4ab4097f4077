//! dailyplan remote table server
//!
//! Stores plans, achievements and notes for the sync client.
//!
//! # Configuration
//!
//! Environment variables:
//! - `DAILYPLAN_SERVER_PORT`: Port to listen on (default: 8080)
//! - `DAILYPLAN_SERVER_DATA_DIR`: Directory for the database (default: ~/.local/share/dailyplan-server)
//! - `DAILYPLAN_SERVER_CONFIG`: Path to config file (default: ~/.config/dailyplan-server/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! api_keys:
//!   - key: "your-secret-key-here"
//!     name: "phone"
//! ```

use dailyplan::server::{router, ApiKeys, AppState, TableStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
struct ServerConfig {
    port: u16,
    data_dir: PathBuf,
    config_path: PathBuf,
}

impl ServerConfig {
    fn from_env() -> Self {
        let port = std::env::var("DAILYPLAN_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let data_dir = std::env::var("DAILYPLAN_SERVER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("dailyplan-server")
            });

        let config_path = std::env::var("DAILYPLAN_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("dailyplan-server")
                    .join("config.yaml")
            });

        Self {
            port,
            data_dir,
            config_path,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailyplan_server=info,dailyplan=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env();

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Config file: {}", config.config_path.display());

    let tables = TableStore::open(&config.data_dir.join("tables.db")).await?;
    let api_keys = Arc::new(ApiKeys::load(&config.config_path));

    let app = router(AppState { tables, api_keys });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
