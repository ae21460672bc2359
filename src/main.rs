use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use krakenhook::config::AppConfig;
use krakenhook::gateway::TradeGateway;
use krakenhook::kraken::KrakenExecutor;
use krakenhook::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to run the webhook server on
    #[arg(short, long, default_value = "8080", env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("krakenhook=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = Arc::new(AppConfig::from_env()?);

    info!("Starting TradingView to Kraken webhook service");
    info!("Config: {}", config.summary());
    info!("Port: {}", args.port);

    if config.webhook_secret.is_none() {
        warn!("No webhook secret configured: signature verification is DISABLED");
    }

    // The Kraken client initializes lazily on the first trade request
    let gateway: Arc<dyn TradeGateway> = Arc::new(KrakenExecutor::new(config.clone()));
    let state = Arc::new(AppState { config, gateway });
    let app = server::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
