use anyhow::Result;
use clap::Parser; // for cli
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::{Args, start_server};

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();

    start_server(args).await
}
