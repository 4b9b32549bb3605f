use clap::Parser;
use postable::config::BrokerConfig;
use postable::server::{NodeContext, build_router};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "postable", about = "Task broker node with broadcast fan-out")]
struct Args {
    /// TOML config file (defaults to ./postable.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 1. Configuration:
    let mut config = BrokerConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    // 2. Logging (RUST_LOG wins over the configured level):
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    // 3. Node context:
    let context = NodeContext::from_config(&config)?;
    tracing::info!("Cluster ID: {}", context.cluster_id.0);

    if context.basic_auth.is_some() {
        tracing::info!("Postable basic auth enabled.");
    }

    let peers = context.dispatcher.peers();
    if peers.is_empty() {
        tracing::info!("No broadcast peers configured, broadcast route disabled");
    } else {
        tracing::info!("Broadcasting to {} peers:", peers.len());
        for peer in peers {
            tracing::info!("  - {}", peer.base_uri);
        }
    }

    // 4. HTTP server:
    let app = build_router(context);
    let bind_addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Postable listening at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
