use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tern::api;
use tern::cli;
use tern::gossip::{GossipScheduler, HttpTransport};
use tern::node::RateLimiterNode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tern=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let args = cli::Cli::parse();
    let settings = args.into_settings();

    // Socket server listen address setup
    let listen_address: IpAddr = settings.listen_address.parse()?;
    let socket_address = SocketAddr::from((listen_address, settings.listen_port));

    // One node per process, shared by the API handlers and the scheduler
    let node = Arc::new(RateLimiterNode::new(settings.bucket));
    info!(
        "Replica {} enforcing capacity {} at {} token(s)/s",
        node.replica_id(),
        settings.bucket.capacity,
        settings.bucket.refill_rate
    );

    // Gossip loop, bound to the node's lifetime via the shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let transport = Arc::new(HttpTransport::new(settings.push_timeout())?);
    let scheduler = GossipScheduler::new(
        node.clone(),
        transport,
        settings.peers.clone(),
        settings.gossip_interval(),
        settings.push_timeout(),
    );
    let gossip_handle = tokio::spawn(scheduler.run(shutdown_rx));

    // Build Axum Router
    let api = api::api(node).layer(TraceLayer::new_for_http());

    // Start server
    info!("Starting Tern on {}", socket_address);
    axum::Server::bind(&socket_address)
        .serve(api.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the gossip loop before exiting
    let _ = shutdown_tx.send(true);
    gossip_handle.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown signal handler: {}", err);
    }
}
