use std::sync::Arc;

use clap::Parser;

use chat_gateway::config::Args;
use chat_gateway::server::build_router;
use chat_gateway::{logging, GatewayState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args = Args::parse();
    let addr = args.socket_addr()?;

    let state = Arc::new(GatewayState::new());
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| anyhow::anyhow!("failed to bind {addr}: {source}"))?;

    tracing::info!(%addr, "chat gateway listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
