use std::sync::Arc;

use axum::Router;
use clap::crate_version;
use graphql_ws::{
    engine::AsyncGraphqlEngine,
    transport::axum::{WebsocketAccepter, WebsocketService},
};
use tokio::{net::TcpListener, runtime, signal, sync::mpsc};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

mod args;
mod config;
mod schema;

const THREAD_NAME: &str = "graphql-ws-server";

fn main() -> anyhow::Result<()> {
    let args = self::args::parse();
    let config = args.config()?;

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    runtime.block_on(async move {
        let filter = args.log_level.unwrap_or_default().directives();

        tracing_subscriber::registry()
            .with(args.log_format())
            .with(EnvFilter::new(filter))
            .init();

        let crate_version = crate_version!();
        tracing::info!("GraphQL websocket server {crate_version}");

        let listen_address = args.listen_address(&config);
        let engine = Arc::new(AsyncGraphqlEngine::new(schema::build()));

        let (websocket_sender, websocket_receiver) = mpsc::channel(16);
        let protocol = config.websocket.protocol.clone();
        let websocket_accepter = WebsocketAccepter::new(websocket_receiver, engine, config.websocket);

        tokio::spawn(websocket_accepter.handler());

        let router = Router::new().route_service(
            &config.graph.websocket_path,
            WebsocketService::new(websocket_sender, protocol),
        );

        let listener = TcpListener::bind(listen_address).await?;
        tracing::info!("Listening on ws://{listen_address}{}", config.graph.websocket_path);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for the shutdown signal: {error}");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutting down");
}
