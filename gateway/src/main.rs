use std::sync::Arc;

use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use conf::{Cli, ConfigHandle};
use gateway::state::{AppState, INBOUND_QUEUE_CAPACITY};
use gateway::{dispatch, remote, ws};
use pubsub::{PubSub, nats::NatsPubSub};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let cli = Cli::parse();

    let config = match ConfigHandle::load(&cli.config, format!("{}/servers_conf.json", cli.game_dir)).await {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "config load failed");
            std::process::exit(1);
        }
    };

    let pubsub_url = config.app().await.pubsub.url.clone();
    let pubsub: Arc<dyn PubSub> = match NatsPubSub::connect(&pubsub_url).await {
        Ok(client) => Arc::new(client),
        Err(err) => {
            tracing::error!(%err, "pubsub connect failed");
            std::process::exit(1);
        }
    };

    let subscription = match pubsub.subscribe(&cli.server_id).await {
        Ok(subscription) => subscription,
        Err(err) => {
            tracing::error!(%err, "pubsub subscribe failed");
            std::process::exit(1);
        }
    };

    let ws_port = config.app().await.connector.ws_port;
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(INBOUND_QUEUE_CAPACITY);
    let state = Arc::new(AppState::new(cli.server_id.clone(), config, pubsub, inbound_tx));

    let (push_tx, push_rx) = tokio::sync::mpsc::channel(INBOUND_QUEUE_CAPACITY);

    let client_packet_task = tokio::spawn(dispatch::client_packet_consumer(state.clone(), inbound_rx));
    let remote_task = tokio::spawn(remote::remote_consumer(state.clone(), subscription, push_tx));
    let push_task = tokio::spawn(remote::push_consumer(state.clone(), push_rx));

    let app = Router::new().route("/ws", get(websocket_handler)).with_state(state.clone());

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", ws_port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%err, port = ws_port, "bind failed");
            std::process::exit(1);
        }
    };
    tracing::info!(port = ws_port, server_id = %state.server_id, "gateway listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(%err, "server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    client_packet_task.abort();
    remote_task.abort();
    push_task.abort();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(3), state.pubsub.close()).await;
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| ws::handle_socket(socket, state))
}
