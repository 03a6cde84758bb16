use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use conf::{Cli, ConfigHandle};
use futures_util::FutureExt;
use protocol::RemoteEnvelope;
use pubsub::{PubSub, nats::NatsPubSub};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use worker::handlers::{self, WorkerCtx};
use worker::session::WorkerSession;

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

    let mut subscription = match pubsub.subscribe(&cli.server_id).await {
        Ok(subscription) => subscription,
        Err(err) => {
            tracing::error!(%err, "pubsub subscribe failed");
            std::process::exit(1);
        }
    };

    let ctx = Arc::new(WorkerCtx::new(cli.server_id.clone(), pubsub.clone(), config));
    tracing::info!(server_id = %cli.server_id, "worker listening");

    let run = async {
        while let Some(bytes) = subscription.next().await {
            match serde_json::from_slice::<RemoteEnvelope>(&bytes) {
                Ok(envelope) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move { handle_envelope(ctx, envelope).await });
                }
                Err(err) => tracing::error!(?err, "malformed remote envelope, dropping"),
            }
        }
    };

    tokio::select! {
        _ = run => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining");
        }
    }

    let _ = tokio::time::timeout(std::time::Duration::from_secs(3), pubsub.close()).await;
}

/// One incoming envelope, end to end: build the session adapter, look up
/// and invoke the route's handler inside a panic guard, marshal the
/// return into a Response envelope, and emit a SessionSync if the handler
/// wrote anything (`spec.md` §4.5 steps 2-4).
async fn handle_envelope(ctx: Arc<WorkerCtx>, envelope: RemoteEnvelope) {
    let mut session = WorkerSession::from_envelope(&envelope);
    let route = envelope.body.route.clone().unwrap_or_default();
    let data = envelope.body.data.clone();

    let outcome = {
        let ctx = ctx.clone();
        let route = route.clone();
        let guarded = AssertUnwindSafe(dispatch(ctx, &mut session, &route, &data)).catch_unwind().await;
        match guarded {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(%route, "handler panicked, dropping envelope");
                return;
            }
        }
    };

    let body = match outcome {
        Ok(value) => serde_json::to_vec(&value).unwrap_or_default(),
        Err(err) => {
            tracing::warn!(%route, %err, "handler returned an error");
            serde_json::to_vec(&json!({ "error": err.to_string() })).unwrap_or_default()
        }
    };
    let response = envelope.respond(Bytes::from(body));
    publish(&ctx.pubsub, envelope.src_worker.clone(), &response).await;

    if let Some(sync) = session.sync_envelope(&ctx.server_id) {
        publish(&ctx.pubsub, sync.dst_worker.clone(), &sync).await;
    }
}

/// Routes by the `handler.method` segments of `serverType.handler.method`
/// (`serverType` is already how the gateway picked this worker; it plays
/// no further part in dispatch here). Unknown combinations are dropped
/// and logged (`spec.md` §4.5 step 2).
async fn dispatch(
    ctx: Arc<WorkerCtx>,
    session: &mut WorkerSession,
    route: &str,
    data: &[u8],
) -> Result<serde_json::Value, platform::Error> {
    let mut parts = route.splitn(3, '.');
    let (_server_type, handler, method) = match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c)) if !c.is_empty() => (a, b, c),
        _ => {
            tracing::warn!(%route, "unknown route, dropping");
            return Err(platform::Error::UnknownRoute(route.to_string()));
        }
    };

    match (handler, method) {
        ("user", "create") => handlers::create_room(&ctx, session, data).await,
        ("user", "enter") => handlers::enter_room(&ctx, session, data).await,
        ("user", "ready") => handlers::ready_room(&ctx, session, data).await,
        ("user", "snapshot") => handlers::snapshot(&ctx, session, data).await,
        ("game", op) => handlers::game_op(&ctx, session, op, data).await,
        _ => {
            tracing::warn!(%route, "unknown route, dropping");
            Err(platform::Error::UnknownRoute(route.to_string()))
        }
    }
}

async fn publish(pubsub: &Arc<dyn PubSub>, subject: String, envelope: &RemoteEnvelope) {
    match serde_json::to_vec(envelope) {
        Ok(bytes) => {
            if let Err(err) = pubsub.publish(&subject, Bytes::from(bytes)).await {
                tracing::warn!(%subject, ?err, "publish failed, dropping (best-effort)");
            }
        }
        Err(err) => tracing::error!(?err, "failed to serialize envelope"),
    }
}
