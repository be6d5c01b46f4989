//! # forum-server
//!
//! The entry point that assembles the application from its adapters.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{router, AppState, Metrics};
use auth_adapters::{Argon2Hasher, JwtIssuer};
use configs::{LogFormat, LogSettings, Settings};
use domains::{ActivityLog, ThreadRepository, UserRepository};
use secrecy::ExposeSecret;
use services::{ActivityRecorder, AuthService, ThreadService};
use storage_adapters::PgForumStore;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for queued activity entries to be written.
const ACTIVITY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    // 1. Relational store
    let store = Arc::new(
        PgForumStore::connect_lazy(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
            settings.database.acquire_timeout(),
            Some(settings.store_timeout()),
        )
        .context("configuring database pool")?,
    );
    if settings.database.run_migrations {
        store.migrate().await.context("running migrations")?;
    }

    // 2. Activity log (optional)
    let (activity_log, probe) = activity_sink(&settings)?;
    let (recorder, activity_worker) = match &activity_log {
        Some(sink) => {
            let (recorder, worker) =
                ActivityRecorder::spawn(Arc::clone(sink), settings.activity.queue_capacity);
            (recorder, Some(worker))
        }
        None => {
            warn!("activity logging disabled");
            (ActivityRecorder::disabled(), None)
        }
    };

    // 3. Services
    let tokens = JwtIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl())
        .context("configuring token issuer")?;
    let threads = ThreadService::new(
        Arc::clone(&store) as Arc<dyn ThreadRepository>,
        recorder.clone(),
        settings.store_timeout(),
    );
    let auth = AuthService::new(
        store as Arc<dyn UserRepository>,
        Arc::new(Argon2Hasher::new()),
        Arc::new(tokens),
        recorder,
        settings.store_timeout(),
    );

    let state = AppState {
        threads,
        auth,
        activity_log,
        metrics: Arc::new(Metrics::new()),
    };
    let app = router(state);

    // 4. Serve
    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("forum backend listening on http://{address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serving HTTP")?;

    // Every recorder clone went away with the router; let the worker finish.
    if let Some(probe) = probe {
        probe.abort();
    }
    if let Some(worker) = activity_worker {
        if tokio::time::timeout(ACTIVITY_DRAIN_TIMEOUT, worker).await.is_err() {
            warn!("activity queue not drained before shutdown");
        }
    }

    info!("server stopped");
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

type ActivitySink = (Option<Arc<dyn ActivityLog>>, Option<JoinHandle<()>>);

#[cfg(feature = "redis")]
fn activity_sink(settings: &Settings) -> anyhow::Result<ActivitySink> {
    use storage_adapters::RedisActivityLog;

    let Some(url) = &settings.activity.redis_url else {
        return Ok((None, None));
    };
    let log = Arc::new(
        RedisActivityLog::new(
            url.expose_secret(),
            settings.activity.stream.clone(),
            settings.activity.max_len,
            settings.activity.timeout(),
        )
        .context("configuring activity log")?,
    );
    let probe = log.spawn_readiness_probe(settings.activity.probe_interval());
    Ok((Some(log as Arc<dyn ActivityLog>), Some(probe)))
}

#[cfg(not(feature = "redis"))]
fn activity_sink(settings: &Settings) -> anyhow::Result<ActivitySink> {
    if settings.activity.redis_url.is_some() {
        warn!("activity.redis_url is set but this build has no `redis` feature");
    }
    Ok((None, None))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
