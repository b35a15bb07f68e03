use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookly::{
    config,
    metrics::Metrics,
    middleware::timeout::with_request_timeout,
    purge::{self, PurgeScheduler},
    routes,
    service::{BookService, UserService},
    state::AppState,
    store::Stores,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (embedded defaults -> bookly.toml -> env/.env)
    let app_cfg = config::load()?;

    // Logging (stdout + daily file rotation under logging.dir)
    std::fs::create_dir_all(&app_cfg.logging.dir).ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily(&app_cfg.logging.dir, "bookly.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},tower_http=info", app_cfg.logging.level).into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Guards must outlive the server so the non-blocking writers flush on exit
    let _log_guards = (stdout_guard, file_guard);

    let stores = Stores::open(&app_cfg).await?;
    let metrics = Metrics::new();

    // Deferred purge: bounded signal queue + one background loop
    let (purge_queue, purge_rx) = purge::channel(app_cfg.purge.capacity);
    let scheduler = PurgeScheduler::new(
        stores.books.clone(),
        purge_rx,
        app_cfg.purge.capacity,
        app_cfg.purge.interval(),
        metrics.clone(),
    );

    let state = AppState::new(
        BookService::new(stores.books.clone(), purge_queue),
        UserService::new(stores.identities.clone()),
        stores.pool.clone(),
        app_cfg.clone(),
        metrics,
        scheduler.status(),
    );

    let cancel = CancellationToken::new();

    // Background failures are fatal to their subsystem only; this task reports them.
    let (fatal_tx, mut fatal_rx) = mpsc::channel::<anyhow::Error>(4);
    let purge_task = tokio::spawn(scheduler.run(cancel.child_token(), fatal_tx));
    let relay_task = tokio::spawn(async move {
        while let Some(err) = fatal_rx.recv().await {
            tracing::error!("Background subsystem stopped: {:#}", err);
        }
    });

    let app = with_request_timeout(
        routes::router(state),
        Duration::from_secs(app_cfg.server.request_timeout_secs),
    )
    .layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            // Request bodies here are small JSON documents
            .layer(DefaultBodyLimit::max(64 * 1024)),
    );

    // CORS: permissive in debug builds for local UI development
    let app = if cfg!(debug_assertions) { app.layer(CorsLayer::permissive()) } else { app };

    let host = app_cfg.server.host.clone();
    let port = app_cfg.server.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Bookly listening on http://{}", listener.local_addr()?);

    let server_cancel = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_cancel.cancelled_owned())
            .await
    });

    tokio::select! {
        res = &mut server => {
            cancel.cancel();
            log_server_exit(res);
        }
        _ = shutdown_signal() => {
            cancel.cancel();
            let grace = Duration::from_secs(app_cfg.server.shutdown_grace_secs);
            match tokio::time::timeout(grace, &mut server).await {
                Ok(res) => log_server_exit(res),
                Err(_) => {
                    tracing::warn!("In-flight requests still running after {}s, forcing shutdown", grace.as_secs());
                    server.abort();
                }
            }
        }
    }

    if let Err(e) = purge_task.await {
        tracing::warn!("Purge task ended abnormally: {}", e);
    }
    let _ = relay_task.await;

    // Storage goes last, after every worker that could touch it has stopped
    if let Some(pool) = stores.pool {
        pool.close().await;
        info!("Database pool closed");
    }

    info!("Server stopped");
    Ok(())
}

fn log_server_exit(res: Result<std::io::Result<()>, JoinError>) {
    match res {
        Ok(Ok(())) => info!("HTTP server drained"),
        Ok(Err(e)) => tracing::error!("HTTP server failed: {}", e),
        Err(e) => tracing::error!("HTTP server task failed: {}", e),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received. Stopping server...");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
