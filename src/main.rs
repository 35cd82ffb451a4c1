use anyhow::Result;
use idswatch::*;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// All dashboard work shares one thread; tasks interleave only at await points.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (snapshot_tx, _) = broadcast::channel::<models::DashboardSnapshot>(
        app_config.publishing.broadcast_capacity,
    );

    let http = commands::CommandClient::http_client(tokio::time::Duration::from_millis(
        app_config.endpoint.request_timeout_ms,
    ))?;
    let command_client = commands::CommandClient::new(http, &app_config.endpoint.base_url);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let (engine_handle, engine_task) = engine::spawn(
        engine::EngineDeps {
            commands: command_client,
            snapshot_tx,
            shutdown_rx,
        },
        engine::EngineConfig::from_app(&app_config),
    );
    tracing::info!(
        endpoint = %app_config.endpoint.base_url,
        interface = %app_config.endpoint.interface,
        "Dashboard engine started"
    );

    let app = routes::app(engine_handle);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
        }
    }

    let _ = shutdown_tx.send(());
    let _ = engine_task.await;
    Ok(())
}
