use anyhow::Context;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use todo_server::config::Config;
use todo_server::domain::service::Service;
use todo_server::inbound::{HttpServer, HttpServerConfig, RequestTimeouts};
use todo_server::outbound::repositories::PostgresRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_server=debug,tower_http=debug".into()),
        )
        .init();

    let repository =
        PostgresRepository::connect(&config.database_url, config.pool_settings()).await?;
    tracing::info!("connected to database");

    let todo_service = Service::new(repository.clone());

    let server_config = HttpServerConfig {
        host: &config.host,
        port: config.port,
        timeouts: RequestTimeouts {
            todos: config.request_timeout(),
            health_check: config.health_check_timeout(),
            read_body: config.read_timeout(),
            respond: config.write_timeout(),
        },
        idle_timeout: config.idle_timeout(),
    };
    let http_server = HttpServer::new(todo_service, repository.clone(), server_config).await?;
    let shutdown = http_server.shutdown_handle();

    let mut server = tokio::spawn(http_server.run());

    tokio::select! {
        () = shutdown_signal() => {}
        joined = &mut server => {
            // the server only returns on its own when serving failed
            return joined.context("http server task failed")?;
        }
    }

    match shutdown.shutdown(config.shutdown_timeout()).await {
        Ok(()) => server.await.context("http server task failed")??,
        Err(error) => {
            tracing::warn!(%error, "forced shutdown");
            server.abort();
        }
    }

    repository.close().await;
    tracing::info!("server shutdown complete");

    Ok(())
}

/// Resolves on the first SIGINT (Ctrl+C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
