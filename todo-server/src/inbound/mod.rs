mod api;
mod connection;
mod handlers;
mod lifecycle;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::middleware;
use axum::routing::get;
use tokio::net;
use tower_http::LatencyUnit;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::domain::ports::{HealthCheck, TodoService};

pub use handlers::TodoResponseData;
pub use lifecycle::{ServerState, ShutdownError, ShutdownHandle};

use connection::IdleTimeoutListener;
use lifecycle::Lifecycle;

/// Time budgets applied to each request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RequestTimeouts {
    /// Datastore budget of a /todos handler, measured from the moment the handler starts.
    pub todos: Duration,
    /// Datastore budget of a /healthz ping.
    pub health_check: Duration,
    /// Longest wait between two chunks of a request body.
    pub read_body: Duration,
    /// Longest time from the request head being read to the response being ready.
    pub respond: Duration,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            todos: Duration::from_secs(3),
            health_check: Duration::from_secs(1),
            read_body: Duration::from_secs(15),
            respond: Duration::from_secs(15),
        }
    }
}

/// How long a connection may sit without any bytes read or written before it is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub host: &'a str,
    pub port: u16,
    pub timeouts: RequestTimeouts,
    pub idle_timeout: Duration,
}

/// The global application state shared between all request handlers.
#[derive(Debug, Clone)]
struct AppState<TS: TodoService, HC: HealthCheck> {
    todo_service: Arc<TS>,
    health_check: Arc<HC>,
    timeouts: RequestTimeouts,
}

/// The application's HTTP server. The underlying HTTP package is opaque to module consumers.
pub struct HttpServer {
    router: Router,
    listener: IdleTimeoutListener,
    lifecycle: Lifecycle,
}

impl HttpServer {
    /// Bind the listening socket and wire the routes. Fails if the address cannot be bound.
    pub async fn new(
        todo_service: impl TodoService,
        health_check: impl HealthCheck,
        config: HttpServerConfig<'_>,
    ) -> anyhow::Result<Self> {
        let lifecycle = Lifecycle::new();
        let router = build_router(todo_service, health_check, config.timeouts, lifecycle.clone());

        let listener = net::TcpListener::bind((config.host, config.port))
            .await
            .with_context(|| format!("failed to listen on {}:{}", config.host, config.port))?;

        Ok(Self {
            router,
            listener: IdleTimeoutListener::new(listener, config.idle_timeout),
            lifecycle,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        axum::serve::Listener::local_addr(&self.listener)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(self.lifecycle.clone())
    }

    /// Serve until a shutdown is requested through a [ShutdownHandle], then wait for open
    /// connections to close.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            router,
            listener,
            lifecycle,
        } = self;

        tracing::info!("listening on {}", axum::serve::Listener::local_addr(&listener)?);
        lifecycle.mark_running();

        let stopping = {
            let lifecycle = lifecycle.clone();
            async move { lifecycle.stopping().await }
        };
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(stopping)
            .await;

        lifecycle.mark_stopped();
        tracing::info!("server stopped");

        result.context("received error from running server")
    }
}

/// Build the application's routes without binding a socket.
pub fn router(
    todo_service: impl TodoService,
    health_check: impl HealthCheck,
    timeouts: RequestTimeouts,
) -> Router {
    build_router(todo_service, health_check, timeouts, Lifecycle::new())
}

fn build_router<TS: TodoService, HC: HealthCheck>(
    todo_service: TS,
    health_check: HC,
    timeouts: RequestTimeouts,
    lifecycle: Lifecycle,
) -> Router {
    let state = AppState {
        todo_service: Arc::new(todo_service),
        health_check: Arc::new(health_check),
        timeouts,
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    Router::new()
        .route(
            "/todos",
            get(handlers::list_todos::<TS, HC>)
                .post(handlers::create_todo::<TS, HC>)
                .head(handlers::method_not_allowed)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/healthz",
            get(handlers::health_check::<TS, HC>)
                .head(handlers::method_not_allowed)
                .fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(RequestBodyTimeoutLayer::new(timeouts.read_body))
        .layer(TimeoutLayer::new(timeouts.respond))
        .layer(middleware::map_response(handlers::request_timeout_as_json))
        .layer(middleware::from_fn_with_state(
            lifecycle,
            lifecycle::abort_on_forced_shutdown,
        ))
        .layer(trace_layer)
}
