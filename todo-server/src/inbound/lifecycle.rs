/*!
   Module `lifecycle` tracks the state of an [HttpServer](super::HttpServer) and coordinates its
   graceful shutdown.

   States only move forward: `Starting → Running → Stopping → Stopped`. A server that has not
   started serving yet may also go straight from `Starting` to `Stopping`.

   There is no state before `Starting`: a server only exists once its socket is bound, so a bind
   failure surfaces as the error returned by [HttpServer::new](super::HttpServer::new) and no
   [ShutdownHandle] is ever handed out for it.
*/

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::sync::watch;

use super::api::ApiError;

/// How long aborted requests get to unwind once the shutdown deadline has passed.
const ABORT_GRACE: Duration = Duration::from_secs(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ServerState {
    /// The listening socket is bound but no connection is being accepted yet.
    Starting,
    Running,
    /// No new connections are accepted; in-flight requests are draining.
    Stopping,
    Stopped,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("server is not running (state: {0:?})")]
    NotRunning(ServerState),
    #[error("in-flight requests did not finish within {0:?} and were aborted")]
    DeadlineExceeded(Duration),
}

#[derive(Clone, Debug)]
pub(super) struct Lifecycle {
    state: Arc<watch::Sender<ServerState>>,
    abort: Arc<watch::Sender<bool>>,
}

impl Lifecycle {
    pub(super) fn new() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(ServerState::Starting)),
            abort: Arc::new(watch::Sender::new(false)),
        }
    }

    fn current(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Move `Starting → Running`. A shutdown requested before the server started wins.
    pub(super) fn mark_running(&self) {
        self.state.send_if_modified(|state| {
            if *state == ServerState::Starting {
                *state = ServerState::Running;
                true
            } else {
                false
            }
        });
    }

    pub(super) fn mark_stopped(&self) {
        self.state.send_replace(ServerState::Stopped);
    }

    fn begin_stopping(&self) -> Result<(), ShutdownError> {
        let mut observed = ServerState::Starting;
        let requested = self.state.send_if_modified(|state| {
            observed = *state;
            match *state {
                ServerState::Starting | ServerState::Running => {
                    *state = ServerState::Stopping;
                    true
                }
                ServerState::Stopping | ServerState::Stopped => false,
            }
        });

        if requested {
            Ok(())
        } else {
            Err(ShutdownError::NotRunning(observed))
        }
    }

    /// Resolves once shutdown has been requested.
    pub(super) async fn stopping(&self) {
        let mut state = self.state.subscribe();
        let _ = state
            .wait_for(|state| matches!(state, ServerState::Stopping | ServerState::Stopped))
            .await;
    }

    async fn stopped(&self) {
        let mut state = self.state.subscribe();
        let _ = state.wait_for(|state| *state == ServerState::Stopped).await;
    }

    /// Resolves once in-flight requests have been told to give up.
    async fn aborted(&self) {
        let mut abort = self.abort.subscribe();
        let _ = abort.wait_for(|aborted| *aborted).await;
    }

    fn abort_in_flight(&self) {
        self.abort.send_replace(true);
    }
}

/// A cloneable handle used to stop a running [HttpServer](super::HttpServer).
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    lifecycle: Lifecycle,
}

impl ShutdownHandle {
    pub(super) fn new(lifecycle: Lifecycle) -> Self {
        Self { lifecycle }
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.current()
    }

    /// Stop accepting connections and wait up to `deadline` for in-flight requests to finish.
    ///
    /// Requests still running at the deadline are aborted with a 503 response.
    ///
    /// # Errors
    ///
    /// - [ShutdownError::NotRunning] if shutdown was already requested.
    /// - [ShutdownError::DeadlineExceeded] if requests had to be aborted.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ShutdownError> {
        self.lifecycle.begin_stopping()?;
        tracing::info!(?deadline, "draining in-flight requests");

        if tokio::time::timeout(deadline, self.lifecycle.stopped())
            .await
            .is_ok()
        {
            return Ok(());
        }

        tracing::warn!(?deadline, "shutdown deadline elapsed, aborting in-flight requests");
        self.lifecycle.abort_in_flight();
        if tokio::time::timeout(ABORT_GRACE, self.lifecycle.stopped())
            .await
            .is_err()
        {
            tracing::error!("server did not stop after aborting in-flight requests");
        }

        Err(ShutdownError::DeadlineExceeded(deadline))
    }
}

/// Middleware racing every request against a forced shutdown. Dropping the losing handler
/// future cancels whatever datastore work it was waiting on.
pub(super) async fn abort_on_forced_shutdown(
    State(lifecycle): State<Lifecycle>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        () = lifecycle.aborted() => {
            ApiError::ServiceUnavailable("server is shutting down".to_string()).into_response()
        }
    }
}
