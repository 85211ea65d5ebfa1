use super::AppState;
use super::api::{ApiError, ApiSuccess};
use crate::domain::models::{Deadline, Todo};
use crate::domain::ports::{HealthCheck, TodoService};

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The JSON representation of a [Todo].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoResponseData {
    pub id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Todo> for TodoResponseData {
    fn from(todo: &Todo) -> Self {
        Self {
            id: todo.id().get(),
            title: todo.title().to_string(),
            completed: todo.completed(),
            created_at: todo.created_at(),
        }
    }
}

/// The body of a successful health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponseData {
    status: &'static str,
}

#[derive(Debug, Error)]
#[error("invalid request body: {0}")]
pub(super) struct ParseCreateTodoHttpRequestError(#[from] serde_json::Error);

impl From<ParseCreateTodoHttpRequestError> for ApiError {
    fn from(e: ParseCreateTodoHttpRequestError) -> Self {
        tracing::debug!("{}", e);
        ApiError::BadRequest("invalid request body".to_string())
    }
}

/// The body of a [Todo] creation request. `title` is the only accepted field; a missing or
/// `null` title decodes as empty and is rejected by validation.
///
/// The body must hold exactly one JSON object: anything but whitespace after it is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTodoHttpRequestBody {
    title: Option<String>,
}

impl CreateTodoHttpRequestBody {
    fn parse(body: &[u8]) -> Result<Self, ParseCreateTodoHttpRequestError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        tracing::debug!("failed to read request body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest("invalid request body".to_string())
        }
    }
}

/// List every [Todo], newest first.
///
/// # Responses
///
/// - 200 OK: a JSON array, empty when there are no todos.
/// - 500 Internal server error: the todos could not be read in time.
pub(super) async fn list_todos<TS: TodoService, HC: HealthCheck>(
    State(state): State<AppState<TS, HC>>,
) -> Result<ApiSuccess<Vec<TodoResponseData>>, ApiError> {
    let deadline = Deadline::after(state.timeouts.todos);
    state
        .todo_service
        .list_todos(deadline)
        .await
        .map_err(ApiError::from)
        .map(|todos| {
            let data = todos.iter().map(TodoResponseData::from).collect();
            ApiSuccess::new(StatusCode::OK, data)
        })
}

/// Create a new [Todo].
///
/// The body is decoded from raw bytes, so the request's `Content-Type` is not checked.
///
/// # Responses
///
/// - 201 Created: the [Todo] was successfully created.
/// - 400 Bad request: the body was not a valid creation request, could not be read in time, or
///   the title was blank.
/// - 413 Payload too large: the body exceeded the request body limit.
/// - 500 Internal server error: the [Todo] could not be stored in time.
pub(super) async fn create_todo<TS: TodoService, HC: HealthCheck>(
    State(state): State<AppState<TS, HC>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<ApiSuccess<TodoResponseData>, ApiError> {
    let body = CreateTodoHttpRequestBody::parse(&body?)?;
    let deadline = Deadline::after(state.timeouts.todos);
    state
        .todo_service
        .create_todo(body.title(), deadline)
        .await
        .map_err(ApiError::from)
        .map(|ref todo| ApiSuccess::new(StatusCode::CREATED, todo.into()))
}

/// Report whether the datastore answers within the health check budget.
///
/// # Responses
///
/// - 200 OK: `{"status":"ok"}`.
/// - 503 Service unavailable: the datastore could not be reached.
pub(super) async fn health_check<TS: TodoService, HC: HealthCheck>(
    State(state): State<AppState<TS, HC>>,
) -> Result<ApiSuccess<HealthResponseData>, ApiError> {
    let deadline = Deadline::after(state.timeouts.health_check);
    state.health_check.ping(deadline).await.map_err(|e| {
        tracing::warn!(error = %e, "health check ping failed");
        ApiError::ServiceUnavailable("database unavailable".to_string())
    })?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        HealthResponseData { status: "ok" },
    ))
}

pub(super) async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub(super) async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Give the empty 408 produced when a request outlives its response budget the usual error body.
pub(super) async fn request_timeout_as_json(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return ApiError::RequestTimeout.into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::domain::service::Service;
    use crate::inbound::RequestTimeouts;
    use crate::outbound::repositories::InMemoryRepository;

    fn state() -> AppState<Service<InMemoryRepository>, InMemoryRepository> {
        let repository = InMemoryRepository::new();
        AppState {
            todo_service: Arc::new(Service::new(repository.clone())),
            health_check: Arc::new(repository),
            timeouts: RequestTimeouts::default(),
        }
    }

    #[test]
    fn create_body_accepts_only_title() {
        let parsed = CreateTodoHttpRequestBody::parse(br#"{"title":"Buy milk"}"#).unwrap();
        assert_eq!(parsed.title(), "Buy milk");

        assert!(CreateTodoHttpRequestBody::parse(br#"{"title":"Buy milk","extra":1}"#).is_err());
        assert!(CreateTodoHttpRequestBody::parse(br#"{"title":5}"#).is_err());
        assert!(CreateTodoHttpRequestBody::parse(b"not json").is_err());
    }

    #[test]
    fn create_body_without_title_is_blank() {
        for body in [&b"{}"[..], &br#"{"title":null}"#[..]] {
            let parsed = CreateTodoHttpRequestBody::parse(body).unwrap();

            assert_eq!(parsed.title(), "");
        }
    }

    #[test]
    fn create_body_rejects_trailing_data() {
        assert!(CreateTodoHttpRequestBody::parse(b"{\"title\":\"a\"} \n").is_ok());
        assert!(CreateTodoHttpRequestBody::parse(br#"{"title":"a"} {}"#).is_err());
    }

    #[tokio::test]
    async fn create_todo_success() {
        let state = state();

        let body = Bytes::from_static(br#"{"title":" Walk dog "}"#);

        let response = create_todo(State(state.clone()), Ok(body)).await.unwrap();

        let listed = state
            .todo_service
            .list_todos(Deadline::after(Duration::from_secs(1)))
            .await
            .unwrap();
        assert_eq!(
            response,
            ApiSuccess::new(StatusCode::CREATED, (&listed[0]).into())
        );
        assert_eq!(listed[0].title().as_str(), "Walk dog");
    }

    #[tokio::test]
    async fn create_todo_blank_title() {
        let body = Bytes::from_static(br#"{"title":"   "}"#);

        let response = create_todo(State(state()), Ok(body)).await;

        assert_eq!(
            response.unwrap_err(),
            ApiError::BadRequest("title is required".to_string())
        );
    }

    #[tokio::test]
    async fn list_todos_empty() {
        let response = list_todos(State(state())).await.unwrap();

        assert_eq!(response, ApiSuccess::new(StatusCode::OK, vec![]));
    }

    #[tokio::test]
    async fn health_check_ok() {
        let response = health_check(State(state())).await.unwrap();

        assert_eq!(
            response,
            ApiSuccess::new(StatusCode::OK, HealthResponseData { status: "ok" })
        );
    }
}
