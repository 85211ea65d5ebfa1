use crate::domain::models::{CreateTodoError, ListTodosError};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// A successful response: a status code and a JSON body.
#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<T>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1.0 == other.1.0
    }
}

impl<T> ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    pub(super) fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Every failure the HTTP layer can report. Messages are safe to show to clients; causes are
/// logged where the error is created and never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    MethodNotAllowed,
    RequestTimeout,
    PayloadTooLarge,
    InternalServerError(String),
    ServiceUnavailable(String),
}

/// The body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method not allowed".to_string(),
            ),
            ApiError::RequestTimeout => {
                (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
            }
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large".to_string(),
            ),
            ApiError::InternalServerError(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            ApiError::ServiceUnavailable(message) => (StatusCode::SERVICE_UNAVAILABLE, message),
        };

        (status, Json(ApiErrorBody { error: message })).into_response()
    }
}

impl From<ListTodosError> for ApiError {
    fn from(e: ListTodosError) -> Self {
        match e {
            ListTodosError::Repository(cause) => {
                tracing::error!("{:?}\n{}", cause, cause);
                Self::InternalServerError("failed to list todos".to_string())
            }
        }
    }
}

impl From<CreateTodoError> for ApiError {
    fn from(e: CreateTodoError) -> Self {
        match e {
            CreateTodoError::TitleRequired(_) => Self::BadRequest("title is required".to_string()),
            CreateTodoError::Repository(cause) => {
                tracing::error!("{:?}\n{}", cause, cause);
                Self::InternalServerError("failed to create todo".to_string())
            }
        }
    }
}
