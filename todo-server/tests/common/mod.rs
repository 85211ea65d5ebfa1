#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;

use todo_server::domain::models::{Deadline, RepositoryError, Todo, TodoTitle};
use todo_server::domain::ports::{HealthCheck, TodoRepository};

/// A repository whose datastore is always down.
#[derive(Debug, Clone)]
pub struct FailingRepository;

impl TodoRepository for FailingRepository {
    async fn list_todos(&self, _: Deadline) -> Result<Vec<Todo>, RepositoryError> {
        Err(RepositoryError::Persistence(anyhow::anyhow!(
            "connection refused"
        )))
    }

    async fn create_todo(&self, _: &TodoTitle, _: Deadline) -> Result<Todo, RepositoryError> {
        Err(RepositoryError::Persistence(anyhow::anyhow!(
            "duplicate key value violates unique constraint"
        )))
    }
}

/// A repository that takes `delay` to answer every call and honours the caller's deadline.
#[derive(Debug, Clone)]
pub struct SlowRepository {
    pub delay: Duration,
}

impl TodoRepository for SlowRepository {
    async fn list_todos(&self, deadline: Deadline) -> Result<Vec<Todo>, RepositoryError> {
        deadline
            .enforce(async {
                tokio::time::sleep(self.delay).await;
                Ok(Vec::new())
            })
            .await
    }

    async fn create_todo(&self, _: &TodoTitle, deadline: Deadline) -> Result<Todo, RepositoryError> {
        deadline
            .enforce(async {
                tokio::time::sleep(self.delay).await;
                Err(RepositoryError::Persistence(anyhow::anyhow!("not stored")))
            })
            .await
    }
}

/// A datastore that cannot be reached.
#[derive(Debug, Clone)]
pub struct UnreachableDatastore;

impl HealthCheck for UnreachableDatastore {
    async fn ping(&self, _: Deadline) -> Result<(), RepositoryError> {
        Err(RepositoryError::Persistence(anyhow::anyhow!(
            "no route to host"
        )))
    }
}

/// A datastore that never answers.
#[derive(Debug, Clone)]
pub struct HangingDatastore;

impl HealthCheck for HangingDatastore {
    async fn ping(&self, deadline: Deadline) -> Result<(), RepositoryError> {
        deadline
            .enforce(std::future::pending::<Result<(), RepositoryError>>())
            .await
    }
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn content_type(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
