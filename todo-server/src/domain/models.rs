use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use thiserror::Error;
use tokio::time::Instant;

/// A task tracked by the API. Records are owned by the datastore; the domain never caches them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Todo {
    id: TodoId,
    title: TodoTitle,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(id: TodoId, title: TodoTitle, completed: bool, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            completed,
            created_at,
        }
    }

    pub fn id(&self) -> TodoId {
        self.id
    }

    pub fn title(&self) -> &TodoTitle {
        &self.title
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Datastore-assigned identifier, increasing with insertion order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
pub struct TodoId(i64);

impl TodoId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

/// A todo title with surrounding whitespace removed. Never empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct TodoTitle(String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("title is required")]
pub struct TitleRequiredError;

impl TodoTitle {
    pub fn new(raw: &str) -> Result<Self, TitleRequiredError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TitleRequiredError);
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The instant by which a datastore operation must have completed.
///
/// A `Deadline` is derived from the request that triggered the operation. Work still pending when
/// it elapses is dropped, which cancels the underlying query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// Drive `operation` to completion, or fail with [RepositoryError::Timeout] once the deadline
    /// passes.
    pub async fn enforce<T, F>(self, operation: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout_at(self.0, operation)
            .await
            .map_err(|_| RepositoryError::Timeout)?
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("datastore deadline exceeded")]
    Timeout,
    #[error("datastore operation failed: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ListTodosError {
    #[error("failed to list todos")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum CreateTodoError {
    #[error(transparent)]
    TitleRequired(#[from] TitleRequiredError),
    // to be extended as new validation rules are introduced
    #[error("failed to create todo")]
    Repository(#[from] RepositoryError),
}
