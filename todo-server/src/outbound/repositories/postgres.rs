//! PostgreSQL-backed [TodoRepository] and [HealthCheck].
//!
//! Expects the following table to exist; creating and migrating it is left to the operator.
//!
//! ```sql
//! CREATE TABLE todos (
//!     id BIGSERIAL PRIMARY KEY,
//!     title TEXT NOT NULL,
//!     completed BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use std::time::Duration;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, FromRow};

use crate::domain::{
    models::{Deadline, RepositoryError, Todo, TodoId, TodoTitle},
    ports::{HealthCheck, TodoRepository},
};

const LIST_TODOS: &str = "
    SELECT id, title, completed, created_at
    FROM todos
    ORDER BY created_at DESC, id DESC
";

const INSERT_TODO: &str = "
    INSERT INTO todos (title)
    VALUES ($1)
    RETURNING id, title, completed, created_at
";

/// Connection pool tuning. Correctness does not depend on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(5 * 60),
            max_lifetime: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Open a connection pool and verify the database is reachable within
    /// `settings.connect_timeout`.
    pub async fn connect(url: &str, settings: PoolSettings) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.connect_timeout)
            .idle_timeout(settings.idle_timeout)
            .max_lifetime(settings.max_lifetime)
            .connect_lazy(url)
            .context("invalid database url")?;

        let repository = Self { pool };
        repository
            .ping(Deadline::after(settings.connect_timeout))
            .await
            .context("failed to connect to database")?;

        Ok(repository)
    }

    /// Wait for checked-out connections to be returned, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, FromRow)]
struct TodoRow {
    id: i64,
    title: String,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = RepositoryError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let title = TodoTitle::new(&row.title).map_err(|_| {
            RepositoryError::Persistence(anyhow!("stored todo {} has a blank title", row.id))
        })?;

        Ok(Todo::new(
            TodoId::new(row.id),
            title,
            row.completed,
            row.created_at,
        ))
    }
}

fn persistence(context: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| RepositoryError::Persistence(anyhow::Error::new(e).context(context))
}

impl TodoRepository for PostgresRepository {
    async fn list_todos(&self, deadline: Deadline) -> Result<Vec<Todo>, RepositoryError> {
        deadline
            .enforce(async {
                let rows = sqlx::query_as::<_, TodoRow>(LIST_TODOS)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(persistence("query todos"))?;

                rows.into_iter().map(Todo::try_from).collect()
            })
            .await
    }

    async fn create_todo(
        &self,
        title: &TodoTitle,
        deadline: Deadline,
    ) -> Result<Todo, RepositoryError> {
        deadline
            .enforce(async {
                let row = sqlx::query_as::<_, TodoRow>(INSERT_TODO)
                    .bind(title.as_str())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(persistence("insert todo"))?;

                Todo::try_from(row)
            })
            .await
    }
}

impl HealthCheck for PostgresRepository {
    async fn ping(&self, deadline: Deadline) -> Result<(), RepositoryError> {
        deadline
            .enforce(async {
                let mut connection = self
                    .pool
                    .acquire()
                    .await
                    .map_err(persistence("acquire connection"))?;

                connection
                    .ping()
                    .await
                    .map_err(persistence("ping database"))
            })
            .await
    }
}
