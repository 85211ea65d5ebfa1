use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{
    models::{Deadline, RepositoryError, Todo, TodoId, TodoTitle},
    ports::{HealthCheck, TodoRepository},
};

/// A process-local store of todos with the same ordering guarantees as the PostgreSQL store.
///
/// Clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    todos: Arc<RwLock<Vec<Todo>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TodoRepository for InMemoryRepository {
    async fn list_todos(&self, deadline: Deadline) -> Result<Vec<Todo>, RepositoryError> {
        deadline
            .enforce(async {
                let mut todos = self.todos.read().await.clone();
                todos.sort_by(|a, b| {
                    b.created_at()
                        .cmp(&a.created_at())
                        .then_with(|| b.id().cmp(&a.id()))
                });
                Ok(todos)
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
                let mut todos = self.todos.write().await;

                let id = TodoId::new(todos.len() as i64 + 1);
                // the wall clock can step backwards; keep created_at monotonic like a sequence
                let created_at = match todos.last() {
                    Some(last) => last.created_at().max(Utc::now()),
                    None => Utc::now(),
                };

                let todo = Todo::new(id, title.clone(), false, created_at);
                todos.push(todo.clone());
                Ok(todo)
            })
            .await
    }
}

impl HealthCheck for InMemoryRepository {
    async fn ping(&self, _: Deadline) -> Result<(), RepositoryError> {
        Ok(())
    }
}
