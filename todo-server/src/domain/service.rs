/*!
   Module `service` provides the canonical implementation of the [TodoService] port.
*/

use super::{
    models::{CreateTodoError, Deadline, ListTodosError, Todo, TodoTitle},
    ports::{TodoRepository, TodoService},
};

/// Canonical implementation of the [TodoService] port, through which the todo domain API is
/// consumed.
#[derive(Debug, Clone)]
pub struct Service<R>
where
    R: TodoRepository,
{
    repository: R,
}

impl<R> Service<R>
where
    R: TodoRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

impl<R> TodoService for Service<R>
where
    R: TodoRepository,
{
    async fn list_todos(&self, deadline: Deadline) -> Result<Vec<Todo>, ListTodosError> {
        let todos = self.repository.list_todos(deadline).await?;
        Ok(todos)
    }

    /// Validate `raw_title` and store the resulting [Todo].
    ///
    /// # Errors
    ///
    /// - [CreateTodoError::TitleRequired] before any repository call if the title is blank.
    /// - Wraps any error returned by the [TodoRepository].
    async fn create_todo(&self, raw_title: &str, deadline: Deadline) -> Result<Todo, CreateTodoError> {
        let title = TodoTitle::new(raw_title)?;

        let todo = self.repository.create_todo(&title, deadline).await?;
        tracing::debug!(id = %todo.id(), "todo created");

        Ok(todo)
    }
}
