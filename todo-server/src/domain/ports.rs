/*
   Module `ports` specifies the API by which external modules interact with the todo domain.

   All traits are bounded by `Send + Sync + 'static`, since their implementations must be shareable
   between request-handling tasks.

   Trait methods are explicitly asynchronous, including `Send` bounds on response types,
   since the application is expected to always run in a multithreaded environment.

   Every method takes the [Deadline] of the request it serves. Implementations must give up once
   it passes and report [RepositoryError::Timeout].
*/

use std::future::Future;

use crate::domain::models::*;

/// `TodoService` is the public API for the todo domain.
///
/// External modules must conform to this contract – the domain is not concerned with the
/// implementation details or underlying technology of any external code.
pub trait TodoService: Clone + Send + Sync + 'static {
    /// Asynchronously list every [Todo], newest first.
    ///
    /// # Errors
    ///
    /// - [ListTodosError::Repository] if the todos could not be read.
    fn list_todos(
        &self,
        deadline: Deadline,
    ) -> impl Future<Output = Result<Vec<Todo>, ListTodosError>> + Send;

    /// Asynchronously create a new [Todo] from an unvalidated title.
    ///
    /// # Errors
    ///
    /// - [CreateTodoError::TitleRequired] if `raw_title` is blank once trimmed.
    /// - [CreateTodoError::Repository] if the todo could not be stored.
    fn create_todo(
        &self,
        raw_title: &str,
        deadline: Deadline,
    ) -> impl Future<Output = Result<Todo, CreateTodoError>> + Send;
}

/// `TodoRepository` represents a store of todos.
///
/// External modules must conform to this contract – the domain is not concerned with the
/// implementation details or underlying technology of any external code.
pub trait TodoRepository: Send + Sync + Clone + 'static {
    /// Asynchronously fetch all todos ordered by creation time, newest first. An empty store
    /// yields an empty `Vec`.
    fn list_todos(
        &self,
        deadline: Deadline,
    ) -> impl Future<Output = Result<Vec<Todo>, RepositoryError>> + Send;

    /// Asynchronously insert a todo and return it as stored, with its assigned id and timestamp.
    fn create_todo(
        &self,
        title: &TodoTitle,
        deadline: Deadline,
    ) -> impl Future<Output = Result<Todo, RepositoryError>> + Send;
}

/// `HealthCheck` reports whether the backing datastore is reachable.
pub trait HealthCheck: Send + Sync + Clone + 'static {
    fn ping(&self, deadline: Deadline) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
