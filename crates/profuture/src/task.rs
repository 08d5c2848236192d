//! Task abstractions shared by the batch executors
//!
//! A task is a zero-argument closure that produces a future when invoked.
//! Executors accept any `IntoIterator` of such closures; [`TaskList`] is a
//! convenience for building a list of type-erased tasks.

use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;

/// A boxed future produced by a [`BoxTask`].
pub type TaskFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

/// A type-erased task, so closures with different future types can share a list.
pub type BoxTask<T, E> = Box<dyn FnOnce() -> TaskFuture<T, E> + Send + 'static>;

/// Box a task closure into a [`BoxTask`].
pub fn task<T, E, F, Fut>(f: F) -> BoxTask<T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Box::new(move || Box::pin(f()) as TaskFuture<T, E>)
}

/// An ordered, fixed list of type-erased tasks.
///
/// Order is significant: executors invoke tasks and report results in the
/// order they were pushed.
pub struct TaskList<T, E> {
    tasks: Vec<BoxTask<T, E>>,
}

impl<T, E> TaskList<T, E> {
    /// Create an empty task list
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Create an empty task list with room for `capacity` tasks
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: Vec::with_capacity(capacity),
        }
    }

    /// Append a task to the end of the list
    pub fn push<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.tasks.push(task(f));
    }

    /// Append a task, builder style
    pub fn with_task<F, Fut>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.push(f);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T, E> Default for TaskList<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Debug for TaskList<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskList")
            .field("len", &self.tasks.len())
            .finish()
    }
}

impl<T, E> FromIterator<BoxTask<T, E>> for TaskList<T, E> {
    fn from_iter<I: IntoIterator<Item = BoxTask<T, E>>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

impl<T, E> Extend<BoxTask<T, E>> for TaskList<T, E> {
    fn extend<I: IntoIterator<Item = BoxTask<T, E>>>(&mut self, iter: I) {
        self.tasks.extend(iter);
    }
}

impl<T, E> IntoIterator for TaskList<T, E> {
    type Item = BoxTask<T, E>;
    type IntoIter = std::vec::IntoIter<BoxTask<T, E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}
