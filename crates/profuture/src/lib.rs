//! Profuture - Async task combinators
//!
//! A small set of combinators for working with fallible futures on the tokio
//! runtime.
//!
//! # Overview
//!
//! - [`promisify`] turns a callback-style function into one returning a future
//! - [`TimeoutExt::timeout`] races a future against a deadline without cancelling it
//! - [`chain`] runs tasks one after another and stops at the first error
//! - [`concurrency`] runs tasks with a bounded number in flight, failing fast
//!
//! A task is any zero-argument closure that returns a future of
//! `Result<T, E>`. Task errors are passed back to the caller unchanged;
//! errors produced by the combinators themselves are [`ExecutionError`]s,
//! converted into the caller's error type through `From`.
//!
//! # Example
//!
//! ```rust
//! use profuture::{chain, concurrency, task, BoxTask, ConcurrencyLimit, TimeoutExt};
//! use std::time::Duration;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), String> {
//!     let tasks: Vec<BoxTask<i32, String>> = vec![
//!         task(|| async { Ok(1) }),
//!         task(|| async { Ok(2) }),
//!         task(|| async { Ok(3) }),
//!     ];
//!     assert_eq!(chain(tasks).await?, vec![1, 2, 3]);
//!
//!     let tasks = (1..=4).map(|i| task(move || async move { Ok::<_, String>(i * 10) }));
//!     let limit = ConcurrencyLimit::new(2).map_err(|e| e.to_string())?;
//!     assert_eq!(concurrency(tasks, limit).await?, vec![10, 20, 30, 40]);
//!
//!     let slow = async {
//!         tokio::time::sleep(Duration::from_secs(60)).await;
//!         Ok::<_, String>(())
//!     };
//!     let err = slow.timeout(Duration::from_millis(10)).await.unwrap_err();
//!     assert_eq!(err, "Promise timed out");
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod promisify;
pub mod reporter;
pub mod task;
pub mod timeout;

pub use chain::{chain, Chain};
pub use concurrency::{concurrency, Concurrency};
pub use config::ConcurrencyLimit;
pub use error::{ConfigError, ConfigResult, ExecutionError};
pub use promisify::{promisify, Callback, Promisified};
pub use reporter::{
    BatchStats, ExecutionReporter, MultiReporter, NoOpReporter, TaskExecutionEvent,
    TracingReporter,
};
pub use task::{task, BoxTask, TaskFuture, TaskList};
pub use timeout::{Timeout, TimeoutExt};
