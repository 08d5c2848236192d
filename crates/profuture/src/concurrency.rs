//! Bounded-concurrency execution of a task list

use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinError;
use tracing::{debug, trace};

use crate::config::ConcurrencyLimit;
use crate::error::ExecutionError;
use crate::reporter::{BatchStats, ExecutionReporter, NoOpReporter, TaskExecutionEvent};

/// A spawned task tagged with its position in the list.
type Settled<T, E> = (usize, Duration, Result<Result<T, E>, JoinError>);

/// Per-run bookkeeping, owned by the run's own task
struct RunState<T> {
    slots: Vec<Option<T>>,
    in_flight: usize,
    stats: BatchStats,
}

impl<T> RunState<T> {
    fn new(total_tasks: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(total_tasks).collect(),
            in_flight: 0,
            stats: BatchStats {
                total_tasks,
                ..BatchStats::default()
            },
        }
    }

    fn mark_started(&mut self) {
        self.in_flight += 1;
        self.stats.started_tasks += 1;
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight);
    }

    fn into_results(self) -> Vec<T> {
        self.slots.into_iter().flatten().collect()
    }
}

/// Runs tasks with at most `limit` of them in flight at once.
///
/// Tasks are invoked in list order. Each invoked task is spawned onto the
/// tokio runtime, so it makes progress on its own and is never cancelled by
/// this runner. Values are returned in list order, regardless of the order in
/// which tasks settle.
///
/// The first error wins: no further task is invoked, the error is returned
/// unchanged as soon as it is observed, and tasks still in flight keep running
/// with their results discarded.
#[derive(Debug)]
pub struct Concurrency<R = NoOpReporter> {
    limit: ConcurrencyLimit,
    reporter: R,
}

impl Concurrency {
    pub fn new(limit: ConcurrencyLimit) -> Self {
        Self {
            limit,
            reporter: NoOpReporter,
        }
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::new(ConcurrencyLimit::default())
    }
}

impl<R: ExecutionReporter> Concurrency<R> {
    /// Replace the reporter that receives execution events
    pub fn with_reporter<R2: ExecutionReporter>(self, reporter: R2) -> Concurrency<R2> {
        Concurrency {
            limit: self.limit,
            reporter,
        }
    }

    /// Get the concurrency limit
    pub fn limit(&self) -> ConcurrencyLimit {
        self.limit
    }

    /// Run the tasks and collect their values in list order
    pub async fn run<I, F, Fut, T, E>(mut self, tasks: I) -> Result<Vec<T>, E>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<ExecutionError> + Send + 'static,
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        let total_tasks = tasks.len();
        let start_time = Instant::now();
        let mut state = RunState::new(total_tasks);

        self.reporter
            .report_event(TaskExecutionEvent::BatchStarted { total_tasks });
        debug!(total_tasks, limit = self.limit.get(), "starting bounded run");

        let outcome = self.drive(tasks, &mut state).await;
        state.stats.duration = start_time.elapsed();

        let result = match outcome {
            Ok(()) => {
                debug!(
                    total_tasks,
                    peak_in_flight = state.stats.peak_in_flight,
                    duration = ?state.stats.duration,
                    "bounded run completed"
                );
                self.reporter.report_event(TaskExecutionEvent::BatchCompleted {
                    stats: state.stats.clone(),
                });
                Ok(state.into_results())
            }
            Err((index, err)) => {
                debug!(
                    index,
                    abandoned = state.in_flight,
                    skipped = total_tasks - state.stats.started_tasks,
                    "bounded run failed fast"
                );
                self.reporter.report_event(TaskExecutionEvent::BatchFailed {
                    index,
                    stats: state.stats.clone(),
                });
                Err(err)
            }
        };

        self.reporter.finish();
        result
    }

    /// Invoke every task, keeping the active set at or below the limit.
    ///
    /// Returns the index and error of the first failed task. Dropping the
    /// active set on return only detaches the tasks still in flight.
    async fn drive<F, Fut, T, E>(
        &mut self,
        tasks: Vec<F>,
        state: &mut RunState<T>,
    ) -> Result<(), (usize, E)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<ExecutionError> + Send + 'static,
    {
        let limit = self.limit.get();
        let mut active: FuturesUnordered<BoxFuture<'static, Settled<T, E>>> =
            FuturesUnordered::new();

        for (index, task) in tasks.into_iter().enumerate() {
            // Abort check: let tasks already in flight run up to their next
            // suspension point, then pick up whatever settled so a failure
            // stops the next invocation.
            if !active.is_empty() {
                tokio::task::yield_now().await;
            }
            while let Some(Some(settled)) = active.next().now_or_never() {
                self.settle(settled, state)?;
            }

            let started_at = Instant::now();
            let handle = tokio::spawn(task());
            active.push(
                handle
                    .map(move |joined| (index, started_at.elapsed(), joined))
                    .boxed(),
            );
            state.mark_started();
            self.reporter
                .report_event(TaskExecutionEvent::TaskStarted { index });
            trace!(index, in_flight = state.in_flight, limit, "task invoked");

            if state.in_flight >= limit {
                if let Some(settled) = active.next().await {
                    self.settle(settled, state)?;
                }
            }
        }

        while let Some(settled) = active.next().await {
            self.settle(settled, state)?;
        }

        Ok(())
    }

    /// Record one settled task, removing it from the active set
    fn settle<T, E>(
        &mut self,
        (index, duration, joined): Settled<T, E>,
        state: &mut RunState<T>,
    ) -> Result<(), (usize, E)>
    where
        E: From<ExecutionError>,
    {
        state.in_flight -= 1;

        let outcome = joined.unwrap_or_else(|err| {
            Err(ExecutionError::from_join_error(err, index).into())
        });

        match outcome {
            Ok(value) => {
                state.slots[index] = Some(value);
                state.stats.completed_tasks += 1;
                self.reporter
                    .report_event(TaskExecutionEvent::TaskCompleted { index, duration });
                trace!(index, ?duration, in_flight = state.in_flight, "task completed");
                Ok(())
            }
            Err(err) => {
                self.reporter
                    .report_event(TaskExecutionEvent::TaskFailed { index, duration });
                trace!(index, ?duration, "task failed");
                Err((index, err))
            }
        }
    }
}

/// Run `tasks` with at most `limit` in flight and collect their values in list order.
///
/// See [`Concurrency`] for the ordering and failure semantics.
pub async fn concurrency<I, F, Fut, T, E>(tasks: I, limit: ConcurrencyLimit) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<ExecutionError> + Send + 'static,
{
    Concurrency::new(limit).run(tasks).await
}
