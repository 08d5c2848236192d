//! Progress reporting for batch execution
//!
//! Executors emit a [`TaskExecutionEvent`] whenever a batch starts, a task
//! is invoked or settles, and the batch finishes. Events are delivered from
//! the executor's own task, in the order they happen.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Summary of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of tasks in the list
    pub total_tasks: usize,

    /// Number of tasks that were invoked
    pub started_tasks: usize,

    /// Number of tasks that settled with a value and were observed by the executor
    pub completed_tasks: usize,

    /// Highest number of tasks in flight at the same time
    pub peak_in_flight: usize,

    /// Wall time of the whole run
    pub duration: Duration,
}

/// Event types that can be reported during batch execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExecutionEvent {
    /// A batch started
    BatchStarted { total_tasks: usize },
    /// The task at `index` was invoked
    TaskStarted { index: usize },
    /// The task at `index` settled with a value
    TaskCompleted { index: usize, duration: Duration },
    /// The task at `index` settled with an error
    TaskFailed { index: usize, duration: Duration },
    /// Every task settled with a value
    BatchCompleted { stats: BatchStats },
    /// The batch stopped at the first failure, raised by the task at `index`
    BatchFailed { index: usize, stats: BatchStats },
}

/// Trait for reporting batch execution progress
pub trait ExecutionReporter: Send {
    /// Report a batch execution event
    fn report_event(&mut self, event: TaskExecutionEvent);

    /// Called once the batch has settled
    fn finish(&mut self) {}
}

impl<R: ExecutionReporter + ?Sized> ExecutionReporter for Box<R> {
    fn report_event(&mut self, event: TaskExecutionEvent) {
        (**self).report_event(event);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// A no-op reporter that discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReporter;

impl ExecutionReporter for NoOpReporter {
    fn report_event(&mut self, _event: TaskExecutionEvent) {}
}

/// A reporter that forwards events to `tracing`
#[derive(Debug, Default, Clone)]
pub struct TracingReporter {
    context: Option<String>,
}

impl TracingReporter {
    pub fn new() -> Self {
        Self { context: None }
    }

    /// Attach a label that is recorded with every event
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
        }
    }
}

impl ExecutionReporter for TracingReporter {
    fn report_event(&mut self, event: TaskExecutionEvent) {
        let context = self.context.as_deref().unwrap_or_default();

        match event {
            TaskExecutionEvent::BatchStarted { total_tasks } => {
                tracing::info!(context, total_tasks, "batch started");
            }
            TaskExecutionEvent::TaskStarted { index } => {
                tracing::debug!(context, index, "task started");
            }
            TaskExecutionEvent::TaskCompleted { index, duration } => {
                tracing::debug!(context, index, ?duration, "task completed");
            }
            TaskExecutionEvent::TaskFailed { index, duration } => {
                tracing::debug!(context, index, ?duration, "task failed");
            }
            TaskExecutionEvent::BatchCompleted { stats } => {
                tracing::info!(
                    context,
                    total_tasks = stats.total_tasks,
                    peak_in_flight = stats.peak_in_flight,
                    duration = ?stats.duration,
                    "batch completed"
                );
            }
            TaskExecutionEvent::BatchFailed { index, stats } => {
                tracing::info!(
                    context,
                    index,
                    started_tasks = stats.started_tasks,
                    completed_tasks = stats.completed_tasks,
                    "batch failed"
                );
            }
        }
    }
}

/// A multi-reporter that broadcasts events to multiple reporters
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn ExecutionReporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn add_reporter<R: ExecutionReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }

    pub fn with_reporter<R: ExecutionReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Box::new(reporter));
    }
}

impl ExecutionReporter for MultiReporter {
    fn report_event(&mut self, event: TaskExecutionEvent) {
        for reporter in &mut self.reporters {
            reporter.report_event(event.clone());
        }
    }

    fn finish(&mut self) {
        for reporter in &mut self.reporters {
            reporter.finish();
        }
    }
}
