//! Sequential execution of a task list

use std::future::Future;
use std::time::Instant;

use tracing::{debug, trace};

use crate::reporter::{BatchStats, ExecutionReporter, NoOpReporter, TaskExecutionEvent};

/// Runs tasks one at a time, in list order.
///
/// Each task is invoked only after the previous one settled, so at most one
/// task is ever in flight. The first error stops the chain: the remaining
/// tasks are never invoked and the error is returned unchanged. Values
/// collected before the failure are dropped.
#[derive(Debug, Default)]
pub struct Chain<R = NoOpReporter> {
    reporter: R,
}

impl Chain {
    pub fn new() -> Self {
        Self {
            reporter: NoOpReporter,
        }
    }
}

impl<R: ExecutionReporter> Chain<R> {
    /// Replace the reporter that receives execution events
    pub fn with_reporter<R2: ExecutionReporter>(self, reporter: R2) -> Chain<R2> {
        Chain { reporter }
    }

    /// Run the tasks and collect their values in list order
    pub async fn run<I, F, Fut, T, E>(mut self, tasks: I) -> Result<Vec<T>, E>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let tasks: Vec<F> = tasks.into_iter().collect();
        let total_tasks = tasks.len();
        let start_time = Instant::now();
        let mut stats = BatchStats {
            total_tasks,
            ..BatchStats::default()
        };

        self.reporter
            .report_event(TaskExecutionEvent::BatchStarted { total_tasks });
        debug!(total_tasks, "starting chain");

        let mut results = Vec::with_capacity(total_tasks);
        for (index, task) in tasks.into_iter().enumerate() {
            let task_start = Instant::now();
            stats.started_tasks += 1;
            stats.peak_in_flight = 1;
            self.reporter
                .report_event(TaskExecutionEvent::TaskStarted { index });
            trace!(index, "task invoked");

            match task().await {
                Ok(value) => {
                    let duration = task_start.elapsed();
                    stats.completed_tasks += 1;
                    self.reporter
                        .report_event(TaskExecutionEvent::TaskCompleted { index, duration });
                    results.push(value);
                }
                Err(err) => {
                    let duration = task_start.elapsed();
                    stats.duration = start_time.elapsed();
                    debug!(
                        index,
                        skipped = total_tasks - index - 1,
                        "chain stopped at failed task"
                    );
                    self.reporter
                        .report_event(TaskExecutionEvent::TaskFailed { index, duration });
                    self.reporter
                        .report_event(TaskExecutionEvent::BatchFailed { index, stats });
                    self.reporter.finish();
                    return Err(err);
                }
            }
        }

        stats.duration = start_time.elapsed();
        debug!(total_tasks, duration = ?stats.duration, "chain completed");
        self.reporter
            .report_event(TaskExecutionEvent::BatchCompleted { stats });
        self.reporter.finish();
        Ok(results)
    }
}

/// Run `tasks` sequentially and collect their values in list order.
///
/// See [`Chain`] for the failure semantics.
pub async fn chain<I, F, Fut, T, E>(tasks: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Chain::new().run(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::tests::RecordingReporter;
    use crate::task::{task, TaskList};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collects_results_in_order() {
        let tasks = TaskList::<i32, String>::new()
            .with_task(|| async { Ok(1) })
            .with_task(|| async { Ok(2) })
            .with_task(|| async { Ok(3) });

        assert_eq!(chain(tasks).await, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_stops_at_first_error() {
        let third_invoked = Arc::new(AtomicBool::new(false));
        let flag = third_invoked.clone();

        let tasks = vec![
            task(|| async { Ok(1) }),
            task(|| async { Err("Error occurred".to_string()) }),
            task(move || {
                flag.store(true, Ordering::SeqCst);
                async { Ok(3) }
            }),
        ];

        assert_eq!(chain(tasks).await, Err("Error occurred".to_string()));
        assert!(!third_invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_list() {
        let tasks = TaskList::<i32, String>::new();
        assert_eq!(chain(tasks).await, Ok(vec![]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_task_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: TaskList<u64, String> = (0..5u64)
            .map(|i| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                task(move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50 - i * 10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        assert_eq!(chain(tasks).await, Ok(vec![0, 1, 2, 3, 4]));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_time_is_sum_of_tasks() {
        let tasks: TaskList<(), String> = (0..3)
            .map(|_| {
                task(|| async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(())
                })
            })
            .collect();

        let start = tokio::time::Instant::now();
        chain(tasks).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_tasks_need_not_be_send() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let tasks = (1..=3).map(|i| {
            let log = log.clone();
            move || async move {
                log.borrow_mut().push(i);
                Ok::<_, String>(i * 10)
            }
        });

        assert_eq!(chain(tasks).await, Ok(vec![10, 20, 30]));
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_reports_events() {
        let reporter = RecordingReporter::default();
        let tasks = TaskList::<i32, String>::new()
            .with_task(|| async { Ok(1) })
            .with_task(|| async { Err("boom".to_string()) })
            .with_task(|| async { Ok(3) });

        let result = Chain::new()
            .with_reporter(reporter.clone())
            .run(tasks)
            .await;
        assert_eq!(result, Err("boom".to_string()));

        let events = reporter.events();
        assert_eq!(
            events.first(),
            Some(&TaskExecutionEvent::BatchStarted { total_tasks: 3 })
        );
        let started: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                TaskExecutionEvent::TaskStarted { index } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![0, 1]);

        match events.last() {
            Some(TaskExecutionEvent::BatchFailed { index, stats }) => {
                assert_eq!(*index, 1);
                assert_eq!(stats.started_tasks, 2);
                assert_eq!(stats.completed_tasks, 1);
                assert_eq!(stats.peak_in_flight, 1);
            }
            other => panic!("Expected BatchFailed, got {:?}", other),
        }
        assert!(reporter.is_finished());
    }
}
