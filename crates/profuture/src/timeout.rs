//! Racing a future against a deadline

use std::fmt::{self, Debug};
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Sleep;

use crate::error::ExecutionError;

/// Extension trait adding [`timeout`](TimeoutExt::timeout) to fallible futures
pub trait TimeoutExt<T, E>: Future<Output = Result<T, E>> + Sized {
    /// Race this future against a timer of `duration`.
    ///
    /// The returned future settles with this future's own result if it
    /// settles first, and with [`ExecutionError::Timeout`] otherwise. This
    /// future is polled before the timer on every wake-up, so a future that
    /// is ready when the deadline passes still wins.
    ///
    /// Losing the race does not cancel this future: when the timer wins, or
    /// when the returned [`Timeout`] is dropped early, it is spawned onto the
    /// runtime and runs to completion with its result discarded. That is why
    /// the future must be `Send + 'static`, unlike the tasks of
    /// [`chain`](crate::chain), which never outlive their run.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    fn timeout(self, duration: Duration) -> Timeout<Self>
    where
        Self: Send + 'static,
        T: Send + 'static,
        E: Send + 'static;

    /// Same as [`timeout`](TimeoutExt::timeout), in milliseconds
    fn timeout_ms(self, ms: u64) -> Timeout<Self>
    where
        Self: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.timeout(Duration::from_millis(ms))
    }
}

impl<F, T, E> TimeoutExt<T, E> for F
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<ExecutionError> + Send + 'static,
{
    fn timeout(self, duration: Duration) -> Timeout<Self> {
        Timeout {
            future: Some(Box::pin(self)),
            sleep: Box::pin(tokio::time::sleep(duration)),
            duration,
        }
    }
}

/// Future returned by [`TimeoutExt::timeout`]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Timeout<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    /// The raced future, until it settles or is handed to the runtime
    future: Option<Pin<Box<F>>>,
    sleep: Pin<Box<Sleep>>,
    duration: Duration,
}

impl<F> Timeout<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    /// The deadline this future was created with
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Let an unsettled raced future finish on its own
    fn detach(&mut self) {
        if let Some(future) = self.future.take() {
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(future);
            }
        }
    }
}

impl<F> Debug for Timeout<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("duration", &self.duration)
            .field("pending", &self.future.is_some())
            .finish()
    }
}

impl<F, T, E> Future for Timeout<F>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<ExecutionError> + Send + 'static,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        // The raced future is checked first, so it wins a tie with the timer.
        if let Some(future) = this.future.as_mut() {
            if let Poll::Ready(result) = future.as_mut().poll(cx) {
                this.future = None;
                return Poll::Ready(result);
            }
        }

        ready!(this.sleep.as_mut().poll(cx));
        tracing::trace!(duration = ?this.duration, "future timed out");
        this.detach();
        Poll::Ready(Err(ExecutionError::timeout(this.duration).into()))
    }
}

impl<F> Drop for Timeout<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn drop(&mut self) {
        self.detach();
    }
}
