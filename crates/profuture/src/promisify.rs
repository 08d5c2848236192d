//! Adapting callback-style functions into future-returning functions

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::ExecutionError;

/// The completion callback handed to a callback-style function.
///
/// A callback settles its [`Promisified`] future at most once: every
/// settling method consumes it. Dropping it unused rejects the future with
/// [`ExecutionError::CallbackDropped`].
#[derive(Debug)]
pub struct Callback<T, E> {
    sender: oneshot::Sender<Result<T, E>>,
}

impl<T, E> Callback<T, E>
where
    E: From<ExecutionError>,
{
    /// Settle with the `(err, data)` convention: an error rejects, otherwise the data fulfills.
    pub fn call(self, err: Option<E>, data: Option<T>) {
        let result = match (err, data) {
            (Some(err), _) => Err(err),
            (None, Some(data)) => Ok(data),
            (None, None) => Err(ExecutionError::MissingValue.into()),
        };
        self.settle(result);
    }

    pub fn resolve(self, data: T) {
        self.settle(Ok(data));
    }

    pub fn reject(self, err: E) {
        self.settle(Err(err));
    }

    pub fn settle(self, result: Result<T, E>) {
        // The receiver is gone when the caller stopped waiting.
        let _ = self.sender.send(result);
    }
}

/// Future returned by a promisified function
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Promisified<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> Future for Promisified<T, E>
where
    E: From<ExecutionError>,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver.poll_unpin(cx).map(|received| match received {
            Ok(result) => result,
            Err(_) => Err(ExecutionError::CallbackDropped.into()),
        })
    }
}

/// Convert a callback-style function into one that returns a future.
///
/// `f` receives the caller's arguments (use a tuple for several) followed by
/// a [`Callback`]. The adapted function calls `f` immediately, so its work
/// starts when the adapted function is called, not when the future is
/// awaited. A panic inside `f` unwinds out of the adapted call itself.
///
/// ```rust
/// use profuture::{promisify, Callback};
///
/// fn add_later((a, b): (i32, i32), callback: Callback<i32, String>) {
///     std::thread::spawn(move || callback.call(None, Some(a + b)));
/// }
///
/// # tokio_test_block_on(async {
/// let add = promisify(add_later);
/// assert_eq!(add((1, 2)).await, Ok(3));
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub fn promisify<A, T, E, F>(f: F) -> impl Fn(A) -> Promisified<T, E>
where
    F: Fn(A, Callback<T, E>),
    E: From<ExecutionError>,
{
    move |args| {
        let (sender, receiver) = oneshot::channel();
        f(args, Callback { sender });
        Promisified { receiver }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn delayed_greeting(delay_ms: u64, callback: Callback<String, String>) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            callback.call(None, Some("Success".to_string()));
        });
    }

    fn divide((a, b): (i32, i32), callback: Callback<i32, String>) {
        if b == 0 {
            callback.call(Some("division by zero".to_string()), None);
        } else {
            callback.call(None, Some(a / b));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_promisify_delayed_callback() {
        let greet = promisify(delayed_greeting);
        assert_eq!(greet(100).await, Ok("Success".to_string()));
    }

    #[tokio::test]
    async fn test_promisify_error_and_value() {
        let divide = promisify(divide);
        assert_eq!(divide((10, 2)).await, Ok(5));
        assert_eq!(divide((1, 0)).await, Err("division by zero".to_string()));
    }

    #[tokio::test]
    async fn test_error_wins_over_data() {
        let both = promisify(|(), callback: Callback<i32, String>| {
            callback.call(Some("boom".to_string()), Some(1));
        });
        assert_eq!(both(()).await, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_missing_value_rejects() {
        let empty = promisify(|(), callback: Callback<i32, String>| callback.call(None, None));
        assert_eq!(
            empty(()).await,
            Err(ExecutionError::MissingValue.to_string())
        );
    }

    #[tokio::test]
    async fn test_dropped_callback_rejects() {
        let forgetful = promisify(|(), callback: Callback<i32, ExecutionError>| drop(callback));
        assert_eq!(forgetful(()).await, Err(ExecutionError::CallbackDropped));
    }

    #[tokio::test]
    async fn test_function_runs_at_call_time() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let counted = promisify(move |value: i32, callback: Callback<i32, String>| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            callback.resolve(value);
        });

        let future = counted(7);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(future.await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_invocations() {
        let greet = promisify(delayed_greeting);
        let slow = greet(200);
        let fast = greet(50);

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow, Ok("Success".to_string()));
        assert_eq!(fast, Ok("Success".to_string()));
    }

    #[test]
    #[should_panic(expected = "synchronous failure")]
    fn test_synchronous_panic_propagates() {
        let failing = promisify(|(), _callback: Callback<i32, String>| {
            panic!("synchronous failure");
        });
        let _ = failing(());
    }
}
