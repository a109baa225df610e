//! Asynchronous call handles.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::runtime::Executor;
use crate::{Error, Outcome, Result};

/// Handle to an in-flight call.
///
/// Await it, or [`wait`](Self::wait) for it from synchronous code. The call
/// runs whether or not the handle is polled.
///
/// [`cancel`](Self::cancel) is best-effort: a call cancelled before the
/// transport completes resolves to [`Error::Cancelled`], while one whose
/// response has already arrived resolves normally.
#[derive(Debug)]
#[must_use = "dropping a Call does not cancel it; await it or call `cancel`"]
pub struct Call<T> {
    task: JoinHandle<Result<Outcome<T>>>,
    executor: Executor,
}

impl<T: Send + 'static> Call<T> {
    pub(crate) fn spawn<F>(executor: &Executor, future: F) -> Self
    where
        F: Future<Output = Result<Outcome<T>>> + Send + 'static,
    {
        Self {
            task: executor.spawn(future),
            executor: executor.clone(),
        }
    }

    pub(crate) fn failed(executor: &Executor, error: Error) -> Self {
        Self::spawn(executor, async move { Err(error) })
    }

    /// Ask the call to stop; the transport is dropped at its next suspension.
    pub fn cancel(&self) {
        tracing::debug!("call cancelled by caller");
        self.task.abort();
    }

    /// Returns `true` once the call has resolved, either way.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Block the current thread until the call resolves.
    ///
    /// # Errors
    ///
    /// Returns the call's error, or [`Error::Runtime`] when invoked from
    /// inside an async runtime.
    pub fn wait(self) -> Result<Outcome<T>> {
        let executor = self.executor.clone();
        executor.block_on(self)?
    }
}

impl<T> Future for Call<T> {
    type Output = Result<Outcome<T>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.task).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) if join_error.is_cancelled() => {
                Poll::Ready(Err(Error::Cancelled))
            }
            Poll::Ready(Err(join_error)) => std::panic::resume_unwind(join_error.into_panic()),
        }
    }
}
