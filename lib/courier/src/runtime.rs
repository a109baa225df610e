//! The runtime calls execute on.

use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::{Error, ProxyConfig, Result};

static SHARED: OnceLock<Runtime> = OnceLock::new();
static SHARED_INIT: Mutex<()> = Mutex::new(());

/// A dedicated runtime, shut down without waiting when the last user drops.
#[derive(Debug)]
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

/// Spawns calls onto a runtime and blocks on them for synchronous callers.
#[derive(Debug, Clone)]
pub(crate) struct Executor {
    handle: Handle,
    _owned: Option<Arc<OwnedRuntime>>,
}

impl Executor {
    /// The process-wide runtime, built on first use.
    pub(crate) fn shared() -> Result<Self> {
        if let Some(runtime) = SHARED.get() {
            return Ok(Self::from_handle(runtime.handle().clone()));
        }

        // `build` is fallible, so it runs under the guard instead of inside `get_or_init`.
        let _guard = SHARED_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        let runtime = match SHARED.get() {
            Some(runtime) => runtime,
            None => {
                let built = build(&ProxyConfig::default())?;
                tracing::debug!("started shared courier runtime");
                SHARED.get_or_init(|| built)
            }
        };
        Ok(Self::from_handle(runtime.handle().clone()))
    }

    /// A runtime owned by this executor and its clones.
    pub(crate) fn owned(config: &ProxyConfig) -> Result<Self> {
        let runtime = build(config)?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Run on a runtime the caller owns.
    pub(crate) const fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _owned: None,
        }
    }

    pub(crate) fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Returns `false` on a runtime thread, where blocking would stall the
    /// very workers a call needs.
    pub(crate) fn can_block() -> bool {
        Handle::try_current().is_err()
    }

    /// Block the current thread until `future` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] when the current thread cannot block.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        if !Self::can_block() {
            return Err(blocking_refused());
        }
        Ok(self.handle.block_on(future))
    }
}

pub(crate) fn blocking_refused() -> Error {
    Error::runtime("cannot block inside an async runtime; use call_async instead")
}

fn build(config: &ProxyConfig) -> Result<Runtime> {
    let mut builder = Builder::new_multi_thread();
    builder.enable_all().thread_name(config.thread_name.clone());
    if let Some(threads) = config.worker_threads {
        builder.worker_threads(threads);
    }
    builder
        .build()
        .map_err(|e| Error::runtime(format!("failed to start runtime: {e}")))
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn shared_runtime_is_reused() {
        let first = Executor::shared().expect("runtime");
        let second = Executor::shared().expect("runtime");

        let task = first.spawn(async { "from shared" });
        let_assert!(Ok(Ok(value)) = second.block_on(task));
        check!(value == "from shared");
    }

    #[test]
    fn owned_runtime_runs_tasks() {
        let config = ProxyConfig::builder().worker_threads(1).build();
        let executor = Executor::owned(&config).expect("runtime");
        let task = executor.spawn(async { 40 + 2 });
        let_assert!(Ok(Ok(value)) = executor.block_on(task));
        check!(value == 42);
    }

    #[test]
    fn plain_threads_can_block() {
        check!(Executor::can_block());
    }

    #[tokio::test]
    async fn block_on_refuses_runtime_threads() {
        let executor = Executor::from_handle(Handle::current());
        check!(!Executor::can_block());
        let_assert!(Err(Error::Runtime(msg)) = executor.block_on(async {}));
        check!(msg.contains("call_async"));
    }
}
