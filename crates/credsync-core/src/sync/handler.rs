//! Job handler trait and its object-safe wrapper.
//!
//! Follows the blanket-impl pattern used for other RPITIT ports:
//! 1. `JobHandler` is the ergonomic trait implementors write against
//! 2. `JobHandlerDyn` is the object-safe mirror with a boxed future
//! 3. a blanket impl makes every `JobHandler` a `JobHandlerDyn`

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// A cancellable unit of periodic work.
///
/// Handlers should watch `cancel` and return promptly once it fires. Errors
/// are recorded on the job's status and never propagated further.
pub trait JobHandler: Send + Sync {
    fn run(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Object-safe version of [`JobHandler`] with a boxed future.
pub trait JobHandlerDyn: Send + Sync {
    fn run_boxed(&self, cancel: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>>;
}

impl<T: JobHandler> JobHandlerDyn for T {
    fn run_boxed(&self, cancel: CancellationToken) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(self.run(cancel))
    }
}

/// Shared, type-erased handler as stored in the scheduler registry.
pub type DynJobHandler = Arc<dyn JobHandlerDyn>;

/// Adapter that turns an async closure into a [`JobHandler`].
pub struct FnHandler<F>(F);

impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    fn run(
        &self,
        cancel: CancellationToken,
    ) -> impl Future<Output = anyhow::Result<()>> + Send {
        (self.0)(cancel)
    }
}

/// Build a handler from a closure returning a future.
///
/// ```ignore
/// let handler = handler_fn(|_cancel| async { Ok(()) });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    FnHandler(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    impl JobHandler for Counting {
        async fn run(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_blanket_impl_dispatches_dynamically() {
        let handler = Arc::new(Counting(AtomicUsize::new(0)));
        let dynamic: DynJobHandler = handler.clone();
        dynamic.run_boxed(CancellationToken::new()).await.unwrap();
        dynamic.run_boxed(CancellationToken::new()).await.unwrap();
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_fn_propagates_error() {
        let handler = handler_fn(|_cancel| async { Err::<(), _>(anyhow::anyhow!("upstream 503")) });
        let err = handler.run(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "upstream 503");
    }
}
