//! Bounded concurrent gather.
//!
//! Every operation waits for a permit from a shared semaphore before it is
//! polled, so at most `concurrency` run at once. All operations are driven on
//! the caller's task; nothing is spawned. Results keep submission order.
//!
//! [`gather`] drains the whole batch before reporting: every operation settles,
//! then the first error in submission order is returned.

use futures::future::join_all;
use std::future::Future;
use tokio::sync::Semaphore;

/// Run `operations` with at most `concurrency` in flight and collect their
/// outputs in order. `concurrency` of 0 is treated as 1 and values above
/// [`Semaphore::MAX_PERMITS`] are capped there.
pub async fn gather<I, F, T, E>(operations: I, concurrency: usize) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    gather_settled(operations, concurrency)
        .await
        .into_iter()
        .collect()
}

/// Like [`gather`] but returns each operation's outcome.
pub async fn gather_settled<I, F, T, E>(operations: I, concurrency: usize) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let limit = Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS));
    let limit = &limit;

    let guarded = operations.into_iter().map(|op| async move {
        // The semaphore is never closed, so acquisition only fails if it were.
        let _permit = limit.acquire().await.ok();
        op.await
    });

    join_all(guarded).await
}
