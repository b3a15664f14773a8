/// Bounded fan-out of asynchronous tasks
use std::future::Future;

use futures::stream::{self, StreamExt};
use thiserror::Error;

/// Ceiling on in-flight classification requests for every batch
pub const MAX_CONCURRENT_CLASSIFICATIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("concurrency limit must be at least 1")]
    ZeroLimit,
}

/// Run `tasks` with at most `limit` in flight.
///
/// Tasks are admitted in submission order as slots free up. Outputs come back
/// in submission order regardless of completion order. A task reports failure
/// through its own output (usually a `Result`), so one failing task never
/// cancels or blocks the others.
pub async fn run_bounded<I, F, Fut, T>(tasks: I, limit: usize) -> Result<Vec<T>, ExecutorError>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    if limit == 0 {
        return Err(ExecutorError::ZeroLimit);
    }

    // `map` is lazy: a task is only started once `buffer_unordered` has a free
    // slot, and a slot frees as soon as any in-flight task finishes
    let mut outputs: Vec<(usize, T)> = stream::iter(tasks.into_iter().enumerate())
        .map(|(index, task)| async move { (index, task().await) })
        .buffer_unordered(limit)
        .collect()
        .await;

    outputs.sort_unstable_by_key(|(index, _)| *index);
    let outputs = outputs.into_iter().map(|(_, output)| output).collect();

    Ok(outputs)
}
