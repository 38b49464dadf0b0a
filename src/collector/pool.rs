use std::future::Future;
use tokio::task::JoinSet;

use crate::error::ExporterError;

/// Drive `run` over `items` with at most `limit` calls in flight.
///
/// Fail-fast: the first error stops all further dispatch, already-spawned
/// tasks are awaited to settlement with their results discarded, and that
/// first error is returned. No partial output survives a failure.
pub async fn run_bounded<T, U, F, Fut>(
    items: Vec<T>,
    limit: usize,
    run: F,
) -> Result<Vec<U>, ExporterError>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<U, ExporterError>> + Send + 'static,
{
    let limit = limit.max(1);
    let mut pending = items.into_iter();
    let mut tasks = JoinSet::new();

    for item in pending.by_ref().take(limit) {
        tasks.spawn(run(item));
    }

    let mut results = Vec::new();
    let failure = loop {
        match tasks.join_next().await {
            None => break None,
            Some(Ok(Ok(value))) => {
                results.push(value);
                if let Some(item) = pending.next() {
                    tasks.spawn(run(item));
                }
            }
            Some(Ok(Err(err))) => break Some(err),
            Some(Err(join_err)) => break Some(ExporterError::Pool(join_err.to_string())),
        }
    };

    if let Some(err) = failure {
        // Let in-flight work settle; its output is discarded.
        while tasks.join_next().await.is_some() {}
        return Err(err);
    }
    Ok(results)
}
