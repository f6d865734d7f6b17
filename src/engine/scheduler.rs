//! Batch scheduler.
//!
//! Runs the flattened task sequence in consecutive batches of `limit` tasks.
//! Every task of a batch is spawned concurrently; the next batch starts only
//! after the previous one fully settled. The cancellation signal is observed
//! at batch boundaries only: an in-flight batch is never interrupted, and a
//! cancelled run surfaces `Aborted` before the next batch starts.
//!
//! Failure is fail-fast at batch granularity: the first task error stops the
//! run after its batch settles. Other tasks of that batch are allowed to
//! finish but their individual outcomes are not separately reported.

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::compiler::CompiledTask;
use super::error::EngineError;

/// Execute `tasks` in batches of `limit` (floored to 1).
pub async fn run_with_limit(
    tasks: Vec<CompiledTask>,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<(), EngineError> {
    let limit = limit.max(1);
    let total = tasks.len();
    debug!(target: "domfuzz::engine", total, limit, "scheduling tasks");

    let mut remaining = tasks.into_iter();
    let mut batch_index = 0usize;

    loop {
        let batch: Vec<CompiledTask> = remaining.by_ref().take(limit).collect();
        if batch.is_empty() {
            break;
        }

        if cancel.is_cancelled() {
            debug!(
                target: "domfuzz::engine",
                batch_index,
                "cancellation observed at batch boundary"
            );
            return Err(EngineError::Aborted);
        }

        trace!(
            target: "domfuzz::engine",
            batch_index,
            size = batch.len(),
            "starting batch"
        );

        let mut handles = Vec::with_capacity(batch.len());
        for task in batch {
            handles.push(tokio::spawn(task.run()));
        }

        // Settle the whole batch; keep only the first failure.
        let mut first_failure: Option<EngineError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
                Err(join_error) => {
                    if first_failure.is_none() {
                        first_failure = Some(EngineError::Task(
                            anyhow::Error::new(join_error).context("task panicked"),
                        ));
                    }
                }
            }
        }

        if let Some(e) = first_failure {
            return Err(e);
        }

        batch_index += 1;
    }

    Ok(())
}
