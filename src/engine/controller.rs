//! Run controller.
//!
//! Owns the one `RunHandle` that may exist at a time: its presence is the
//! sole indicator a run is in progress, and it is created and destroyed only
//! here. `start` drives the whole pipeline (resolve placeholders, expand
//! combinations, compile, schedule) and emits exactly one completion notice
//! on every exit path. `cancel` raises the cooperative cancellation signal;
//! it never stops an in-flight batch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::models::Action;

use super::combinations::expand_combinations;
use super::compiler::{CompiledTask, RunObserver, compile_action};
use super::placeholder::resolve_placeholders;
use super::scheduler::run_with_limit;
use super::{
    Combination, CompletionSink, EngineError, EventFactory, NodeResolver, RunNotice, RunOutcome,
    WordlistStore,
};

/// Per-run options supplied alongside the action snapshot.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Overrides the action's `repeat_concurrency` when set.
    pub concurrency_override: Option<u32>,
    /// Log the owning combination whenever a side effect starts.
    pub log_combinations: bool,
}

/// The token proving a run is in progress. At most one exists.
struct RunHandle {
    action_id: String,
    cancel: CancellationToken,
}

/// Single-run-at-a-time orchestrator over the collaborator interfaces.
pub struct RunController {
    wordlists: Arc<dyn WordlistStore>,
    resolver: Arc<dyn NodeResolver>,
    events: Arc<dyn EventFactory>,
    sink: Arc<dyn CompletionSink>,
    active: Mutex<Option<RunHandle>>,
    last_combination: Arc<Mutex<Option<Arc<Combination>>>>,
}

impl RunController {
    pub fn new(
        wordlists: Arc<dyn WordlistStore>,
        resolver: Arc<dyn NodeResolver>,
        events: Arc<dyn EventFactory>,
        sink: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            wordlists,
            resolver,
            events,
            sink,
            active: Mutex::new(None),
            last_combination: Arc::new(Mutex::new(None)),
        }
    }

    /// True iff a `RunHandle` exists.
    pub fn is_running(&self) -> bool {
        self.lock_active().is_some()
    }

    /// The combination whose side effect most recently started, across runs.
    pub fn last_combination(&self) -> Option<Combination> {
        self.last_combination
            .lock()
            .ok()?
            .as_ref()
            .map(|c| c.as_ref().clone())
    }

    /// Raise the cancellation signal for the live run.
    ///
    /// Cancellation is advisory: the scheduler observes it at the next batch
    /// boundary. Fails with `NotRunning` when no run is in progress.
    pub fn cancel(&self) -> Result<(), EngineError> {
        match self.lock_active().as_ref() {
            Some(handle) => {
                info!(
                    target: "domfuzz::engine",
                    action_id = %handle.action_id,
                    last_combination = ?self.last_combination(),
                    "cancelling run"
                );
                handle.cancel.cancel();
                Ok(())
            }
            None => Err(EngineError::NotRunning),
        }
    }

    /// Execute `action` to a terminal state.
    ///
    /// Fails synchronously with `AlreadyRunning` if a `RunHandle` exists;
    /// that rejection changes no state and emits no notice. Otherwise the
    /// returned outcome is also delivered to the completion sink, exactly
    /// once, whatever the exit path.
    pub async fn start(
        &self,
        action: Action,
        config: RunConfig,
    ) -> Result<RunOutcome, EngineError> {
        let cancel = {
            let mut active = self.lock_active();
            if active.is_some() {
                return Err(EngineError::AlreadyRunning);
            }
            let token = CancellationToken::new();
            *active = Some(RunHandle {
                action_id: action.id.clone(),
                cancel: token.clone(),
            });
            token
        };

        let started = Instant::now();
        info!(
            target: "domfuzz::engine",
            action = %action.name,
            steps = action.steps.len(),
            "starting run"
        );

        let result = self.execute(&action, &config, &cancel).await;

        let outcome = match result {
            Ok(()) => RunOutcome::Completed,
            Err(EngineError::Aborted) => RunOutcome::Aborted,
            Err(e) => RunOutcome::Failed(format!("{e:#}")),
        };

        *self.lock_active() = None;

        info!(
            target: "domfuzz::engine",
            action = %action.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome = %outcome,
            "run finished"
        );
        self.sink.notify(RunNotice {
            action_id: action.id,
            outcome: outcome.clone(),
        });

        Ok(outcome)
    }

    async fn execute(
        &self,
        action: &Action,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let resolved = resolve_placeholders(&action.steps, self.wordlists.as_ref())?;
        check_abort(cancel)?;

        let combinations = expand_combinations(&resolved.slots, self.wordlists.as_ref())?;
        check_abort(cancel)?;

        debug!(
            target: "domfuzz::engine",
            slots = resolved.slot_count(),
            combinations = combinations.len(),
            "compiling tasks"
        );

        let observer = Arc::new(RunObserver::new(
            self.last_combination.clone(),
            config.log_combinations,
        ));

        let mut per_pass: Vec<CompiledTask> = Vec::new();
        for combination in combinations {
            let combination = Arc::new(combination);
            per_pass.extend(compile_action(
                &resolved.steps,
                &combination,
                self.resolver.as_ref(),
                self.events.as_ref(),
                &observer,
            )?);
        }
        check_abort(cancel)?;

        let repetitions = action.repeat.max(1) as usize;
        let mut tasks = Vec::with_capacity(per_pass.len() * repetitions);
        for _ in 0..repetitions {
            tasks.extend(per_pass.iter().cloned());
        }

        let limit = config
            .concurrency_override
            .unwrap_or(action.repeat_concurrency)
            .max(1) as usize;

        run_with_limit(tasks, limit, cancel).await
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_abort(cancel: &CancellationToken) -> Result<(), EngineError> {
    if cancel.is_cancelled() {
        return Err(EngineError::Aborted);
    }
    Ok(())
}
