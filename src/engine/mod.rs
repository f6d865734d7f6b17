/*!
Execution engine for Domfuzz.

This module wires together:
- `placeholder`: slot assignment and `{name}` -> `{N}` template rewriting
- `combinations`: cartesian expansion of slot word-lists
- `compiler`: per-(step, combination) task compilation
- `scheduler`: bounded-concurrency batch execution with cooperative cancellation
- `controller`: the single-run-at-a-time orchestrator

The engine talks to the outside world only through the collaborator traits
defined here: a `WordlistStore` supplies placeholder entries, a `NodeResolver`
turns abstract element references into live `NodeHandle`s, an `EventFactory`
builds dispatchable `EventObject`s, and a `CompletionSink` receives exactly one
terminal notice per run.

Typical usage:
- Construct a `RunController` with the collaborator implementations.
- Call `RunController::start` with an action snapshot and a `RunConfig`.
- Call `RunController::cancel` to request cooperative cancellation.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

pub mod combinations;
pub mod compiler;
pub mod controller;
pub mod error;
pub mod placeholder;
pub mod scheduler;

pub use combinations::expand_combinations;
pub use compiler::{CompiledTask, RunObserver, compile_action};
pub use controller::{RunConfig, RunController};
pub use error::EngineError;
pub use placeholder::{EngineStep, PlaceholderSlot, ResolvedAction, resolve_placeholders};
pub use scheduler::run_with_limit;

/// One positional assignment of values to all slots for one full pass over an
/// action's steps.
pub type Combination = Vec<String>;

/// A typed value produced by parsing a substituted template according to the
/// property's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Num(i64),
    Bool(bool),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(s) => f.write_str(s),
            PropValue::Num(n) => write!(f, "{n}"),
            PropValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Maps a word-list name to its ordered entries (duplicates and empty lines
/// preserved).
pub trait WordlistStore: Send + Sync {
    /// Entries of the named word-list, or `UnknownWordlist` if absent.
    fn entries(&self, name: &str) -> Result<Vec<String>, EngineError>;
}

/// A live document node the engine can mutate.
///
/// Side effects take arbitrary collaborator errors; the controller classifies
/// them as run-time fatal.
pub trait NodeHandle: Send + Sync {
    /// Write a parsed value onto the node's named property.
    fn set_property(&self, name: &str, value: PropValue) -> anyhow::Result<()>;

    /// Dispatch a constructed event on the node.
    fn dispatch(&self, event: &dyn EventObject) -> anyhow::Result<()>;
}

/// Resolves an abstract element reference to a live node.
pub trait NodeResolver: Send + Sync {
    /// Resolve `element_ref`, or `UnresolvableElement` if it does not
    /// correspond to a live node.
    fn resolve(&self, element_ref: &str) -> Result<Arc<dyn NodeHandle>, EngineError>;
}

/// An event constructed by an `EventFactory`, ready to dispatch.
pub trait EventObject: Send + Sync + fmt::Debug {
    /// The event type the object was constructed for (e.g., "click").
    fn event_type(&self) -> &str;
}

/// Constructs a native event object from an event type and a property map.
pub trait EventFactory: Send + Sync {
    /// Build an event, or `UnknownEventType` if no constructor family matches.
    fn create(
        &self,
        event_type: &str,
        props: BTreeMap<String, PropValue>,
    ) -> Result<Arc<dyn EventObject>, EngineError>;
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every batch settled successfully.
    Completed,
    /// The cancellation signal stopped the run at a checkpoint.
    Aborted,
    /// A compile-time or run-time error aborted the run.
    Failed(String),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::Aborted => f.write_str("aborted"),
            RunOutcome::Failed(detail) => write!(f, "failed: {detail}"),
        }
    }
}

/// The single terminal message emitted per run.
#[derive(Debug, Clone)]
pub struct RunNotice {
    /// Id of the action that ran.
    pub action_id: String,
    /// How the run ended.
    pub outcome: RunOutcome,
}

/// Receives exactly one `RunNotice` per run, on every exit path.
pub trait CompletionSink: Send + Sync {
    fn notify(&self, notice: RunNotice);
}

/// Forward notices into a channel consumed by the calling layer.
impl CompletionSink for tokio::sync::mpsc::UnboundedSender<RunNotice> {
    fn notify(&self, notice: RunNotice) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(notice);
    }
}

/// Sink that just logs the notice; the default for detached runs.
pub struct LogSink;

impl CompletionSink for LogSink {
    fn notify(&self, notice: RunNotice) {
        info!(
            target: "domfuzz::engine",
            action_id = %notice.action_id,
            outcome = %notice.outcome,
            "run finished"
        );
    }
}
