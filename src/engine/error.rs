use thiserror::Error;

/// Engine error taxonomy.
///
/// Compile-time fatal (`UnknownWordlist`, `UnresolvableElement`,
/// `UnknownEventType`, `DraftStep`, `InvalidNumber`, `BadMarker`) abort a run
/// before any task executes. `Task` wraps a side effect failing at run time.
/// `Aborted` is the cooperative cancellation outcome, distinguished from
/// failure. `AlreadyRunning`/`NotRunning` are control errors returned
/// synchronously and never change engine state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A `{name}` placeholder referenced a word-list the store doesn't have.
    #[error("invalid wordlist name: {0}")]
    UnknownWordlist(String),

    /// An element reference did not resolve to a live node.
    #[error("element '{0}' does not resolve to a live node")]
    UnresolvableElement(String),

    /// An event type matched no event constructor family.
    #[error("'{0}' couldn't be mapped to an event family")]
    UnknownEventType(String),

    /// A draft (`none`) step reached the engine. Drafts exist only in the
    /// authoring flow; this is a bug in the caller.
    #[error("draft step reached the engine")]
    DraftStep,

    /// A substituted value declared as a number has no integer prefix.
    #[error("'{0}' does not start with a number")]
    InvalidNumber(String),

    /// A rewritten template carried a marker that is not a valid slot index.
    /// Markers are produced by the resolver; this is a bug in the caller.
    #[error("bad slot marker '{0}'")]
    BadMarker(String),

    /// The cancellation signal was observed at a checkpoint.
    #[error("operation aborted")]
    Aborted,

    /// A run is already in progress; the new request was rejected.
    #[error("some action is already running")]
    AlreadyRunning,

    /// No run is in progress; there is nothing to cancel.
    #[error("no action is running")]
    NotRunning,

    /// A compiled task's side effect failed at run time.
    #[error(transparent)]
    Task(#[from] anyhow::Error),
}
