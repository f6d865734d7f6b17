#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Domfuzz, a data-driven fuzzing engine for live documents.
//!
//! Given a recorded sequence of steps (wait, mutate a property, dispatch a
//! synthetic event), the engine expands `{wordlist}` placeholders against
//! word-lists, produces every combination of substituted values, and executes
//! the resulting task set under a bounded concurrency limit with cooperative
//! cancellation. Most implementation details live under the internal modules:
//! - `config`: Configuration models, loader, and schema helpers.
//! - `engine`: Placeholder resolution, combination expansion, task compilation,
//!   the batch scheduler, and the run controller.
//! - `dom`: Document-side collaborators (event families, simulated backend).
//! - `sources`: Control-request sources (stdin, tcp, file).
//! - `utils`: Utilities such as template token scanning.
//!
//! Use `domfuzz::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (models, loader, schema helpers).
pub mod config;
/// Public module: document collaborators (event families, simulated backend).
pub mod dom;
/// Public module: execution engine (resolver, combinations, compiler, scheduler, controller).
pub mod engine;
/// Public module: control-request sources (stdin, tcp, file).
pub mod sources;
/// Public module: utilities (template token scanning, etc.).
pub mod utils;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Initialize tracing (logging) with a reasonable default.
/// - Honors the `RUST_LOG` environment variable if set.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    use tracing::Level;
    use tracing_subscriber::fmt;

    // Parse RUST_LOG as a simple level (trace|debug|info|warn|error)
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| match s.to_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        })
        .unwrap_or(Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use domfuzz::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;
    pub use tokio::time::sleep;

    // Frequently used internal modules and types
    pub use crate as domfuzz;
    pub use crate::engine::{EngineError, RunConfig, RunController, RunNotice, RunOutcome};
    pub use crate::{config, dom, engine, sources, utils};
}
