/*!
Control request sources (orchestration layer).

This module only defines the request vocabulary, the core `ControlSource`
trait, and orchestration helpers (`build_sources_from_config`,
`spawn_all_sources`). Concrete implementations live in their own files:

- `file.rs`         -> `FileSource`  (poll a single JSON request file)
- `tcp.rs`          -> `TcpSource`   (newline-delimited JSON over TCP)
- `stdin_source.rs` -> `StdinSource` (newline-delimited JSON from stdin)

Each source implementation is responsible for:
- Parsing raw input into `ControlRequest`
- Pushing requests via `Sender<ControlRequest>` while respecting backpressure
  (`send().await`)
- Logging errors and continuing (never panicking inside tasks)
- Being cancellation-safe (task ends cleanly when channel closes / loop breaks)

Adding a new source:
1. Create `src/sources/your_source.rs`
2. Implement a `YourSource` struct + `impl ControlSource`
3. Expose with `pub use self::your_source::YourSource;`
4. Extend `build_sources_from_config` match on `SourceConfig`
*/

use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::info;

use crate::config::{Config, SourceConfig};

pub mod file;
pub mod stdin_source;
pub mod tcp;

pub use file::FileSource;
pub use stdin_source::StdinSource;
pub use tcp::TcpSource;

/// A request delivered into the execution context by a source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Start the named action.
    Run {
        /// Action id (or name) to run.
        action_id: String,
        /// Optional override for the action's concurrency limit.
        #[serde(default)]
        concurrency: Option<u32>,
        /// Log the owning combination whenever a side effect runs.
        #[serde(default)]
        log_combinations: bool,
    },

    /// Cancel the live run. The id is informational: cancellation applies to
    /// whatever run holds the handle, and is only meaningful while that
    /// action's run is live.
    Cancel { action_id: String },

    /// Report whether a run is in progress.
    Status,
}

/// Trait implemented by all control request sources.
///
/// A source is expected to spawn an asynchronous task that produces requests
/// and sends them into the provided channel. Tasks should never panic; log and
/// continue or exit gracefully on unrecoverable errors.
pub trait ControlSource: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Start the source in the background.
    fn start(&self, sender: Sender<ControlRequest>) -> JoinHandle<()>;
}

/// Construct all configured sources.
///
/// Order of sources in the returned vector is the same as in the config.
pub fn build_sources_from_config(cfg: &Config) -> Vec<Box<dyn ControlSource>> {
    let mut out: Vec<Box<dyn ControlSource>> = Vec::new();

    for sc in &cfg.sources {
        match sc {
            SourceConfig::File {
                path,
                poll_ms,
                delete_on_success,
            } => out.push(Box::new(FileSource::new(
                path.clone(),
                *poll_ms,
                *delete_on_success,
            ))),

            SourceConfig::Tcp { bind, ack } => {
                out.push(Box::new(TcpSource::new(bind.clone(), ack.unwrap_or(true))));
            }

            SourceConfig::Stdin => {
                out.push(Box::new(StdinSource::new()));
            }
        }
    }

    out
}

/// Spawn every source, returning their `JoinHandle`s.
///
/// The caller may store these if it wishes to monitor or await their
/// termination. Typically the application just keeps them detached and relies
/// on process lifetime / Ctrl+C for shutdown.
pub fn spawn_all_sources(
    sources: &[Box<dyn ControlSource>],
    sender: Sender<ControlRequest>,
) -> Vec<JoinHandle<()>> {
    sources
        .iter()
        .map(|src| {
            info!(
                target: "domfuzz::sources",
                source = %src.name(),
                "Starting source task"
            );
            src.start(sender.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_request_parses_with_defaults() {
        let req: ControlRequest =
            serde_json::from_str(r#"{"type":"run","action_id":"a1"}"#).unwrap();
        assert_eq!(
            req,
            ControlRequest::Run {
                action_id: "a1".into(),
                concurrency: None,
                log_combinations: false,
            }
        );
    }

    #[test]
    fn cancel_and_status_parse() {
        let req: ControlRequest =
            serde_json::from_str(r#"{"type":"cancel","action_id":"a1"}"#).unwrap();
        assert!(matches!(req, ControlRequest::Cancel { .. }));

        let req: ControlRequest = serde_json::from_str(r#"{"type":"status"}"#).unwrap();
        assert_eq!(req, ControlRequest::Status);
    }

    #[test]
    fn builds_sources_in_config_order() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "sources": [
                    { "type": "stdin" },
                    { "type": "tcp", "bind": "127.0.0.1:5000" },
                    { "type": "file", "path": "requests.json" }
                ]
            }"#,
        )
        .unwrap();

        let sources = build_sources_from_config(&cfg);
        let names: Vec<_> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["stdin", "tcp", "file"]);
    }
}
