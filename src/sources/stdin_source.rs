//! Stdin control source.
//!
//! Reads newline-delimited JSON control requests from standard input (NDJSON
//! style).
//!
//! Behavior:
//! - Each non-empty line is trimmed and parsed as a `ControlRequest`.
//! - Malformed lines are logged with `warn!` and ignored; reading continues.
//! - End Of File (EOF) or a channel send error (receiver dropped) terminates
//!   the task gracefully.
//!
//! Rationale:
//! - This source is useful for simple shell pipelines, e.g.:
//!     echo '{"type":"run","action_id":"a1"}' | domfuzz --config config/default.json
//! - Backpressure is naturally respected via `sender.send(request).await`.

use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tracing::{error, info, trace, warn};

use super::{ControlRequest, ControlSource};

/// Source that reads newline-delimited control requests from stdin.
#[derive(Debug, Clone, Default)]
pub struct StdinSource;

impl StdinSource {
    /// Construct a new `StdinSource`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ControlSource for StdinSource {
    fn name(&self) -> &'static str {
        "stdin"
    }

    fn start(&self, sender: Sender<ControlRequest>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(target: "domfuzz::sources", "StdinSource task started (reading lines)");
            let stdin = io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        // EOF
                        info!(target: "domfuzz::sources", "EOF on stdin; StdinSource exiting");
                        break;
                    }
                    Ok(_) => {
                        let raw = line.trim();
                        if raw.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<ControlRequest>(raw) {
                            Ok(request) => {
                                trace!(
                                    target: "domfuzz::sources",
                                    ?request,
                                    "Parsed control request from stdin line"
                                );
                                if let Err(e) = sender.send(request).await {
                                    error!(
                                        target: "domfuzz::sources",
                                        error = %e,
                                        "Channel closed while sending stdin request; terminating task"
                                    );
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(
                                    target: "domfuzz::sources",
                                    error = %e,
                                    line = raw,
                                    "Failed to parse stdin control request"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "domfuzz::sources",
                            error = %e,
                            "Error reading from stdin; terminating task"
                        );
                        break;
                    }
                }
            }

            trace!(target: "domfuzz::sources", "StdinSource task ended");
        })
    }
}
