//! File control source.
//!
//! Polls a single file path for a JSON control request at a fixed interval.
//!
//! Behavior:
//! - If `delete_on_success = true`: every successful parse dispatches the
//!   request and the file is deleted (so the next request requires recreating
//!   the file).
//! - If `delete_on_success = false`: the file is dispatched only when its
//!   (length, mtime_seconds) signature changes to avoid duplicate requests.
//! - Empty / whitespace-only files are ignored.
//! - Invalid JSON content is logged (warn) and retried on the next poll
//!   without deletion.
//!
//! Cancellation / Exit:
//! - The task ends early if the receiver side of the channel is closed
//!   (sending fails).
//!
//! Robustness:
//! - All operational errors (I/O, JSON parse) are logged; the loop continues.
//! - Missing file is silent (to avoid log spam) until it appears.

use std::fs;
use std::time::{Duration, SystemTime};

use tokio::{
    fs as afs,
    sync::mpsc::Sender,
    task::JoinHandle,
    time::{Instant, sleep},
};
use tracing::{error, info, trace, warn};

use super::{ControlRequest, ControlSource};

/// Source that polls a single file for control requests.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: String,
    poll_ms: u64,
    delete_on_success: bool,
}

impl FileSource {
    /// Create a new `FileSource`.
    ///
    /// Arguments:
    /// - `path`: target file path (absolute or relative).
    /// - `poll_ms`: optional polling interval (defaults to 100ms; minimum 10ms).
    /// - `delete_on_success`: whether to delete the file after a successful dispatch.
    pub fn new(path: String, poll_ms: Option<u64>, delete_on_success: Option<bool>) -> Self {
        Self {
            path,
            poll_ms: poll_ms.unwrap_or(100).max(10),
            delete_on_success: delete_on_success.unwrap_or(false),
        }
    }

    /// Internal helper to compute a coarse signature (length, mtime seconds).
    fn file_signature(meta: &fs::Metadata) -> (u64, u64) {
        let len = meta.len();
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        (len, mtime)
    }
}

impl ControlSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn start(&self, sender: Sender<ControlRequest>) -> JoinHandle<()> {
        let path = self.path.clone();
        let poll_ms = self.poll_ms;
        let delete_on_success = self.delete_on_success;

        tokio::spawn(async move {
            info!(
                target: "domfuzz::sources",
                %path, poll_ms, delete_on_success,
                "FileSource task started"
            );

            let mut last_sig: Option<(u64, u64)> = None;
            let interval = Duration::from_millis(poll_ms);
            let mut next_tick = Instant::now();

            loop {
                // Poll timing (manual loop instead of interval for drift control)
                let now = Instant::now();
                if now < next_tick {
                    sleep(next_tick - now).await;
                }
                next_tick += interval;

                // Metadata check
                let meta = match fs::metadata(&path) {
                    Ok(m) if m.is_file() => m,
                    Ok(_) => {
                        warn!(
                            target: "domfuzz::sources",
                            %path,
                            "Path exists but is not a regular file"
                        );
                        continue;
                    }
                    Err(_) => {
                        // Missing: stay quiet (common before a producer writes the file)
                        continue;
                    }
                };

                // Signature-based dedup (only for non-delete mode)
                let sig = Self::file_signature(&meta);
                if !delete_on_success && last_sig == Some(sig) {
                    trace!(
                        target: "domfuzz::sources",
                        %path,
                        "File unchanged; skipping"
                    );
                    continue;
                }

                // Read file (async)
                match afs::read_to_string(&path).await {
                    Ok(content) => {
                        let trimmed = content.trim();
                        if trimmed.is_empty() {
                            trace!(
                                target: "domfuzz::sources",
                                %path,
                                "File is empty/whitespace; ignoring"
                            );
                            continue;
                        }
                        match serde_json::from_str::<ControlRequest>(trimmed) {
                            Ok(request) => {
                                if let Err(e) = sender.send(request).await {
                                    error!(
                                        target: "domfuzz::sources",
                                        %path, error=%e,
                                        "Channel closed; FileSource terminating"
                                    );
                                    break;
                                }

                                info!(
                                    target: "domfuzz::sources",
                                    %path, delete_on_success,
                                    "Dispatched control request from file"
                                );

                                if delete_on_success {
                                    if let Err(e) = afs::remove_file(&path).await {
                                        warn!(
                                            target: "domfuzz::sources",
                                            %path, error=%e,
                                            "Failed to delete file after dispatch"
                                        );
                                    }
                                } else {
                                    last_sig = Some(sig);
                                }
                            }
                            Err(e) => {
                                warn!(
                                    target: "domfuzz::sources",
                                    %path, error=%e,
                                    "Failed to parse control request; will retry"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "domfuzz::sources",
                            %path, error=%e,
                            "Failed to read file"
                        );
                    }
                }
            }

            info!(
                target: "domfuzz::sources",
                %path,
                "FileSource task ended"
            );
        })
    }
}
