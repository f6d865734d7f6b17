//! TCP control source.
//!
//! Listens on a bind address for newline-delimited JSON control requests.
//! Every connection is served by its own task; a connection may send any
//! number of requests.
//!
//! Behavior:
//! - Each non-empty line is parsed as a `ControlRequest`.
//! - With `ack` enabled the source answers `OK` after a dispatched request
//!   and `ERROR: ...` after a malformed one.
//! - Malformed lines are logged and the connection keeps going.
//! - A failed bind ends the task; the rest of the application is unaffected.

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tracing::{error, info, trace, warn};

use super::{ControlRequest, ControlSource};

/// Source that accepts newline-delimited control requests over TCP.
#[derive(Debug, Clone)]
pub struct TcpSource {
    bind: String,
    ack: bool,
}

impl TcpSource {
    /// Create a new `TcpSource` bound to `bind` (e.g., "127.0.0.1:5000").
    pub fn new(bind: String, ack: bool) -> Self {
        Self { bind, ack }
    }
}

impl ControlSource for TcpSource {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn start(&self, sender: Sender<ControlRequest>) -> JoinHandle<()> {
        let bind = self.bind.clone();
        let ack = self.ack;

        tokio::spawn(async move {
            let listener = match TcpListener::bind(&bind).await {
                Ok(l) => l,
                Err(e) => {
                    error!(
                        target: "domfuzz::sources",
                        %bind, error = %e,
                        "Failed to bind TCP source; task ending"
                    );
                    return;
                }
            };
            info!(target: "domfuzz::sources", %bind, ack, "TcpSource listening");

            loop {
                if sender.is_closed() {
                    info!(
                        target: "domfuzz::sources",
                        %bind,
                        "Channel closed; TcpSource terminating"
                    );
                    break;
                }

                match listener.accept().await {
                    Ok((stream, peer)) => {
                        trace!(target: "domfuzz::sources", %peer, "Accepted connection");
                        tokio::spawn(serve_connection(stream, sender.clone(), ack));
                    }
                    Err(e) => {
                        warn!(
                            target: "domfuzz::sources",
                            %bind, error = %e,
                            "Accept failed; continuing"
                        );
                    }
                }
            }
        })
    }
}

async fn serve_connection(stream: TcpStream, sender: Sender<ControlRequest>, ack: bool) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
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
                            "Parsed control request from TCP line"
                        );
                        if sender.send(request).await.is_err() {
                            // Receiver gone; nothing left to serve.
                            break;
                        }
                        if ack {
                            let _ = write_half.write_all(b"OK\n").await;
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "domfuzz::sources",
                            error = %e,
                            line = raw,
                            "Failed to parse TCP control request"
                        );
                        if ack {
                            let _ = write_half
                                .write_all(format!("ERROR: {e}\n").as_bytes())
                                .await;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(
                    target: "domfuzz::sources",
                    error = %e,
                    "Error reading from TCP connection; closing"
                );
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc;

    #[test]
    fn test_name_and_new() {
        let s = TcpSource::new("127.0.0.1:5000".into(), true);
        assert_eq!(s.name(), "tcp");
    }

    #[tokio::test]
    async fn serves_requests_and_acks_over_a_socket() {
        // Bind directly so the test learns the ephemeral port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel::<ControlRequest>(4);

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            serve_connection(stream, tx, true).await;
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"{\"type\":\"run\",\"action_id\":\"a1\"}\nnot json\n")
            .await
            .unwrap();

        let request = rx.recv().await.unwrap();
        assert_eq!(
            request,
            ControlRequest::Run {
                action_id: "a1".into(),
                concurrency: None,
                log_combinations: false,
            }
        );

        // First line is acked, the malformed one answers with an error.
        let mut buf = vec![0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        let response = String::from_utf8_lossy(&buf[..n]).to_string();
        assert!(response.starts_with("OK"));
    }
}
