//! Line-delimited JSON transport over stdin/stdout.
//!
//! Each line on stdin is one `HostMessage`; each `FrameMessage` is written to
//! stdout as one line. EOF on stdin closes the host side.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::host::{FrameMessage, HostMessage, WireHost};

pub struct StdioTransport {
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl StdioTransport {
    /// Connect a `WireHost` to the process's stdin/stdout.
    pub fn connect(timeout: Duration) -> (WireHost, Self) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<FrameMessage>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<HostMessage>();

        let reader = tokio::spawn(read_stdin(inbound_tx));
        let writer = tokio::spawn(write_stdout(outbound_rx));
        let host = WireHost::connect(outbound_tx, inbound_rx, timeout);

        (host, Self { reader, writer })
    }

    /// Resolves once stdin is exhausted.
    pub async fn closed(&mut self) {
        if let Err(e) = (&mut self.reader).await {
            if !e.is_cancelled() {
                tracing::warn!("Stdin reader failed: {}", e);
            }
        }
    }

    pub fn stop(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_stdin(inbound: mpsc::UnboundedSender<HostMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read from stdin: {}", e);
                break;
            }
        };
        let Some(message) = parse_line(&line) else {
            continue;
        };
        if inbound.send(message).is_err() {
            break;
        }
    }
    tracing::info!("Host closed stdin");
}

async fn write_stdout(mut outbound: mpsc::UnboundedReceiver<FrameMessage>) {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound.recv().await {
        let mut line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode host request: {}", e);
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            tracing::warn!("Failed to write to stdout: {}", e);
            break;
        }
        let _ = stdout.flush().await;
    }
}

/// Decode one inbound line. Blank and malformed lines are skipped.
fn parse_line(line: &str) -> Option<HostMessage> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!("Ignoring malformed host message: {}", e);
            None
        }
    }
}
