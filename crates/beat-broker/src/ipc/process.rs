//! Worker process adapter.
//!
//! Speaks the worker protocol as newline-delimited JSON over a byte stream:
//! one request object per line to the worker, one response object per line
//! back. The line codec is generic over any async stream so it can run over a
//! child's stdio, a socket, or an in-memory duplex pipe.

use crate::domain::config::WorkerConfig;
use crate::ipc::handler::{TransportError, WorkerReceiver, WorkerSender};
use async_trait::async_trait;
use beat_protocol::{WorkerRequest, WorkerResponse};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Writes one JSON request per line.
pub struct LineSender<W> {
    writer: Mutex<W>,
    /// Keeps the worker process alive for as long as requests can be sent.
    _child: Option<Child>,
}

impl<W> LineSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            _child: None,
        }
    }
}

#[async_trait]
impl<W> WorkerSender for LineSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, request: WorkerRequest) -> Result<(), TransportError> {
        let mut line =
            serde_json::to_vec(&request).map_err(|e| TransportError::Codec(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;

        debug!(
            request_id = %request.id,
            bytes = line.len(),
            "Wrote request line"
        );
        Ok(())
    }
}

/// Reads one JSON response per line.
///
/// Blank lines are skipped; lines that do not decode as a response are logged
/// and skipped. End of stream closes the channel; a read error is reported as
/// `ReceiveFailed`.
pub struct LineReceiver<R> {
    lines: Mutex<Lines<R>>,
}

impl<R> LineReceiver<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }
}

#[async_trait]
impl<R> WorkerReceiver for LineReceiver<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn receive(&self) -> Result<WorkerResponse, TransportError> {
        let mut lines = self.lines.lock().await;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(TransportError::ChannelClosed),
                Err(e) => return Err(TransportError::ReceiveFailed(e.to_string())),
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<WorkerResponse>(&line) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed worker message");
                }
            }
        }
    }
}

pub type ProcessSender = LineSender<ChildStdin>;
pub type ProcessReceiver = LineReceiver<BufReader<ChildStdout>>;

/// Launch the configured worker and wire its stdio to a sender/receiver pair.
///
/// The process is killed when the returned sender is dropped.
pub fn spawn_worker(config: &WorkerConfig) -> Result<(ProcessSender, ProcessReceiver), TransportError> {
    let program = config
        .program()
        .map_err(|e| TransportError::Spawn(e.to_string()))?;

    let mut child = Command::new(program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TransportError::Spawn(format!("{program}: {e}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| TransportError::Spawn("worker stdin unavailable".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TransportError::Spawn("worker stdout unavailable".into()))?;

    info!(program = program, pid = ?child.id(), "Worker process started");

    let sender = LineSender {
        writer: Mutex::new(stdin),
        _child: Some(child),
    };
    let receiver = LineReceiver::new(BufReader::new(stdout));

    Ok((sender, receiver))
}
