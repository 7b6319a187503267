//! Transport traits and the inbound response dispatcher.

use crate::domain::pending::PendingRequestStore;
use async_trait::async_trait;
use beat_protocol::{WorkerRequest, WorkerResponse};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outbound half of a worker channel.
///
/// `send` takes the request by value: the sample buffer it carries moves into
/// the transport and can never be read or reused by the sender.
#[async_trait]
pub trait WorkerSender: Send + Sync {
    /// Hand a request to the worker.
    async fn send(&self, request: WorkerRequest) -> Result<(), TransportError>;
}

/// Inbound half of a worker channel.
#[async_trait]
pub trait WorkerReceiver: Send + Sync {
    /// Receive the next response (waits until one is available).
    ///
    /// `TransportError::ChannelClosed` means no further responses will come.
    async fn receive(&self) -> Result<WorkerResponse, TransportError>;
}

/// Transport error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("channel closed")]
    ChannelClosed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("failed to launch worker: {0}")]
    Spawn(String),
    #[error("codec error: {0}")]
    Codec(String),
}

/// Consecutive receive failures after which the channel is treated as closed.
pub const MAX_CONSECUTIVE_RECEIVE_ERRORS: u32 = 8;

/// Single demultiplexer for inbound responses.
///
/// Routes each response to the pending request with the same id. Responses
/// for ids that are not outstanding are dropped. When the receiver closes, or
/// fails [`MAX_CONSECUTIVE_RECEIVE_ERRORS`] times in a row, every outstanding
/// request is failed and later calls are refused, so no caller waits forever
/// on a dead worker.
pub struct ResponseDispatcher {
    pending: Arc<PendingRequestStore>,
    receiver: Arc<dyn WorkerReceiver>,
}

impl ResponseDispatcher {
    pub fn new(pending: Arc<PendingRequestStore>, receiver: Arc<dyn WorkerReceiver>) -> Self {
        Self { pending, receiver }
    }

    /// Run the dispatch loop until the receiver closes.
    pub async fn run(self) {
        let mut failures = 0u32;
        loop {
            match self.receiver.receive().await {
                Ok(response) => {
                    failures = 0;
                    self.dispatch(response);
                }
                Err(TransportError::ChannelClosed) => {
                    let dropped = self.pending.fail_all();
                    warn!(
                        dropped = dropped,
                        "Worker channel closed, stopping dispatcher"
                    );
                    break;
                }
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_RECEIVE_ERRORS {
                        let dropped = self.pending.fail_all();
                        error!(
                            error = %e,
                            failures = failures,
                            dropped = dropped,
                            "Worker channel keeps failing, stopping dispatcher"
                        );
                        break;
                    }
                    warn!(error = %e, failures = failures, "Error receiving worker response");
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    fn dispatch(&self, response: WorkerResponse) {
        let id = response.id;
        if self.pending.complete(response) {
            debug!(request_id = %id, "Routed worker response");
        } else {
            debug!(request_id = %id, "No waiting caller for worker response");
        }
    }
}

/// In-memory worker channel, for tests and in-process workers.
pub mod channel {
    use super::*;
    use tokio::sync::{mpsc, Mutex};

    /// Broker-side sender backed by an mpsc channel.
    pub struct ChannelSender(pub mpsc::Sender<WorkerRequest>);

    /// Broker-side receiver backed by an mpsc channel.
    pub struct ChannelReceiver(pub Mutex<mpsc::Receiver<WorkerResponse>>);

    /// Worker side of an in-memory channel.
    pub struct WorkerEndpoint {
        /// Requests sent by the broker.
        pub requests: mpsc::Receiver<WorkerRequest>,
        /// Responses back to the broker.
        pub responses: mpsc::Sender<WorkerResponse>,
    }

    #[async_trait]
    impl WorkerSender for ChannelSender {
        async fn send(&self, request: WorkerRequest) -> Result<(), TransportError> {
            self.0
                .send(request)
                .await
                .map_err(|_| TransportError::ChannelClosed)
        }
    }

    #[async_trait]
    impl WorkerReceiver for ChannelReceiver {
        async fn receive(&self) -> Result<WorkerResponse, TransportError> {
            let mut guard = self.0.lock().await;
            guard.recv().await.ok_or(TransportError::ChannelClosed)
        }
    }

    /// Create a connected broker/worker channel pair.
    pub fn create_channel(capacity: usize) -> (ChannelSender, ChannelReceiver, WorkerEndpoint) {
        let (req_tx, req_rx) = mpsc::channel(capacity);
        let (resp_tx, resp_rx) = mpsc::channel(capacity);
        (
            ChannelSender(req_tx),
            ChannelReceiver(Mutex::new(resp_rx)),
            WorkerEndpoint {
                requests: req_rx,
                responses: resp_tx,
            },
        )
    }
}
