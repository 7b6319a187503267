//! Pending Request Store - the outstanding-set of in-flight worker requests.
//!
//! Maps request ids to the one-shot completion handle of the waiting caller.
//!
//! Flow:
//! 1. Caller calls `register()`: an id is allocated and the entry inserted
//!    in one atomic step, before anything is sent
//! 2. Caller sends the request tagged with that id
//! 3. The response dispatcher calls `complete()` with the worker's response
//! 4. Caller awaits the receiver
//!
//! There is no expiry. An entry that never receives a response stays until
//! the caller abandons it or the inbound stream closes (`fail_all()`). Once
//! closed, the store refuses new registrations.

use crate::domain::correlation::{allocate, IdAllocator, RandomIdAllocator};
use crate::domain::error::{BeatDetectorError, BrokerResult};
use beat_protocol::{Method, RequestId, WorkerResponse};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

/// A request waiting for its response
struct PendingRequest {
    /// Channel settling the caller
    sender: oneshot::Sender<WorkerResponse>,
    /// When the request was registered
    created_at: Instant,
    /// Method name (for logging)
    method: Method,
}

/// Statistics for the pending request store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests settled with a response
    pub total_completed: AtomicU64,
    /// Total requests removed without a response
    pub total_cancelled: AtomicU64,
    /// Responses whose id matched nothing
    pub total_unmatched: AtomicU64,
    /// Requests dropped because the worker went away
    pub total_disconnected: AtomicU64,
}

/// Concurrent outstanding-set owned by one broker instance.
pub struct PendingRequestStore {
    /// Map of request id to pending request
    pending: DashMap<RequestId, PendingRequest>,
    /// Candidate id source
    allocator: Arc<dyn IdAllocator>,
    /// Statistics
    stats: Arc<PendingStats>,
    /// Set once the inbound stream has closed
    closed: AtomicBool,
}

impl PendingRequestStore {
    /// Create a store drawing random ids.
    pub fn new() -> Self {
        Self::with_allocator(Arc::new(RandomIdAllocator))
    }

    /// Create a store drawing ids from `allocator`.
    pub fn with_allocator(allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            pending: DashMap::new(),
            allocator,
            stats: Arc::new(PendingStats::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Allocate a free id and register a pending request under it.
    ///
    /// Returns the id and the receiver that will carry the response, or
    /// `Disconnected` if the inbound stream has already closed.
    pub fn register(
        &self,
        method: Method,
    ) -> BrokerResult<(RequestId, oneshot::Receiver<WorkerResponse>)> {
        loop {
            let id = allocate(self.allocator.as_ref(), |id| self.pending.contains_key(&id));

            // Another caller may have claimed the id between the check and here.
            let Entry::Vacant(slot) = self.pending.entry(id) else {
                continue;
            };

            let (tx, rx) = oneshot::channel();
            slot.insert(PendingRequest {
                sender: tx,
                created_at: Instant::now(),
                method,
            });

            // Checked after the insert: either `fail_all` sees this entry or
            // this sees the flag.
            if self.closed.load(Ordering::SeqCst) {
                self.pending.remove(&id);
                debug!(request_id = %id, method = %method, "Refused request on closed store");
                return Err(BeatDetectorError::Disconnected);
            }

            self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %id, method = %method, "Registered pending request");

            return Ok((id, rx));
        }
    }

    /// Settle the pending request matching `response.id`.
    ///
    /// Returns true if a waiting caller received the response, false if the
    /// id was unknown or the caller had already gone away.
    pub fn complete(&self, response: WorkerResponse) -> bool {
        let id = response.id;
        let Some((_, pending)) = self.pending.remove(&id) else {
            self.stats.total_unmatched.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(response) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %id,
                    method = %pending.method,
                    elapsed_ms = elapsed.as_millis(),
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    request_id = %id,
                    method = %pending.method,
                    "Pending request receiver dropped"
                );
                false
            }
        }
    }

    /// Remove the entry for `id` only if its caller has gone away.
    ///
    /// Used when a caller abandons its call: by then the id may already have
    /// been settled and handed to a new request, which must not be touched.
    pub fn cancel_abandoned(&self, id: RequestId) -> bool {
        if self
            .pending
            .remove_if(&id, |_, request| request.sender.is_closed())
            .is_some()
        {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(request_id = %id, "Removed abandoned pending request");
            true
        } else {
            false
        }
    }

    /// Close the store and drop every pending request; their callers observe
    /// a closed channel.
    ///
    /// Returns the number of requests dropped.
    pub fn fail_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);

        let mut dropped = 0;
        for id in self.ids() {
            if self.pending.remove(&id).is_some() {
                dropped += 1;
            }
        }
        self.stats
            .total_disconnected
            .fetch_add(dropped as u64, Ordering::Relaxed);
        dropped
    }

    /// True once the inbound stream has closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a request id is pending
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Snapshot of the outstanding ids.
    pub fn ids(&self) -> Vec<RequestId> {
        self.pending.iter().map(|entry| *entry.key()).collect()
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingRequestStore {
    fn default() -> Self {
        Self::new()
    }
}
