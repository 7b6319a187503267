//! Request id allocation.
//!
//! Ids are drawn uniformly from `[0, 2^53 - 1]` and redrawn on collision with
//! an outstanding request. With a handful of requests in flight against a
//! 2^53 space, a redraw is practically never needed. If the space were ever
//! exhausted allocation would spin forever; that case is not handled.

use beat_protocol::{RequestId, MAX_SAFE_INTEGER};
use rand::Rng;

/// Source of candidate request ids.
///
/// Implementations must not block. Candidates need not be unique; callers
/// redraw until a candidate is free.
pub trait IdAllocator: Send + Sync {
    /// Produce the next candidate id.
    fn next_candidate(&self) -> RequestId;
}

/// Uniform random ids over the JSON-safe integer range.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdAllocator;

impl IdAllocator for RandomIdAllocator {
    fn next_candidate(&self) -> RequestId {
        RequestId::clamped(rand::thread_rng().gen_range(0..=MAX_SAFE_INTEGER))
    }
}

/// Draw candidates until one is not in use.
///
/// `in_use` reports whether an id is currently outstanding. The check is only
/// advisory under concurrency; the pending store re-checks atomically when it
/// inserts.
pub fn allocate<A, F>(allocator: &A, mut in_use: F) -> RequestId
where
    A: IdAllocator + ?Sized,
    F: FnMut(RequestId) -> bool,
{
    loop {
        let candidate = allocator.next_candidate();
        if !in_use(candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed sequence of candidates, then repeats the last one.
    pub struct ScriptedIdAllocator {
        script: Mutex<Vec<u64>>,
    }

    impl ScriptedIdAllocator {
        pub fn new(mut script: Vec<u64>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
            }
        }
    }

    impl IdAllocator for ScriptedIdAllocator {
        fn next_candidate(&self) -> RequestId {
            let mut script = self.script.lock().unwrap();
            let raw = if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script[0]
            };
            RequestId::new(raw).unwrap()
        }
    }
}
