//! Last-issued-wins ordering for state-mutating requests.
//!
//! Each mutating call takes a tag when it starts. When its response arrives it
//! may commit only if no later-issued call has committed first, so a slow
//! login can never overwrite a logout the user issued after it.

#[cfg(test)]
#[path = "sequence_test.rs"]
mod sequence_test;

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing tags, starting at 1.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: AtomicU64,
}

impl RequestSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[must_use]
    pub fn last_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

/// Highest tag that has completed, successfully or not. Lives under the same lock as the state it
/// guards so the check and the write are one step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitGate {
    committed: u64,
}

impl CommitGate {
    /// Admit `tag` if nothing newer has committed, recording it as committed.
    pub fn admit(&mut self, tag: u64) -> bool {
        if tag < self.committed {
            return false;
        }
        self.committed = tag;
        true
    }

    /// Record that `tag` finished without changing state, so older calls
    /// still in flight can no longer commit.
    pub fn complete(&mut self, tag: u64) {
        self.committed = self.committed.max(tag);
    }

    /// Whether a commit by `tag` would be rejected right now.
    #[must_use]
    pub fn is_stale(&self, tag: u64) -> bool {
        tag < self.committed
    }

    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed
    }
}
