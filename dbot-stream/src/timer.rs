//! Single-slot flush timer: a session holds at most one pending flush task at any time.

use tokio::task::JoinHandle;

#[derive(Debug)]
struct PendingFlush {
    id: u64,
    handle: JoinHandle<()>,
}

/// Holds the one pending flush task of a session.
///
/// Every arming is tagged with a fresh id. The firing task must [`claim`](Self::claim) its id before
/// flushing; after a [`disarm`](Self::disarm) the claim fails, so a cancelled timer never flushes even
/// if its abort has not been observed yet.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<PendingFlush>,
    next_id: u64,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Arms the slot with the task returned by `spawn`, which receives the arming id.
    /// No-op returning `false` when a flush is already pending.
    pub fn arm<F>(&mut self, spawn: F) -> bool
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        if self.pending.is_some() {
            return false;
        }
        self.next_id += 1;
        let id = self.next_id;
        self.pending = Some(PendingFlush {
            id,
            handle: spawn(id),
        });
        true
    }

    /// Called by the firing task. Clears the slot and returns `true` only if it still holds `id`.
    pub fn claim(&mut self, id: u64) -> bool {
        match &self.pending {
            Some(p) if p.id == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancels the pending flush, if any. Returns whether one was pending.
    pub fn disarm(&mut self) -> bool {
        match self.pending.take() {
            Some(p) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.disarm();
    }
}
