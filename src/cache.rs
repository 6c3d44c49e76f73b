/// In-memory observable cache of the full habit list
///
/// Holds the most recently loaded list so presentation code gets
/// zero-latency reads, and publishes replacements through a watch
/// channel so observers can react to changes. The snapshot is swapped
/// wholesale; observers never see a partially-updated list. Only the
/// store writes here, and none of the cache's own operations can fail.

use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::Habit;

/// Shared snapshot type handed to observers
pub type HabitSnapshot = Arc<Vec<Habit>>;

pub struct HabitCache {
    tx: watch::Sender<HabitSnapshot>,
}

impl HabitCache {
    /// Empty cache; the store publishes the initial load on open
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    /// Current snapshot, synchronously
    pub fn current(&self) -> HabitSnapshot {
        self.tx.borrow().clone()
    }

    /// Replace the snapshot and notify observers
    pub fn publish(&self, habits: Vec<Habit>) {
        tracing::debug!("cache publishing {} habit(s)", habits.len());
        self.tx.send_replace(Arc::new(habits));
    }

    /// Receiver for change notifications
    ///
    /// `borrow()` on the receiver is synchronous; `changed().await` waits
    /// for the next publish on whatever context the observer runs.
    pub fn subscribe(&self) -> watch::Receiver<HabitSnapshot> {
        self.tx.subscribe()
    }
}

impl Default for HabitCache {
    fn default() -> Self {
        Self::new()
    }
}
