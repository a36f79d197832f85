//! The selection critical section.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Mutual-exclusion region guarding query, aggregation and the decision to
/// reserve.
///
/// The backing store cannot scan, total and conditionally lock rows in one
/// atomic step, so every selection attempt in a process passes through the
/// same gate. Clones share the region. Build every engine in a process from
/// one gate.
///
/// Entry is an async acquire: a waiting task is suspended without parking
/// its worker thread, and dropping the `enter` future abandons the wait.
#[derive(Debug, Clone, Default)]
pub struct SelectionGate {
    inner: Arc<GateInner>,
}

#[derive(Debug, Default)]
struct GateInner {
    lock: Mutex<()>,
    entries: AtomicU64,
}

/// Proof of being inside the gate. The region is left on drop.
#[derive(Debug)]
pub struct GateGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl SelectionGate {
    /// Create a new, independent region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and enter the region.
    pub async fn enter(&self) -> GateGuard<'_> {
        let guard = self.inner.lock.lock().await;
        self.inner.entries.fetch_add(1, Ordering::Relaxed);
        GateGuard { _guard: guard }
    }

    /// Enter the region only if nobody is inside.
    pub fn try_enter(&self) -> Option<GateGuard<'_>> {
        let guard = self.inner.lock.try_lock().ok()?;
        self.inner.entries.fetch_add(1, Ordering::Relaxed);
        Some(GateGuard { _guard: guard })
    }

    /// Whether some task is currently inside the region.
    pub fn is_held(&self) -> bool {
        self.inner.lock.try_lock().is_err()
    }

    /// Total number of entries since creation.
    pub fn entries(&self) -> u64 {
        self.inner.entries.load(Ordering::Relaxed)
    }

    /// Whether `other` guards the same region.
    pub fn same_region(&self, other: &SelectionGate) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
