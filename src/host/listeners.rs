//! Host-side listener bookkeeping shared by the host implementations.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{HostEvent, HostEventKind, HostListener, ListenerId};

/// Listeners keyed by event kind, in registration order.
pub struct ListenerRegistry {
    entries: RwLock<Vec<(ListenerId, HostEventKind, HostListener)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add(&self, kind: HostEventKind, listener: HostListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, kind, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn count_for(&self, kind: HostEventKind) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|(_, entry_kind, _)| *entry_kind == kind)
            .count()
    }

    /// Deliver an event to every listener of its kind.
    ///
    /// Returns the number of listeners invoked. The lock is released before
    /// any listener runs, so listeners may register or release listeners.
    pub fn dispatch(&self, event: &HostEvent) -> usize {
        let kind = event.kind();
        let targets: Vec<HostListener> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry_kind, _)| *entry_kind == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        if targets.is_empty() {
            tracing::debug!("No listeners for host event {}", kind);
        }

        for listener in &targets {
            listener(event);
        }
        targets.len()
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
