//! Controller-side record of host listeners.
//!
//! The controller registers its handlers through [`ListenerTable`] and releases
//! them all with one `release_all` call. Once released, the table stays closed:
//! a registration that races with teardown is undone immediately.

use parking_lot::Mutex;

use crate::host::{FrameHost, HostEventKind, HostListener, ListenerId};

#[derive(Default)]
struct TableInner {
    entries: Vec<(HostEventKind, ListenerId)>,
    released: bool,
}

#[derive(Default)]
pub struct ListenerTable {
    inner: Mutex<TableInner>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` with the host for one event kind.
    ///
    /// Returns `None` when the table was already released.
    pub fn register(
        &self,
        host: &dyn FrameHost,
        kind: HostEventKind,
        listener: HostListener,
    ) -> Option<ListenerId> {
        let mut inner = self.inner.lock();
        if inner.released {
            tracing::debug!("Skipping {} listener, controller torn down", kind);
            return None;
        }
        let id = host.on(kind, listener);
        inner.entries.push((kind, id));
        Some(id)
    }

    /// Release every registered listener. Safe to call repeatedly.
    ///
    /// Returns how many listeners this call released.
    pub fn release_all(&self, host: &dyn FrameHost) -> usize {
        let entries = {
            let mut inner = self.inner.lock();
            inner.released = true;
            std::mem::take(&mut inner.entries)
        };

        for (kind, id) in &entries {
            if !host.off(*id) {
                tracing::debug!("Listener {:?} for {} was already gone", id, kind);
            }
        }
        entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().released
    }
}
