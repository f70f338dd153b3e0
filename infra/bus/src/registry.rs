use crate::listener::Listener;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Set of passive listeners.
///
/// Entries are weak: the registry owns membership, never the listener.
/// Dispatch iterates over a snapshot taken under the read lock, so listeners
/// may be added or removed from inside a callback, and a dispatch already in
/// flight may still reach a listener removed concurrently.
#[derive(Default)]
pub(crate) struct Registry {
    listeners: RwLock<Vec<Weak<dyn Listener>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("listeners", &self.listeners.read().len()).finish()
    }
}

impl Registry {
    pub(crate) fn add<L: Listener + 'static>(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener) as Weak<dyn Listener>;
        let mut listeners = self.listeners.write();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(weak);
    }

    /// Removes every registration of `listener`. Returns `false` if there was none.
    pub(crate) fn remove<L: Listener + 'static>(&self, listener: &Arc<L>) -> bool {
        let target = Arc::as_ptr(listener);
        let mut listeners = self.listeners.write();
        listeners.retain(|l| l.strong_count() > 0);
        let before = listeners.len();
        listeners.retain(|l| !std::ptr::addr_eq(l.as_ptr(), target));
        listeners.len() < before
    }

    /// Live listeners in registration order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Listener>> {
        self.listeners.read().iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().iter().filter(|l| l.strong_count() > 0).count()
    }

    pub(crate) fn clear(&self) -> usize {
        let mut listeners = self.listeners.write();
        let live = listeners.iter().filter(|l| l.strong_count() > 0).count();
        listeners.clear();
        live
    }
}
