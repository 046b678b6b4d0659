//! Route change hook registry.
//!
//! Hooks are plain callbacks run synchronously, in registration order,
//! every time the current page changes. Registering returns an
//! [`Unsubscribe`] that removes the hook again.

use crate::types::{PageEntry, PageSnapshot};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback receiving `(new_page, old_page)`.
pub type RouteChangeHook = Arc<dyn Fn(&PageEntry, Option<&PageSnapshot>) + Send + Sync>;

/// Registration order of a hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookId(pub u64);

#[derive(Default)]
struct Hooks {
    hooks: RwLock<BTreeMap<HookId, RouteChangeHook>>,
    next_id: AtomicU64,
}

/// Ordered set of route change hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    inner: Arc<Hooks>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. It stays registered until the returned handle is used.
    pub fn register<F>(&self, hook: F) -> Unsubscribe
    where
        F: Fn(&PageEntry, Option<&PageSnapshot>) + Send + Sync + 'static,
    {
        let id = HookId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        self.inner.hooks.write().insert(id, Arc::new(hook));

        Unsubscribe {
            hooks: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.hooks.read().is_empty()
    }

    /// Run every hook. The registry is not locked while hooks run, so a hook
    /// may register or unregister others.
    pub fn fire(&self, new_page: &PageEntry, old_page: Option<&PageSnapshot>) {
        let hooks: Vec<RouteChangeHook> = self.inner.hooks.read().values().cloned().collect();
        for hook in hooks {
            hook(new_page, old_page);
        }
    }
}

/// Removes one hook from its registry.
#[must_use = "dropping this handle keeps the hook registered forever"]
pub struct Unsubscribe {
    hooks: Weak<Hooks>,
    id: HookId,
}

impl Unsubscribe {
    pub fn id(&self) -> HookId {
        self.id
    }

    /// Remove the hook. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.hooks.upgrade() {
            Some(hooks) => hooks.hooks.write().remove(&self.id).is_some(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntryId, Location, NavData, NavSource};
    use parking_lot::Mutex;

    fn page(path: &str) -> PageEntry {
        PageEntry::new(
            EntryId(1),
            Location::new(path, "", ""),
            NavData::new(NavSource::Enter),
        )
    }

    #[test]
    fn test_hooks_fire_in_registration_order() {
        let registry = HookRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let _a = registry.register(move |new, _| {
            first.lock().push(format!("a:{}", new.pathname))
        });
        let second = Arc::clone(&seen);
        let _b = registry.register(move |new, _| {
            second.lock().push(format!("b:{}", new.pathname))
        });

        registry.fire(&page("/home"), None);
        assert_eq!(*seen.lock(), vec!["a:/home", "b:/home"]);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_hook() {
        let registry = HookRegistry::new();
        let count = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&count);
        let keep = registry.register(move |_, _| *counter.lock() += 1);
        let drop_me = registry.register(|_, _| panic!("should be unsubscribed"));

        assert!(drop_me.unsubscribe());
        registry.fire(&page("/a"), None);

        assert_eq!(*count.lock(), 1);
        assert_eq!(registry.len(), 1);
        assert!(keep.unsubscribe());
        assert!(registry.is_empty());
    }
}
