//! Main RouteWatch struct tying the stack and the reconciler together.

use crate::error::Result;
use crate::history::{NativeHistory, PopState};
use crate::hooks::Unsubscribe;
use crate::reconciler::{
    InterceptedHistory, Reconciler, ReconcilerConfig, Reconciliation, DEFAULT_DEFER_DELAY,
    DEFAULT_FUZZY_WINDOW,
};
use crate::scheduler::Scheduler;
use crate::stack::{
    Producer, ProducerError, StackConfig, StackStore, DEFAULT_CHUNK_SIZE, DEFAULT_FORWARD_LIMIT,
    DEFAULT_NAMESPACE,
};
use crate::storage::{ChunkEncoding, SessionStorage};
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionId};
use crate::types::{PageEntry, PageSnapshot};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Watch configuration.
#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Prefix of every storage key.
    pub namespace: String,

    /// Entries per persisted stack chunk.
    pub chunk_size: usize,

    /// Max snapshots kept in the forward trail.
    pub forward_limit: usize,

    /// Entries searched on each side of the cursor for a `location.replace`
    /// collapse.
    pub fuzzy_window: usize,

    /// Delay between an intercepted native call and its stack mutation.
    pub defer_delay: Duration,

    /// Encoding of persisted values.
    pub encoding: ChunkEncoding,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            forward_limit: DEFAULT_FORWARD_LIMIT,
            fuzzy_window: DEFAULT_FUZZY_WINDOW,
            defer_delay: DEFAULT_DEFER_DELAY,
            encoding: ChunkEncoding::Json,
        }
    }
}

impl WatchConfig {
    pub fn stack_config(&self) -> StackConfig {
        StackConfig {
            namespace: self.namespace.clone(),
            chunk_size: self.chunk_size,
            forward_limit: self.forward_limit,
            encoding: self.encoding,
        }
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            defer_delay: self.defer_delay,
            fuzzy_window: self.fuzzy_window,
        }
    }
}

/// Navigation history tracker for one page load.
///
/// Provides a unified interface for:
/// - Navigating through the intercepting history
/// - Feeding `popstate` events to the reconciler
/// - Observing page changes through hooks or channel subscriptions
/// - Reading the page stack and attaching per-page data
pub struct RouteWatch {
    store: Arc<StackStore>,
    reconciler: Reconciler,
}

impl RouteWatch {
    /// Wire up a watch. Nothing is loaded until [`Self::initialize`].
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        native: Arc<dyn NativeHistory>,
        scheduler: Arc<dyn Scheduler>,
        config: WatchConfig,
    ) -> Self {
        let store = Arc::new(StackStore::new(storage, config.stack_config()));
        let reconciler = Reconciler::install(
            Arc::clone(&store),
            native,
            scheduler,
            config.reconciler_config(),
        );
        Self { store, reconciler }
    }

    /// Load the persisted stack and reconcile it with the loaded page.
    /// Only the first call does anything.
    pub fn initialize(&self) -> Result<Reconciliation> {
        self.reconciler.reconcile_startup()
    }

    /// The history to navigate through.
    pub fn history(&self) -> InterceptedHistory {
        self.reconciler.history()
    }

    pub fn on_popstate(&self, event: &PopState) -> Result<Reconciliation> {
        self.reconciler.on_popstate(event)
    }

    /// Stop intercepting; returns the original history.
    pub fn uninstall(&self) -> Arc<dyn NativeHistory> {
        self.reconciler.uninstall()
    }

    // --- Change notification ---

    /// Register a hook fired with `(new_page, old_page)` on every page change.
    pub fn on_route_change<F>(&self, hook: F) -> Unsubscribe
    where
        F: Fn(&PageEntry, Option<&PageSnapshot>) + Send + Sync + 'static,
    {
        self.store.on_route_change(hook)
    }

    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.store.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id)
    }

    // --- Page data ---

    /// Attach a lazy producer to the current page under `key`.
    pub fn set_page_data<F>(&self, key: impl Into<String>, producer: F) -> Result<()>
    where
        F: Fn() -> std::result::Result<Value, ProducerError> + Send + Sync + 'static,
    {
        self.store.set_side_data(key, Producer::new(producer))
    }

    /// Read the current page's data.
    ///
    /// With a key, that producer's value; with `None`, an object of every
    /// producer's value. Failed producers, unknown keys and an empty stack
    /// all read as `null`.
    pub fn get_page_data(&self, key: Option<&str>) -> Value {
        match key {
            Some(key) => self.store.page_data(key).unwrap_or(Value::Null),
            None => {
                if self.store.current_index().is_none() {
                    return Value::Null;
                }
                Value::Object(self.store.all_page_data().into_iter().collect::<Map<_, _>>())
            }
        }
    }

    // --- Accessors ---

    pub fn current_page(&self) -> Option<PageEntry> {
        self.store.current_page()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.store.current_index()
    }

    pub fn stack(&self) -> Vec<PageEntry> {
        self.store.stack()
    }

    pub fn forward_trail(&self) -> Vec<PageSnapshot> {
        self.store.forward_trail()
    }

    pub fn store(&self) -> &Arc<StackStore> {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use crate::scheduler::EventLoop;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn watch_at(url: &str) -> RouteWatch {
        let event_loop = EventLoop::new();
        let watch = RouteWatch::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryHistory::new(url).unwrap()),
            Arc::new(event_loop.handle()),
            WatchConfig::default(),
        );
        watch.initialize().unwrap();
        watch
    }

    #[test]
    fn test_config_splits() {
        let config = WatchConfig {
            fuzzy_window: 5,
            chunk_size: 8,
            ..Default::default()
        };
        assert_eq!(config.stack_config().chunk_size, 8);
        assert_eq!(config.stack_config().namespace, "watch-route");
        assert_eq!(config.reconciler_config().fuzzy_window, 5);
        assert_eq!(config.reconciler_config().defer_delay, Duration::from_millis(4));
    }

    #[test]
    fn test_page_data_reads() {
        let watch = watch_at("/form");
        watch.set_page_data("draft", || Ok(json!({ "title": "hi" }))).unwrap();
        watch
            .set_page_data("scroll", || Err("element detached".into()))
            .unwrap();

        assert_eq!(watch.get_page_data(Some("draft")), json!({ "title": "hi" }));
        assert_eq!(watch.get_page_data(Some("scroll")), Value::Null);
        assert_eq!(watch.get_page_data(Some("missing")), Value::Null);
        assert_eq!(
            watch.get_page_data(None),
            json!({ "draft": { "title": "hi" }, "scroll": null })
        );
    }

    #[test]
    fn test_second_initialize_is_noop() {
        let watch = watch_at("/a");
        assert_eq!(watch.initialize().unwrap(), Reconciliation::Unchanged);
        assert_eq!(watch.stack().len(), 1);
    }
}
