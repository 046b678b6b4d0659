//! A simulated browser tab for the integration tests.

#![allow(dead_code)]

use route_watch::{
    EventLoop, MemoryHistory, MemoryStorage, Reconciliation, RouteWatch, SessionStorage,
    WatchConfig,
};
use std::sync::Arc;

/// One tab: session storage and session history survive page loads, the
/// watch and its event loop are recreated on each load.
pub struct Browser {
    pub storage: Arc<dyn SessionStorage>,
    pub native: Arc<MemoryHistory>,
    pub event_loop: Arc<EventLoop>,
    pub watch: RouteWatch,
    config: WatchConfig,
}

impl Browser {
    pub fn open(url: &str) -> Self {
        Self::with_config(url, WatchConfig::default())
    }

    pub fn with_config(url: &str, config: WatchConfig) -> Self {
        Self::with_storage(url, Arc::new(MemoryStorage::new()), config)
    }

    pub fn with_storage(url: &str, storage: Arc<dyn SessionStorage>, config: WatchConfig) -> Self {
        init_tracing();
        let native = Arc::new(MemoryHistory::new(url).unwrap());
        let (event_loop, watch) = Self::load(&storage, &native, &config);
        Self {
            storage,
            native,
            event_loop,
            watch,
            config,
        }
    }

    fn load(
        storage: &Arc<dyn SessionStorage>,
        native: &Arc<MemoryHistory>,
        config: &WatchConfig,
    ) -> (Arc<EventLoop>, RouteWatch) {
        let event_loop = Arc::new(EventLoop::new());
        let watch = RouteWatch::new(
            Arc::clone(storage),
            native.clone(),
            Arc::new(event_loop.handle()),
            config.clone(),
        );
        (event_loop, watch)
    }

    /// Page load: a fresh watch over the same session, then startup.
    pub fn load_page(&mut self) -> Reconciliation {
        let (event_loop, watch) = Self::load(&self.storage, &self.native, &self.config);
        self.event_loop = event_loop;
        self.watch = watch;
        self.watch.initialize().unwrap()
    }

    /// Run deferred work, dispatch queued `popstate` events, and load the
    /// page if a traversal crossed documents. Returns every outcome.
    pub fn settle(&mut self) -> Vec<Reconciliation> {
        let mut outcomes = Vec::new();
        loop {
            self.event_loop.run_until_idle();
            let events = self.native.take_popstates();
            if events.is_empty() {
                break;
            }
            for event in &events {
                outcomes.push(self.watch.on_popstate(event).unwrap());
            }
        }

        if self.native.take_load() {
            outcomes.push(self.load_page());
        }
        outcomes
    }

    pub fn paths(&self) -> Vec<String> {
        self.watch.stack().iter().map(|e| e.joined()).collect()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.watch.current_index()
    }
}

/// A browser opened at `url` with its first page loaded.
pub fn started(url: &str) -> Browser {
    let mut browser = Browser::open(url);
    browser.load_page();
    browser
}

/// Route library logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
