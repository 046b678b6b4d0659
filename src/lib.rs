//! # Route Watch
//!
//! Tracks a browser application's navigation history as an ordered,
//! positioned stack of pages, inferring forward, back, replace and fresh
//! entries from the signals a browser actually gives: native history calls,
//! `popstate` events and the url of the page that loaded.
//!
//! ## Core Concepts
//!
//! - **Page stack**: Ordered pages with a cursor, persisted in chunks to
//!   session storage so it survives reloads
//! - **Forward trail**: Capped list of pages recently left, handed to
//!   change hooks as the old page
//! - **Nav tags**: Monotonic ids injected into `pushState`/`replaceState`
//!   state so a later `popstate` or reload can be matched exactly
//! - **Reconciler**: Wraps the native history and classifies every signal
//!   into one stack mutation
//!
//! ## Example
//!
//! ```ignore
//! use route_watch::{EventLoop, MemoryHistory, MemoryStorage, RouteWatch, WatchConfig};
//! use std::sync::Arc;
//!
//! let event_loop = EventLoop::new();
//! let watch = RouteWatch::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MemoryHistory::new("/home")?),
//!     Arc::new(event_loop.handle()),
//!     WatchConfig::default(),
//! );
//! watch.initialize()?;
//!
//! let _unsubscribe = watch.on_route_change(|new, old| {
//!     println!("{} (from {:?})", new.joined(), old.map(|o| o.location().joined()));
//! });
//!
//! // Navigate through the intercepting history
//! watch.history().push_state(serde_json::json!({}), "", Some("/list"));
//! event_loop.run_until_idle();
//! ```

pub mod error;
pub mod history;
pub mod hooks;
pub mod reconciler;
pub mod scheduler;
pub mod stack;
pub mod storage;
pub mod subscriptions;
pub mod types;
pub mod watch;
#[cfg(feature = "web")]
pub mod web;

// Re-exports
pub use error::{Result, WatchError};
pub use history::{read_tag, tag_state, MemoryHistory, NativeHistory, PopState, TAG_FIELD};
pub use hooks::{HookId, HookRegistry, RouteChangeHook, Unsubscribe};
pub use reconciler::{InterceptedHistory, Reconciler, ReconcilerConfig, Reconciliation};
pub use scheduler::{EventLoop, LoopHandle, Scheduler, Task};
pub use stack::{Produced, Producer, ProducerError, SideData, StackConfig, StackStore};
pub use storage::{ChunkEncoding, MemoryStorage, SessionStorage, StorageKeys};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
pub use subscriptions::{
    DropReason, RouteEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
pub use watch::{RouteWatch, WatchConfig};
#[cfg(feature = "web")]
pub use web::{BrowserHistory, BrowserSessionStorage, PopStateListener, TimeoutScheduler};
