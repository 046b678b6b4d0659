//! Channel-based route change subscriptions.
//!
//! Where hooks are synchronous callbacks, subscriptions hand route changes
//! to a bounded channel the consumer drains at its own pace:
//! - Optional delivery of the current page on subscribe
//! - Filtering by page provenance or path prefix
//! - Slow subscribers are dropped once their buffer is full
//!
//! # Example
//!
//! ```ignore
//! let handle = watch.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::path_prefix("/orders"),
//!     ..Default::default()
//! });
//!
//! for event in handle.drain() {
//!     if let RouteEvent::Changed { page, old, .. } = event {
//!         println!("{} -> {}", old.map(|o| o.pathname).unwrap_or_default(), page.pathname);
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, RouteEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
