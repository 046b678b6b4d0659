//! Subscription types for route change streams.

use crate::types::{NavSource, PageEntry, PageSnapshot};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping the subscriber.
    /// Default: 256
    pub buffer_size: usize,

    /// Deliver the current page as the first event.
    pub include_current: bool,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            include_current: false,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Filter criteria applied to the page being navigated to.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only pages created this way (None = any).
    pub sources: Option<Vec<NavSource>>,

    /// Only pages whose pathname starts with this prefix (None = any).
    pub path_prefix: Option<String>,
}

impl SubscriptionFilter {
    /// Every route change.
    pub fn all() -> Self {
        Self::default()
    }

    /// Route changes landing on pages created in one of these ways.
    pub fn sources(sources: Vec<NavSource>) -> Self {
        Self {
            sources: Some(sources),
            ..Default::default()
        }
    }

    /// Route changes landing under a path prefix.
    pub fn path_prefix(prefix: impl Into<String>) -> Self {
        Self {
            path_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, page: &PageEntry) -> bool {
        if let Some(ref sources) = self.sources {
            if !sources.contains(&page.nav_data.from) {
                return false;
            }
        }

        if let Some(ref prefix) = self.path_prefix {
            if !page.pathname.starts_with(prefix.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Events emitted by subscriptions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteEvent {
    /// The page current at subscription time.
    Current { page: PageEntry, index: usize },

    /// The current page changed.
    Changed {
        page: PageEntry,
        index: usize,
        /// Page left behind, taken from the forward trail.
        old: Option<PageSnapshot>,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<RouteEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<RouteEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<RouteEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<RouteEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything currently buffered, without blocking.
    pub fn drain(&self) -> Vec<RouteEvent> {
        self.receiver.try_iter().collect()
    }
}
