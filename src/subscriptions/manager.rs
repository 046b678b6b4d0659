//! Subscription manager for broadcasting route changes.

use crate::types::{PageEntry, PageSnapshot};
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    DropReason, RouteEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<RouteEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    ///
    /// The channel holds one slot beyond `buffer_size`, kept free for the
    /// final `Dropped` event.
    fn try_send(&self, event: RouteEvent) -> bool {
        if self.sender.len() >= self.config.buffer_size.max(1) {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Manages subscriptions and broadcasts route changes.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// When the config asks for it and `current` is known, the current page
    /// is queued before any live event.
    pub fn subscribe(
        &self,
        config: SubscriptionConfig,
        current: Option<(PageEntry, usize)>,
    ) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1) + 1);

        let subscription = Subscription { config, sender };

        if subscription.config.include_current {
            if let Some((page, index)) = current {
                if subscription.config.filter.matches(&page) {
                    subscription.try_send(RouteEvent::Current { page, index });
                }
            }
        }

        self.subscriptions.write().insert(id, subscription);

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(RouteEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Broadcast a route change to matching subscriptions.
    pub fn broadcast_change(&self, page: &PageEntry, index: usize, old: Option<&PageSnapshot>) {
        if self.subscription_count() == 0 {
            return;
        }

        let event = RouteEvent::Changed {
            page: page.clone(),
            index,
            old: old.cloned(),
        };

        self.broadcast(|sub| sub.config.filter.matches(page), event);
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast<F>(&self, filter: F, event: RouteEvent)
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if filter(sub) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::warn!(subscription = id.0, "dropping slow route subscriber");
                    let _ = sub.sender.try_send(RouteEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
