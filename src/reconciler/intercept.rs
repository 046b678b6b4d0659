//! Interception decorator around the native history mutators.

use super::Shared;
use crate::error::Result;
use crate::history::{tag_state, NativeHistory};
use crate::types::{Location, NavData, NavTag};
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
enum WriteKind {
    Push,
    Replace,
}

/// [`NativeHistory`] that keeps the page stack in step with every call.
///
/// Each call first snapshots the page being left, then schedules the stack
/// mutation, then delegates to the wrapped history and returns.
#[derive(Clone)]
pub struct InterceptedHistory {
    shared: Arc<Shared>,
}

impl InterceptedHistory {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// The wrapped history.
    pub fn original(&self) -> Arc<dyn NativeHistory> {
        Arc::clone(&self.shared.native)
    }

    fn active(&self) -> bool {
        self.shared.installed.load(Ordering::SeqCst)
    }

    fn snapshot_current(&self) {
        if let Err(e) = self.shared.store.snapshot_current() {
            tracing::error!(error = %e, "failed to snapshot page before navigation");
        }
    }

    /// Bookkeeping for `back`/`forward`/`go(n)`.
    fn before_traverse(&self, delta: i64) {
        self.snapshot_current();

        let store = Arc::clone(&self.shared.store);
        self.shared.scheduler.defer(
            self.shared.config.defer_delay,
            Box::new(move || {
                if let Err(e) = store.move_cursor(delta) {
                    tracing::error!(delta, error = %e, "deferred cursor move failed");
                }
            }),
        );

        // The traversal fires a popstate that this move already covers.
        self.shared.suppress_popstate.store(true, Ordering::SeqCst);
        tracing::debug!(delta, "intercepted traversal");
    }

    /// Bookkeeping for `pushState`/`replaceState`; returns the minted tag.
    fn before_write(&self, kind: WriteKind, url: Option<&str>) -> Result<NavTag> {
        self.snapshot_current();
        let tag = self.shared.store.mint_nav_tag()?;

        let store = Arc::clone(&self.shared.store);
        let native = Arc::clone(&self.shared.native);
        let target = url.map(str::to_string);
        self.shared.scheduler.defer(
            self.shared.config.defer_delay,
            Box::new(move || {
                let location: Location = native.location();
                let nav_data = NavData::tagged(tag);
                let result = match kind {
                    WriteKind::Push => store.push(nav_data, &location, target.as_deref()),
                    WriteKind::Replace => store.replace(nav_data, &location, target.as_deref()),
                };
                if let Err(e) = result {
                    tracing::error!(?kind, tag = tag.0, error = %e, "deferred stack write failed");
                }
            }),
        );

        tracing::debug!(?kind, tag = tag.0, url = ?url, "intercepted history write");
        Ok(tag)
    }

    fn write(&self, kind: WriteKind, state: Value, title: &str, url: Option<&str>) {
        let state = if self.active() {
            match self.before_write(kind, url) {
                Ok(tag) => tag_state(state, tag),
                Err(e) => {
                    tracing::error!(?kind, error = %e, "history write not tracked");
                    state
                }
            }
        } else {
            state
        };

        match kind {
            WriteKind::Push => self.shared.native.push_state(state, title, url),
            WriteKind::Replace => self.shared.native.replace_state(state, title, url),
        }
    }
}

impl NativeHistory for InterceptedHistory {
    fn back(&self) {
        if self.active() {
            self.before_traverse(-1);
        }
        self.shared.native.back()
    }

    fn forward(&self) {
        if self.active() {
            self.before_traverse(1);
        }
        self.shared.native.forward()
    }

    fn go(&self, delta: i64) {
        // go(0) reloads the page; startup reconciliation handles that.
        if self.active() && delta != 0 {
            self.before_traverse(delta);
        }
        self.shared.native.go(delta)
    }

    fn push_state(&self, state: Value, title: &str, url: Option<&str>) {
        self.write(WriteKind::Push, state, title, url)
    }

    fn replace_state(&self, state: Value, title: &str, url: Option<&str>) {
        self.write(WriteKind::Replace, state, title, url)
    }

    fn state(&self) -> Value {
        self.shared.native.state()
    }

    fn location(&self) -> Location {
        self.shared.native.location()
    }
}
