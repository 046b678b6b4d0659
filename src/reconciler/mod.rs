//! Navigation reconciliation.
//!
//! The browser never says "the user went back". All it offers is native
//! history calls the page makes itself, `popstate` events, and the url of
//! the page that just loaded. The reconciler turns those signals into
//! exactly one page stack mutation each:
//!
//! - **Interception** ([`InterceptedHistory`]): wraps the native mutators,
//!   snapshots the page being left, tags `pushState`/`replaceState` state
//!   objects and defers the matching stack mutation until the native call
//!   has settled.
//! - **`popstate`** ([`Reconciler::on_popstate`]): by tag when the state
//!   carries one, otherwise by comparing the url with the neighbors of the
//!   cursor.
//! - **Startup** ([`Reconciler::reconcile_startup`]): once per page load,
//!   covering first entry, reload, landing back/forward on an untagged
//!   page, `location.replace` collapses and fresh navigations.

pub mod classify;
mod intercept;
mod popstate;
mod startup;

pub use intercept::InterceptedHistory;

use crate::error::Result;
use crate::history::NativeHistory;
use crate::scheduler::Scheduler;
use crate::stack::StackStore;
use crate::types::{Location, NavData, NavSource, NavTag};
use classify::NeighborMatch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default delay before a deferred stack mutation runs.
pub const DEFAULT_DEFER_DELAY: Duration = Duration::from_millis(4);

/// Default reach of the `location.replace` collapse search, each direction.
pub const DEFAULT_FUZZY_WINDOW: usize = 3;

/// Reconciler configuration.
#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Delay between an intercepted native call and its stack mutation.
    pub defer_delay: Duration,

    /// Entries searched on each side of the cursor at startup.
    pub fuzzy_window: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            defer_delay: DEFAULT_DEFER_DELAY,
            fuzzy_window: DEFAULT_FUZZY_WINDOW,
        }
    }
}

/// What a reconciliation did to the page stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    /// The `popstate` came from an intercepted traversal already accounted for.
    Suppressed,
    /// Same page as before; nothing changed.
    Unchanged,
    /// The cursor moved.
    Moved { from: usize, to: usize },
    /// A new entry was recorded.
    Pushed { index: usize, source: NavSource },
    /// The cursor jumped to a nearby entry and the entries skipped over
    /// were removed.
    Collapsed {
        from: usize,
        to: usize,
        removed: usize,
    },
    /// The signal could not be matched to the stack; left as is.
    Unreconciled { tag: Option<NavTag> },
}

pub(crate) struct Shared {
    pub(crate) store: Arc<StackStore>,
    pub(crate) native: Arc<dyn NativeHistory>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) config: ReconcilerConfig,
    /// Set by intercepted traversals so the `popstate` they cause is skipped.
    pub(crate) suppress_popstate: AtomicBool,
    pub(crate) installed: AtomicBool,
    pub(crate) started: AtomicBool,
}

/// Reconciles browser navigation signals with the page stack.
#[derive(Clone)]
pub struct Reconciler {
    shared: Arc<Shared>,
}

impl Reconciler {
    /// Wrap `native` and start intercepting. The store is initialized by
    /// [`Self::reconcile_startup`].
    pub fn install(
        store: Arc<StackStore>,
        native: Arc<dyn NativeHistory>,
        scheduler: Arc<dyn Scheduler>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                native,
                scheduler,
                config,
                suppress_popstate: AtomicBool::new(false),
                installed: AtomicBool::new(true),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// The intercepting history the application should navigate through.
    pub fn history(&self) -> InterceptedHistory {
        InterceptedHistory::new(Arc::clone(&self.shared))
    }

    /// Stop intercepting and hand back the original history. Handles from
    /// [`Self::history`] keep working but delegate straight through.
    pub fn uninstall(&self) -> Arc<dyn NativeHistory> {
        self.shared.installed.store(false, Ordering::SeqCst);
        Arc::clone(&self.shared.native)
    }

    pub fn is_installed(&self) -> bool {
        self.shared.installed.load(Ordering::SeqCst)
    }

    /// True while a `popstate` from an intercepted traversal is expected.
    pub fn is_suppressing(&self) -> bool {
        self.shared.suppress_popstate.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &Arc<StackStore> {
        &self.shared.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.shared.config
    }

    /// Snapshot the page being left and move the cursor onto `target`.
    fn step_to(&self, cursor: usize, target: usize) -> Result<Reconciliation> {
        if target == cursor {
            return Ok(Reconciliation::Unchanged);
        }

        let store = &self.shared.store;
        store.snapshot_current()?;
        store.move_cursor(target as i64 - cursor as i64)?;
        Ok(Reconciliation::Moved {
            from: cursor,
            to: target,
        })
    }

    /// Apply the current/previous/next url comparison. `None` when the url
    /// matches none of the three.
    fn follow_neighbors(
        &self,
        cursor: usize,
        location: &Location,
    ) -> Result<Option<Reconciliation>> {
        let stack = self.shared.store.stack();
        let outcome = match classify::match_neighbors(&stack, cursor, &location.joined()) {
            NeighborMatch::Current => Reconciliation::Unchanged,
            NeighborMatch::Previous => self.step_to(cursor, cursor - 1)?,
            NeighborMatch::Next => self.step_to(cursor, cursor + 1)?,
            NeighborMatch::Unmatched => return Ok(None),
        };
        Ok(Some(outcome))
    }

    /// Snapshot the page being left and record `location` as a new entry.
    fn record_new(&self, source: NavSource, location: &Location) -> Result<Reconciliation> {
        let store = &self.shared.store;
        store.snapshot_current()?;
        store.push(NavData::new(source), location, None)?;
        Ok(Reconciliation::Pushed {
            index: store.current_index().unwrap_or_default(),
            source,
        })
    }
}
