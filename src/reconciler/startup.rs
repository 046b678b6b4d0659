//! Startup reconciliation, once per page load.

use super::{classify, Reconciler, Reconciliation};
use crate::error::Result;
use crate::history::read_tag;
use crate::types::{Location, NavSource};
use std::sync::atomic::Ordering;

impl Reconciler {
    /// Load the page stack and reconcile it with the page that just loaded.
    ///
    /// Runs once; later calls return [`Reconciliation::Unchanged`]. The
    /// cases, in order:
    ///
    /// 1. empty stack: first visit, record an `enter` entry;
    /// 2. tagged history state: reload of (or traversal onto) a tagged
    ///    entry, move there;
    /// 3. current/previous/next url match: reload or traversal onto an
    ///    untagged entry;
    /// 4. an untagged entry within the fuzzy window: `location.replace`
    ///    skipped the entries in between, move there and remove them;
    /// 5. otherwise a fresh navigation, record a `location` entry.
    pub fn reconcile_startup(&self) -> Result<Reconciliation> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Ok(Reconciliation::Unchanged);
        }

        let result = self
            .shared
            .store
            .initialize()
            .and_then(|()| self.classify_startup());

        match &result {
            Ok(outcome) => tracing::info!(?outcome, "startup reconciled"),
            Err(e) => {
                tracing::error!(error = %e, "startup reconciliation failed");
                self.shared.started.store(false, Ordering::SeqCst);
            }
        }
        result
    }

    fn classify_startup(&self) -> Result<Reconciliation> {
        let store = &self.shared.store;
        let location = self.shared.native.location();

        let Some(cursor) = store.current_index() else {
            return self.record_new(NavSource::Enter, &location);
        };

        if let Some(tag) = read_tag(&self.shared.native.state()) {
            return match store.find_by_tag(tag) {
                Some(found) => self.step_to(cursor, found),
                None => {
                    tracing::warn!(tag = tag.0, "loaded history state tag not in page stack");
                    Ok(Reconciliation::Unreconciled { tag: Some(tag) })
                }
            };
        }

        if let Some(outcome) = self.follow_neighbors(cursor, &location)? {
            return Ok(outcome);
        }

        self.collapse_or_record(cursor, &location)
    }

    /// `location.replace` leaves no trace in history. A match within the
    /// fuzzy window means the entries between it and the cursor were
    /// replaced away.
    fn collapse_or_record(&self, cursor: usize, location: &Location) -> Result<Reconciliation> {
        let store = &self.shared.store;
        let stack = store.stack();
        let window = self.shared.config.fuzzy_window;

        let Some(found) = classify::fuzzy_match(&stack, cursor, &location.joined(), window) else {
            return self.record_new(NavSource::Location, location);
        };

        store.snapshot_current()?;
        store.move_cursor(found as i64 - cursor as i64)?;
        let (start, end) = if found < cursor {
            (found, cursor)
        } else {
            (cursor, found)
        };
        let removed = store.remove_range(start, end)?;

        Ok(Reconciliation::Collapsed {
            from: cursor,
            to: store.current_index().unwrap_or(found),
            removed,
        })
    }
}
