//! `popstate` classification.

use super::{Reconciler, Reconciliation};
use crate::error::Result;
use crate::history::PopState;
use crate::types::NavSource;
use std::sync::atomic::Ordering;

impl Reconciler {
    /// Classify a `popstate` the browser fired and apply the matching stack
    /// mutation.
    ///
    /// A `popstate` caused by an intercepted `back`/`forward`/`go` is
    /// skipped, its move is already scheduled. A tagged state moves the
    /// cursor onto the entry recorded for the tag. An untagged state (hash
    /// edits, entries created before tagging) is matched by url against
    /// the current, previous and next entries, and recorded as a new
    /// `hash` entry when none of them match.
    pub fn on_popstate(&self, event: &PopState) -> Result<Reconciliation> {
        if self.shared.suppress_popstate.swap(false, Ordering::SeqCst) {
            tracing::trace!("popstate from intercepted traversal");
            return Ok(Reconciliation::Suppressed);
        }

        let store = &self.shared.store;
        let tag = event.nav_tag();
        let Some(cursor) = store.current_index() else {
            tracing::warn!(tag = ?tag, "popstate with empty page stack");
            return Ok(Reconciliation::Unreconciled { tag });
        };

        let outcome = match tag {
            Some(tag) => match store.find_by_tag(tag) {
                Some(found) => self.step_to(cursor, found)?,
                None => {
                    tracing::warn!(tag = tag.0, "popstate tag not in page stack");
                    Reconciliation::Unreconciled { tag: Some(tag) }
                }
            },
            None => {
                let location = self.shared.native.location();
                match self.follow_neighbors(cursor, &location)? {
                    Some(outcome) => outcome,
                    None => self.record_new(NavSource::Hash, &location)?,
                }
            }
        };

        tracing::debug!(?outcome, "popstate reconciled");
        Ok(outcome)
    }
}
