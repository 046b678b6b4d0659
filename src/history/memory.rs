//! In-process simulation of a tab's session history.

use super::{NativeHistory, PopState};
use crate::error::Result;
use crate::types::Location;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

#[derive(Clone, Debug)]
struct HistoryEntry {
    state: Value,
    location: Location,
    /// Entries sharing a document are traversed with `popstate`; crossing
    /// documents loads a page instead.
    document: u64,
}

#[derive(Debug)]
struct Session {
    entries: Vec<HistoryEntry>,
    index: usize,
    popstates: VecDeque<PopState>,
    next_document: u64,
    pending_load: bool,
}

impl Session {
    fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    /// Append after the current entry, dropping the forward entries.
    fn append(&mut self, entry: HistoryEntry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }

    fn new_document(&mut self) -> u64 {
        let document = self.next_document;
        self.next_document += 1;
        document
    }
}

/// A tab's session history without a browser.
///
/// Implements [`NativeHistory`] the way a browser does: `pushState` and
/// `replaceState` never fire `popstate`, traversals within one document
/// queue a `popstate` for the host to dispatch, and traversals onto another
/// document flag a page load instead. User actions a page cannot intercept
/// (hash edits, `location.replace`, full navigations) are exposed as methods.
pub struct MemoryHistory {
    session: Mutex<Session>,
}

impl MemoryHistory {
    /// Open a tab at `url`.
    pub fn new(url: &str) -> Result<Self> {
        let location = Location::parse(url)?;
        Ok(Self {
            session: Mutex::new(Session {
                entries: vec![HistoryEntry {
                    state: Value::Null,
                    location,
                    document: 0,
                }],
                index: 0,
                popstates: VecDeque::new(),
                next_document: 1,
                pending_load: false,
            }),
        })
    }

    /// Number of entries in the session history.
    pub fn entry_count(&self) -> usize {
        self.session.lock().entries.len()
    }

    /// Index of the current entry.
    pub fn index(&self) -> usize {
        self.session.lock().index
    }

    /// Queued `popstate` events, oldest first.
    pub fn take_popstates(&self) -> Vec<PopState> {
        self.session.lock().popstates.drain(..).collect()
    }

    /// True once after a traversal landed on another document.
    pub fn take_load(&self) -> bool {
        std::mem::take(&mut self.session.lock().pending_load)
    }

    /// The user edits the hash: new entry, same document, `popstate` fires.
    pub fn set_hash(&self, hash: &str) {
        let mut session = self.session.lock();
        let current = session.current().clone();
        let hash = if hash.is_empty() || hash.starts_with('#') {
            hash.to_string()
        } else {
            format!("#{hash}")
        };

        if current.location.hash == hash {
            session.popstates.push_back(PopState::new(current.state));
            return;
        }

        let location = Location {
            hash,
            ..current.location
        };
        session.append(HistoryEntry {
            state: Value::Null,
            location,
            document: current.document,
        });
        session.popstates.push_back(PopState::new(Value::Null));
    }

    /// `location.href = location.href` on a url with a hash: no new entry,
    /// but `popstate` fires with the current state.
    pub fn reassign_href(&self) {
        let mut session = self.session.lock();
        let state = session.current().state.clone();
        session.popstates.push_back(PopState::new(state));
    }

    /// Full navigation (`location.href = url`): new entry, new document.
    pub fn navigate(&self, url: &str) -> Result<()> {
        let mut session = self.session.lock();
        let location = Location::resolve(&session.current().location, url)?;
        let document = session.new_document();
        session.append(HistoryEntry {
            state: Value::Null,
            location,
            document,
        });
        session.pending_load = true;
        Ok(())
    }

    /// `location.replace(url)`: the current entry is replaced by a new document.
    pub fn location_replace(&self, url: &str) -> Result<()> {
        let mut session = self.session.lock();
        let location = Location::resolve(&session.current().location, url)?;
        let document = session.new_document();
        let index = session.index;
        session.entries[index] = HistoryEntry {
            state: Value::Null,
            location,
            document,
        };
        session.pending_load = true;
        Ok(())
    }

    /// `location.reload()`: same entry, new document.
    pub fn reload(&self) {
        let mut session = self.session.lock();
        let document = session.new_document();
        let index = session.index;
        session.entries[index].document = document;
        // Other entries of the old document now need a load to return to.
        session.pending_load = true;
    }

    fn traverse(&self, delta: i64) {
        let mut session = self.session.lock();
        let target = session.index as i64 + delta;
        if delta == 0 || target < 0 || target >= session.entries.len() as i64 {
            return;
        }

        let from_document = session.current().document;
        session.index = target as usize;
        let entry = session.current().clone();

        if entry.document == from_document {
            session.popstates.push_back(PopState::new(entry.state));
        } else {
            session.pending_load = true;
        }
    }
}

impl NativeHistory for MemoryHistory {
    fn back(&self) {
        self.traverse(-1);
    }

    fn forward(&self) {
        self.traverse(1);
    }

    fn go(&self, delta: i64) {
        if delta == 0 {
            self.reload();
        } else {
            self.traverse(delta);
        }
    }

    fn push_state(&self, state: Value, _title: &str, url: Option<&str>) {
        let mut session = self.session.lock();
        let current = session.current().clone();
        let location = match url {
            Some(url) => match Location::resolve(&current.location, url) {
                Ok(location) => location,
                Err(e) => {
                    tracing::warn!(error = %e, "pushState url rejected");
                    return;
                }
            },
            None => current.location,
        };

        session.append(HistoryEntry {
            state,
            location,
            document: current.document,
        });
    }

    fn replace_state(&self, state: Value, _title: &str, url: Option<&str>) {
        let mut session = self.session.lock();
        let index = session.index;
        let current = session.current().clone();
        let location = match url {
            Some(url) => match Location::resolve(&current.location, url) {
                Ok(location) => location,
                Err(e) => {
                    tracing::warn!(error = %e, "replaceState url rejected");
                    return;
                }
            },
            None => current.location,
        };

        session.entries[index] = HistoryEntry {
            state,
            location,
            document: current.document,
        };
    }

    fn state(&self) -> Value {
        self.session.lock().current().state.clone()
    }

    fn location(&self) -> Location {
        self.session.lock().current().location.clone()
    }
}
