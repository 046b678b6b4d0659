//! The page stack store: in-memory stack, cursor, forward trail and counters,
//! persisted to chunked session storage.

use super::chunks::{self, ChunkSync, DEFAULT_CHUNK_SIZE};
use super::side_data::Producer;
use crate::error::{Result, WatchError};
use crate::hooks::{HookRegistry, Unsubscribe};
use crate::storage::{ChunkEncoding, SessionStorage, StorageKeys};
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{EntryId, Location, NavData, NavTag, PageEntry, PageSnapshot};
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Default cap on the forward trail.
pub const DEFAULT_FORWARD_LIMIT: usize = 20;

/// Default storage namespace.
pub const DEFAULT_NAMESPACE: &str = "watch-route";

/// Page stack store configuration.
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// Prefix of every storage key.
    pub namespace: String,

    /// Entries per persisted chunk.
    pub chunk_size: usize,

    /// Max snapshots kept in the forward trail.
    pub forward_limit: usize,

    /// Encoding of persisted values.
    pub encoding: ChunkEncoding,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            forward_limit: DEFAULT_FORWARD_LIMIT,
            encoding: ChunkEncoding::Json,
        }
    }
}

struct StackState {
    initialized: bool,
    stack: Vec<PageEntry>,
    forward: VecDeque<PageSnapshot>,
    cursor: Option<usize>,
    next_tag: NavTag,
    next_entry: EntryId,
}

impl StackState {
    fn empty() -> Self {
        Self {
            initialized: false,
            stack: Vec::new(),
            forward: VecDeque::new(),
            cursor: None,
            next_tag: NavTag::FIRST,
            next_entry: EntryId(1),
        }
    }
}

/// A change of current page, delivered once the state lock is released.
struct RouteChange {
    page: PageEntry,
    index: usize,
    old: Option<PageSnapshot>,
}

/// Owns the page stack.
///
/// All mutation goes through the methods here. Each mutator updates memory,
/// flushes the affected storage keys, and only then runs hooks and
/// subscriptions, outside the state lock.
pub struct StackStore {
    config: StackConfig,
    keys: StorageKeys,
    storage: Arc<dyn SessionStorage>,
    state: Mutex<StackState>,
    hooks: HookRegistry,
    subscriptions: SubscriptionManager,
}

impl StackStore {
    /// Create a store over `storage`. Nothing is read until [`Self::initialize`].
    pub fn new(storage: Arc<dyn SessionStorage>, config: StackConfig) -> Self {
        let config = StackConfig {
            chunk_size: config.chunk_size.max(1),
            forward_limit: config.forward_limit.max(1),
            ..config
        };

        Self {
            keys: StorageKeys::new(config.namespace.clone()),
            config,
            storage,
            state: Mutex::new(StackState::empty()),
            hooks: HookRegistry::new(),
            subscriptions: SubscriptionManager::new(),
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Load persisted state. Safe to call repeatedly; only the first
    /// successful call reads storage.
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.initialized {
            return Ok(());
        }

        let mut forward: VecDeque<PageSnapshot> = self
            .read::<Vec<PageSnapshot>>(&self.keys.forward_trail())?
            .unwrap_or_default()
            .into();
        while forward.len() > self.config.forward_limit {
            forward.pop_front();
        }

        let mut stack = Vec::new();
        let mut chunk = 0;
        while let Some(entries) = self.read::<Vec<PageEntry>>(&self.keys.stack_chunk(chunk))? {
            if entries.is_empty() {
                break;
            }
            stack.extend(entries);
            chunk += 1;
        }

        let stored_cursor = self.read::<i64>(&self.keys.position())?.unwrap_or(-1);
        let cursor = if stack.is_empty() {
            None
        } else if stored_cursor >= 0 && (stored_cursor as usize) < stack.len() {
            Some(stored_cursor as usize)
        } else {
            tracing::warn!(
                cursor = stored_cursor,
                len = stack.len(),
                "stored cursor outside stack, using last entry"
            );
            Some(stack.len() - 1)
        };

        let next_tag = NavTag(self.read::<u64>(&self.keys.nav_tag())?.unwrap_or(1).max(1));
        let max_id = stack.iter().map(|e| e.id.0).max().unwrap_or(0);
        let stored_entry = self.read::<u64>(&self.keys.entry_id())?.unwrap_or(1);
        let next_entry = EntryId(stored_entry.max(max_id + 1));

        tracing::debug!(
            entries = stack.len(),
            chunks = chunk,
            cursor = ?cursor,
            forward = forward.len(),
            next_tag = next_tag.0,
            "page stack loaded"
        );

        *state = StackState {
            initialized: true,
            stack,
            forward,
            cursor,
            next_tag,
            next_entry,
        };

        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    // --- Nav tags ---

    /// Hand out the next nav tag and persist the counter past it.
    pub fn mint_nav_tag(&self) -> Result<NavTag> {
        let mut state = self.lock_ready()?;
        let tag = state.next_tag;
        state.next_tag = tag.next();
        self.write(&self.keys.nav_tag(), &state.next_tag.0)?;
        Ok(tag)
    }

    /// The tag the next intercepted push/replace will receive.
    pub fn peek_nav_tag(&self) -> NavTag {
        self.state.lock().next_tag
    }

    // --- Mutators ---

    /// Record a new page after the cursor, discarding every entry ahead of it.
    pub fn push(
        &self,
        nav_data: NavData,
        current: &Location,
        url_override: Option<&str>,
    ) -> Result<()> {
        let location = current.with_override(url_override)?;
        let mut state = self.lock_ready()?;

        let old_len = state.stack.len();
        let keep = state.cursor.map_or(0, |c| c + 1).min(old_len);
        let removed = old_len - keep;
        state.stack.truncate(keep);

        let id = state.next_entry;
        state.next_entry = id.next();
        state.stack.push(PageEntry::new(id, location, nav_data));

        let index = state.stack.len() - 1;
        state.cursor = Some(index);

        tracing::debug!(
            index,
            removed,
            from = ?nav_data.from,
            tag = ?nav_data.nav_tag,
            path = %state.stack[index].joined(),
            "push page"
        );

        self.write(&self.keys.entry_id(), &state.next_entry.0)?;
        self.sync_chunks(
            &state,
            ChunkSync {
                index,
                removed_tail: removed,
                refresh_tail: false,
            },
            old_len,
        )?;
        self.write_cursor(&state)?;

        let change = self.take_change(&mut state)?;
        drop(state);
        self.notify(change);
        Ok(())
    }

    /// Overwrite the current entry in place. With no current entry this
    /// records the first one instead.
    pub fn replace(
        &self,
        nav_data: NavData,
        current: &Location,
        url_override: Option<&str>,
    ) -> Result<()> {
        let location = current.with_override(url_override)?;
        let mut state = self.lock_ready()?;

        let Some(index) = state.cursor else {
            drop(state);
            tracing::debug!("replace with empty stack, recording as push");
            return self.push(nav_data, current, url_override);
        };

        let id = state.next_entry;
        state.next_entry = id.next();
        state.stack[index] = PageEntry::new(id, location, nav_data);

        tracing::debug!(
            index,
            from = ?nav_data.from,
            tag = ?nav_data.nav_tag,
            path = %state.stack[index].joined(),
            "replace page"
        );

        let len = state.stack.len();
        self.write(&self.keys.entry_id(), &state.next_entry.0)?;
        self.sync_chunks(&state, ChunkSync::at(index), len)?;

        let change = self.take_change(&mut state)?;
        drop(state);
        self.notify(change);
        Ok(())
    }

    /// Move the cursor by `relative`, clamped to the stack. Returns false
    /// (and does nothing at all) when the clamped position is unchanged.
    pub fn move_cursor(&self, relative: i64) -> Result<bool> {
        let mut state = self.lock_ready()?;

        let Some(cursor) = state.cursor else {
            return Ok(false);
        };
        let len = state.stack.len();
        let target = (cursor as i64)
            .saturating_add(relative)
            .clamp(0, len as i64 - 1) as usize;
        if target == cursor {
            return Ok(false);
        }

        state.cursor = Some(target);
        tracing::debug!(from = cursor, to = target, relative, "move cursor");

        self.write_cursor(&state)?;
        if chunks::chunk_of(cursor, self.config.chunk_size)
            != chunks::chunk_of(target, self.config.chunk_size)
        {
            self.sync_chunks(&state, ChunkSync::at(cursor), len)?;
        }
        self.sync_chunks(&state, ChunkSync::at(target), len)?;

        let change = self.take_change(&mut state)?;
        drop(state);
        self.notify(change);
        Ok(true)
    }

    /// Remove the entries strictly between `start` and `end`, keeping both.
    /// Returns how many entries were removed. Fires no hooks.
    pub fn remove_range(&self, start: usize, end: usize) -> Result<usize> {
        let mut state = self.lock_ready()?;

        let old_len = state.stack.len();
        let end = end.min(old_len);
        if start + 1 >= end {
            return Ok(0);
        }

        state.stack.drain(start + 1..end);
        let removed = end - start - 1;

        if let Some(cursor) = state.cursor {
            let adjusted = if cursor >= end {
                cursor - removed
            } else if cursor > start {
                start
            } else {
                cursor
            };
            if adjusted != cursor {
                state.cursor = Some(adjusted);
                self.write_cursor(&state)?;
            }
        }

        tracing::debug!(start, end, removed, "remove page range");

        self.sync_chunks(
            &state,
            ChunkSync {
                index: start,
                removed_tail: removed,
                refresh_tail: true,
            },
            old_len,
        )?;

        Ok(removed)
    }

    /// Add a snapshot of a page being left, evicting the oldest past the cap.
    pub fn append_forward(&self, snapshot: PageSnapshot) -> Result<()> {
        let mut state = self.lock_ready()?;

        state.forward.push_back(snapshot);
        while state.forward.len() > self.config.forward_limit {
            state.forward.pop_front();
        }

        self.write_forward(&state)
    }

    /// Snapshot the current page into the forward trail. Producers run
    /// without the state lock held. Returns false with an empty stack.
    pub fn snapshot_current(&self) -> Result<bool> {
        match self.current_page() {
            Some(page) => {
                self.append_forward(page.snapshot())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Attach a lazy producer to the current page.
    pub fn set_side_data(&self, key: impl Into<String>, producer: Producer) -> Result<()> {
        let mut state = self.lock_ready()?;
        let index = state.cursor.ok_or(WatchError::EmptyStack)?;
        state.stack[index].side_data.insert(key, producer);
        Ok(())
    }

    // --- Accessors ---

    pub fn current_index(&self) -> Option<usize> {
        self.state.lock().cursor
    }

    pub fn current_page(&self) -> Option<PageEntry> {
        let state = self.state.lock();
        state.cursor.map(|i| state.stack[i].clone())
    }

    /// Copy of the whole stack.
    pub fn stack(&self) -> Vec<PageEntry> {
        self.state.lock().stack.clone()
    }

    /// Copy of the forward trail, oldest first.
    pub fn forward_trail(&self) -> Vec<PageSnapshot> {
        self.state.lock().forward.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().stack.is_empty()
    }

    /// Index of the entry recorded for `tag`.
    pub fn find_by_tag(&self, tag: NavTag) -> Option<usize> {
        self.state
            .lock()
            .stack
            .iter()
            .position(|e| e.nav_tag() == Some(tag))
    }

    /// Value of one of the current page's producers (`null` on failure).
    pub fn page_data(&self, key: &str) -> Option<serde_json::Value> {
        let side_data = self.current_page()?.side_data;
        side_data.get(key)
    }

    /// Every value of the current page's producers, each evaluated independently.
    pub fn all_page_data(&self) -> BTreeMap<String, serde_json::Value> {
        self.current_page()
            .map(|page| page.side_data.values())
            .unwrap_or_default()
    }

    // --- Change notification ---

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Register a hook fired with `(new_page, old_page)` on every page change.
    pub fn on_route_change<F>(&self, hook: F) -> Unsubscribe
    where
        F: Fn(&PageEntry, Option<&PageSnapshot>) + Send + Sync + 'static,
    {
        self.hooks.register(hook)
    }

    /// Subscribe to route changes over a channel.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let current = {
            let state = self.state.lock();
            state.cursor.map(|i| (state.stack[i].clone(), i))
        };
        self.subscriptions.subscribe(config, current)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id)
    }

    // --- Internals ---

    fn lock_ready(&self) -> Result<MutexGuard<'_, StackState>> {
        let state = self.state.lock();
        if !state.initialized {
            return Err(WatchError::NotInitialized);
        }
        Ok(state)
    }

    /// Pop the page being left off the forward trail for hooks.
    fn take_change(&self, state: &mut StackState) -> Result<Option<RouteChange>> {
        let Some(index) = state.cursor else {
            return Ok(None);
        };

        let old = state.forward.pop_back();
        if old.is_some() {
            self.write_forward(state)?;
        }

        Ok(Some(RouteChange {
            page: state.stack[index].clone(),
            index,
            old,
        }))
    }

    fn notify(&self, change: Option<RouteChange>) {
        if let Some(change) = change {
            self.hooks.fire(&change.page, change.old.as_ref());
            self.subscriptions
                .broadcast_change(&change.page, change.index, change.old.as_ref());
        }
    }

    /// Bring the persisted chunks in line with `state.stack`.
    fn sync_chunks(&self, state: &StackState, sync: ChunkSync, old_len: usize) -> Result<()> {
        let size = self.config.chunk_size;
        let plan = chunks::plan(sync, old_len, state.stack.len(), size);

        for chunk in &plan.removals {
            self.storage.remove(&self.keys.stack_chunk(*chunk))?;
        }

        for chunk in &plan.writes {
            let start = chunk * size;
            let end = (start + size).min(state.stack.len());
            self.write(&self.keys.stack_chunk(*chunk), &state.stack[start..end])?;
            tracing::trace!(chunk, entries = end - start, "wrote stack chunk");
        }

        Ok(())
    }

    fn write_cursor(&self, state: &StackState) -> Result<()> {
        let cursor = state.cursor.map_or(-1, |c| c as i64);
        self.write(&self.keys.position(), &cursor)
    }

    fn write_forward(&self, state: &StackState) -> Result<()> {
        self.write(&self.keys.forward_trail(), &state.forward)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = self.config.encoding.encode(value)?;
        self.storage.set(key, &bytes)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.storage.get(key)? {
            Some(bytes) => Ok(Some(self.config.encoding.decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::NavSource;
    use parking_lot::Mutex as PlMutex;
    use serde_json::json;

    fn store_over(storage: &MemoryStorage) -> StackStore {
        let store = StackStore::new(Arc::new(storage.clone()), StackConfig::default());
        store.initialize().unwrap();
        store
    }

    fn at(path: &str) -> Location {
        Location::parse(path).unwrap()
    }

    fn paths(store: &StackStore) -> Vec<String> {
        store.stack().iter().map(|e| e.joined()).collect()
    }

    fn push_all(store: &StackStore, urls: &[&str]) {
        for url in urls {
            store.push(NavData::new(NavSource::Hash), &at(url), None).unwrap();
        }
    }

    #[test]
    fn test_mutators_require_initialize() {
        let storage = MemoryStorage::new();
        let store = StackStore::new(Arc::new(storage), StackConfig::default());

        let result = store.push(NavData::new(NavSource::Enter), &at("/"), None);
        assert!(matches!(result, Err(WatchError::NotInitialized)));
        assert!(matches!(store.mint_nav_tag(), Err(WatchError::NotInitialized)));
    }

    #[test]
    fn test_push_truncates_ahead_of_cursor() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b", "/c"]);

        assert!(store.move_cursor(-1).unwrap());
        assert_eq!(store.current_index(), Some(1));

        store.push(NavData::new(NavSource::Hash), &at("/d"), None).unwrap();
        assert_eq!(paths(&store), vec!["/a", "/b", "/d"]);
        assert_eq!(store.current_index(), Some(2));
    }

    #[test]
    fn test_replace_keeps_cursor() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b"]);

        store
            .replace(NavData::tagged(NavTag(3)), &at("/b2"), None)
            .unwrap();
        assert_eq!(paths(&store), vec!["/a", "/b2"]);
        assert_eq!(store.current_index(), Some(1));
        assert_eq!(store.find_by_tag(NavTag(3)), Some(1));
    }

    #[test]
    fn test_replace_on_empty_stack_records_first_entry() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);

        store
            .replace(NavData::new(NavSource::Enter), &at("/start"), None)
            .unwrap();
        assert_eq!(paths(&store), vec!["/start"]);
        assert_eq!(store.current_index(), Some(0));
    }

    #[test]
    fn test_url_override_used_when_location_differs() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);

        store
            .push(NavData::tagged(NavTag(1)), &at("/old"), Some("/new?tab=2"))
            .unwrap();
        assert_eq!(paths(&store), vec!["/new?tab=2"]);
    }

    #[test]
    fn test_move_cursor_clamps_and_noops() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b", "/c"]);

        assert!(!store.move_cursor(5).unwrap());
        assert!(store.move_cursor(-10).unwrap());
        assert_eq!(store.current_index(), Some(0));
        assert!(!store.move_cursor(-1).unwrap());
        assert!(!store.move_cursor(0).unwrap());
    }

    #[test]
    fn test_move_cursor_extreme_deltas_clamp_to_ends() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b"]);
        store.move_cursor(-1).unwrap();

        assert!(store.move_cursor(i64::MAX).unwrap());
        assert_eq!(store.current_index(), Some(1));

        assert!(store.move_cursor(i64::MIN).unwrap());
        assert_eq!(store.current_index(), Some(0));
        assert!(!store.move_cursor(i64::MIN).unwrap());
    }

    #[test]
    fn test_move_on_empty_stack_is_noop() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        assert!(!store.move_cursor(1).unwrap());
        assert_eq!(store.current_index(), None);
    }

    #[test]
    fn test_remove_range_keeps_endpoints_and_cursor_page() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b", "/c", "/d", "/e"]);

        // Cursor on /e (index 4), remove between /a and /d.
        assert_eq!(store.remove_range(0, 3).unwrap(), 2);
        assert_eq!(paths(&store), vec!["/a", "/d", "/e"]);
        assert_eq!(store.current_page().unwrap().pathname, "/e");

        assert_eq!(store.remove_range(1, 2).unwrap(), 0);
        assert_eq!(store.remove_range(2, 1).unwrap(), 0);
    }

    #[test]
    fn test_forward_trail_capped_oldest_first() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a"]);

        for i in 0..25 {
            let mut snapshot = store.current_page().unwrap().snapshot();
            snapshot.pathname = format!("/p{i}");
            store.append_forward(snapshot).unwrap();
        }

        let trail = store.forward_trail();
        assert_eq!(trail.len(), DEFAULT_FORWARD_LIMIT);
        assert_eq!(trail[0].pathname, "/p5");
        assert_eq!(trail[19].pathname, "/p24");
    }

    #[test]
    fn test_hooks_receive_popped_forward_entry() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a"]);

        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _unsubscribe = store.on_route_change(move |new, old| {
            sink.lock()
                .push((new.pathname.clone(), old.map(|o| o.pathname.clone())));
        });

        store.snapshot_current().unwrap();
        push_all(&store, &["/b"]);
        assert!(store.forward_trail().is_empty());

        // Nothing left on the trail: old page is None.
        assert!(store.move_cursor(-1).unwrap());

        assert_eq!(
            *seen.lock(),
            vec![
                ("/b".to_string(), Some("/a".to_string())),
                ("/a".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_hook_may_read_store() {
        let storage = MemoryStorage::new();
        let store = Arc::new(store_over(&storage));
        let seen = Arc::new(PlMutex::new(None));

        let reader = Arc::clone(&store);
        let sink = Arc::clone(&seen);
        let _unsubscribe = store.on_route_change(move |_, _| {
            *sink.lock() = Some(reader.len());
        });

        push_all(&store, &["/a", "/b"]);
        assert_eq!(*seen.lock(), Some(2));
    }

    #[test]
    fn test_side_data_on_current_page_only() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);

        assert!(matches!(
            store.set_side_data("x", Producer::new(|| Ok(json!(1)))),
            Err(WatchError::EmptyStack)
        ));

        push_all(&store, &["/a"]);
        store
            .set_side_data("scroll", Producer::new(|| Ok(json!(300))))
            .unwrap();
        store
            .set_side_data("broken", Producer::new(|| Err("no form".into())))
            .unwrap();

        assert_eq!(store.page_data("scroll"), Some(json!(300)));
        assert_eq!(store.page_data("broken"), Some(serde_json::Value::Null));

        let all = store.all_page_data();
        assert_eq!(all.len(), 2);

        push_all(&store, &["/b"]);
        assert!(store.all_page_data().is_empty());
    }

    #[test]
    fn test_snapshot_evaluates_side_data() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a"]);
        store
            .set_side_data("title", Producer::new(|| Ok(json!("Inbox"))))
            .unwrap();

        store.snapshot_current().unwrap();
        let trail = store.forward_trail();
        assert_eq!(trail[0].side_data["title"], json!("Inbox"));
    }

    #[test]
    fn test_nav_tags_monotonic_across_reload() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        assert_eq!(store.mint_nav_tag().unwrap(), NavTag(1));
        assert_eq!(store.mint_nav_tag().unwrap(), NavTag(2));

        let reloaded = store_over(&storage);
        assert_eq!(reloaded.peek_nav_tag(), NavTag(3));
        assert_eq!(reloaded.mint_nav_tag().unwrap(), NavTag(3));
    }

    #[test]
    fn test_entry_ids_never_reused() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b", "/c"]);
        store.move_cursor(-2).unwrap();
        push_all(&store, &["/d"]);

        let reloaded = store_over(&storage);
        push_all(&reloaded, &["/e"]);

        let ids: Vec<u64> = reloaded.stack().iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![1, 4, 5]);
    }

    #[test]
    fn test_initialize_twice_is_idempotent() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        push_all(&store, &["/a", "/b"]);

        // Storage changed behind the store's back is not re-read.
        storage.clear();
        store.initialize().unwrap();
        assert_eq!(paths(&store), vec!["/a", "/b"]);
    }

    #[test]
    fn test_stack_chunks_cleaned_after_branch_off() {
        let storage = MemoryStorage::new();
        let store = store_over(&storage);
        let urls: Vec<String> = (0..45).map(|i| format!("/p{i}")).collect();
        for url in &urls {
            store.push(NavData::new(NavSource::Hash), &at(url), None).unwrap();
        }
        assert_eq!(storage.keys_with_prefix("watch-route/PAGE_STACK/").len(), 3);

        store.move_cursor(-40).unwrap();
        push_all(&store, &["/branch"]);

        assert_eq!(store.len(), 6);
        assert_eq!(storage.keys_with_prefix("watch-route/PAGE_STACK/").len(), 1);

        let reloaded = store_over(&storage);
        assert_eq!(paths(&reloaded), paths(&store));
        assert_eq!(reloaded.current_index(), Some(5));
    }

    #[test]
    fn test_reload_with_message_pack() {
        let storage = MemoryStorage::new();
        let config = StackConfig {
            encoding: ChunkEncoding::MessagePack,
            chunk_size: 4,
            ..Default::default()
        };

        let store = StackStore::new(Arc::new(storage.clone()), config.clone());
        store.initialize().unwrap();
        for i in 0..10 {
            let nav = if i % 2 == 0 {
                NavData::tagged(NavTag(i))
            } else {
                NavData::new(NavSource::Hash)
            };
            store.push(nav, &at(&format!("/m{i}#h")), None).unwrap();
        }

        let reloaded = StackStore::new(Arc::new(storage), config);
        reloaded.initialize().unwrap();
        assert_eq!(reloaded.stack(), store.stack());
        assert_eq!(reloaded.current_index(), Some(9));
    }
}
