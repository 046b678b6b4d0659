//! Integration tests for persisting the page stack across page loads.

mod common;

use common::Browser;
use route_watch::{
    ChunkEncoding, FileStorage, MemoryStorage, NativeHistory, NavData, NavSource, Reconciliation,
    SessionStorage, WatchConfig, WatchError,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn push_many(browser: &mut Browser, count: usize) {
    let history = browser.watch.history();
    for i in 0..count {
        let url = format!("/item/{i}?page={}#row", i / 10);
        history.push_state(json!({ "i": i }), "", Some(&url));
        browser.settle();
    }
}

/// What survives a reload: everything except side data.
fn persisted_view(browser: &Browser) -> Vec<(String, String, String, NavData)> {
    browser
        .watch
        .stack()
        .into_iter()
        .map(|e| (e.pathname, e.search, e.hash, e.nav_data))
        .collect()
}

#[test]
fn test_round_trip_across_chunks() {
    let mut browser = Browser::open("/start");
    browser.load_page();
    push_many(&mut browser, 44);
    assert_eq!(browser.watch.stack().len(), 45);

    let before = persisted_view(&browser);
    browser.native.reload();
    assert_eq!(browser.settle(), vec![Reconciliation::Unchanged]);

    assert_eq!(persisted_view(&browser), before);
    assert_eq!(browser.cursor(), Some(44));
}

#[test]
fn test_round_trip_message_pack() {
    let config = WatchConfig {
        encoding: ChunkEncoding::MessagePack,
        chunk_size: 7,
        ..Default::default()
    };
    let mut browser = Browser::with_config("/start", config);
    browser.load_page();
    push_many(&mut browser, 30);

    browser.watch.history().go(-12);
    browser.settle();
    let before = persisted_view(&browser);

    browser.native.reload();
    browser.settle();
    assert_eq!(persisted_view(&browser), before);
    assert_eq!(browser.cursor(), Some(18));
}

#[test]
fn test_branch_off_survives_reload() {
    let mut browser = Browser::open("/start");
    browser.load_page();
    push_many(&mut browser, 44);

    browser.watch.history().go(-40);
    browser.settle();
    browser
        .watch
        .history()
        .push_state(json!({}), "", Some("/branch"));
    browser.settle();
    assert_eq!(browser.watch.stack().len(), 6);

    browser.native.reload();
    browser.settle();
    assert_eq!(browser.watch.stack().len(), 6);
    assert_eq!(browser.watch.current_page().unwrap().pathname, "/branch");
}

#[test]
fn test_forward_trail_persisted() {
    let storage = MemoryStorage::new();
    let mut browser = Browser::with_storage("/a", Arc::new(storage.clone()), WatchConfig::default());
    browser.load_page();

    // A snapshot nobody consumed yet: the traversal is still pending.
    browser
        .watch
        .set_page_data("scroll", || Ok(json!(42)))
        .unwrap();
    browser.watch.store().snapshot_current().unwrap();
    assert_eq!(browser.watch.forward_trail().len(), 1);

    browser.load_page();
    let trail = browser.watch.forward_trail();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].pathname, "/a");
    assert_eq!(trail[0].side_data["scroll"], json!(42));
    assert!(storage.contains("watch-route/PAGE_FORWARD"));
}

#[test]
fn test_namespaces_are_independent() {
    let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::new());
    let mut first = Browser::with_storage("/a", Arc::clone(&storage), WatchConfig::default());
    first.load_page();

    let config = WatchConfig {
        namespace: "other-app".to_string(),
        ..Default::default()
    };
    let mut second = Browser::with_storage("/z", storage, config);
    assert_eq!(
        second.load_page(),
        Reconciliation::Pushed {
            index: 0,
            source: NavSource::Enter
        }
    );
    assert_eq!(second.paths(), vec!["/z"]);
    assert_eq!(first.paths(), vec!["/a"]);
}

#[test]
fn test_file_storage_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session");

    let before = {
        let storage = Arc::new(FileStorage::open(&path).unwrap());
        let mut browser = Browser::with_storage("/home", storage, WatchConfig::default());
        browser.load_page();
        push_many(&mut browser, 25);
        persisted_view(&browser)
    };

    // The directory lock is released with the last handle.
    let storage = Arc::new(FileStorage::open(&path).unwrap());
    let mut browser = Browser::with_storage("/home", storage, WatchConfig::default());
    browser.native.navigate("/item/24?page=2#row").unwrap();
    browser.native.take_load();

    // Untagged url matching no neighbor: recorded as a fresh navigation.
    assert_eq!(
        browser.load_page(),
        Reconciliation::Pushed {
            index: 26,
            source: NavSource::Location
        }
    );
    assert_eq!(persisted_view(&browser)[..26], before[..]);
}

#[test]
fn test_file_storage_locked_while_open() {
    let dir = TempDir::new().unwrap();
    let _held = FileStorage::open(dir.path()).unwrap();

    assert!(matches!(
        FileStorage::open(dir.path()),
        Err(WatchError::Locked)
    ));
}

#[test]
fn test_corrupt_chunk_fails_startup_until_repaired() {
    let storage = MemoryStorage::new();
    let mut browser = Browser::with_storage("/a", Arc::new(storage.clone()), WatchConfig::default());
    browser.load_page();

    storage.set("watch-route/PAGE_STACK/0", b"{ not json").unwrap();
    let reloaded = Browser::with_storage("/a", Arc::new(storage.clone()), WatchConfig::default());
    assert!(matches!(
        reloaded.watch.initialize(),
        Err(WatchError::Deserialization(_))
    ));

    // Startup is retried once storage is usable again.
    storage.remove("watch-route/PAGE_STACK/0").unwrap();
    assert_eq!(
        reloaded.watch.initialize().unwrap(),
        Reconciliation::Pushed {
            index: 0,
            source: NavSource::Enter
        }
    );
}
