//! Browser bindings (feature `web`).
//!
//! Everything here talks to the global `window` on each call, so the types
//! hold no JS handles and satisfy the `Send + Sync` bounds of the traits
//! they implement. Outside a browser the calls log and do nothing.

use crate::error::{Result, WatchError};
use crate::history::{NativeHistory, PopState};
use crate::reconciler::Reconciler;
use crate::scheduler::{Scheduler, Task};
use crate::storage::SessionStorage;
use crate::types::Location;
use serde_json::Value;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

fn browser_error(context: &str, e: JsValue) -> WatchError {
    WatchError::Browser(format!("{context}: {e:?}"))
}

fn window() -> Result<web_sys::Window> {
    web_sys::window().ok_or_else(|| WatchError::Browser("no global window".to_string()))
}

fn to_js(value: &Value) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|text| js_sys::JSON::parse(&text).ok())
        .unwrap_or(JsValue::NULL)
}

fn from_js(value: &JsValue) -> Value {
    if value.is_undefined() || value.is_null() {
        return Value::Null;
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|text| text.as_string())
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(Value::Null)
}

/// `window.history` and `window.location`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserHistory;

impl BrowserHistory {
    fn with_history<F>(&self, op: &str, f: F)
    where
        F: FnOnce(&web_sys::History) -> std::result::Result<(), JsValue>,
    {
        let result = window()
            .and_then(|w| w.history().map_err(|e| browser_error("history", e)))
            .and_then(|history| f(&history).map_err(|e| browser_error(op, e)));
        if let Err(e) = result {
            tracing::error!(op, error = %e, "native history call failed");
        }
    }
}

impl NativeHistory for BrowserHistory {
    fn back(&self) {
        self.with_history("back", |h| h.back())
    }

    fn forward(&self) {
        self.with_history("forward", |h| h.forward())
    }

    fn go(&self, delta: i64) {
        let delta = delta.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        self.with_history("go", |h| h.go_with_delta(delta))
    }

    fn push_state(&self, state: Value, title: &str, url: Option<&str>) {
        self.with_history("pushState", |h| h.push_state_with_url(&to_js(&state), title, url))
    }

    fn replace_state(&self, state: Value, title: &str, url: Option<&str>) {
        self.with_history("replaceState", |h| {
            h.replace_state_with_url(&to_js(&state), title, url)
        })
    }

    fn state(&self) -> Value {
        window()
            .and_then(|w| w.history().map_err(|e| browser_error("history", e)))
            .and_then(|h| h.state().map_err(|e| browser_error("history.state", e)))
            .map(|state| from_js(&state))
            .unwrap_or(Value::Null)
    }

    fn location(&self) -> Location {
        let read = || -> Result<Location> {
            let location = window()?.location();
            Ok(Location::new(
                location.pathname().map_err(|e| browser_error("pathname", e))?,
                location.search().map_err(|e| browser_error("search", e))?,
                location.hash().map_err(|e| browser_error("hash", e))?,
            ))
        };
        read().unwrap_or_else(|e| {
            tracing::error!(error = %e, "location unreadable");
            Location::new("/", "", "")
        })
    }
}

/// `window.sessionStorage`. Values must be UTF-8, so use JSON encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSessionStorage;

impl BrowserSessionStorage {
    fn storage(&self) -> Result<web_sys::Storage> {
        window()?
            .session_storage()
            .map_err(|e| browser_error("sessionStorage", e))?
            .ok_or_else(|| WatchError::Browser("sessionStorage unavailable".to_string()))
    }
}

impl SessionStorage for BrowserSessionStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .storage()?
            .get_item(key)
            .map_err(|e| browser_error("getItem", e))?;
        Ok(value.map(String::into_bytes))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(value)
            .map_err(|e| WatchError::Serialization(format!("sessionStorage value not UTF-8: {e}")))?;
        self.storage()?
            .set_item(key, text)
            .map_err(|e| browser_error("setItem", e))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage()?
            .remove_item(key)
            .map_err(|e| browser_error("removeItem", e))
    }
}

/// Runs deferred tasks with `setTimeout`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn defer(&self, delay: Duration, task: Task) {
        let callback = Closure::once_into_js(move || task());
        let millis = delay.as_millis().min(i32::MAX as u128) as i32;
        let result = window().and_then(|w| {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                millis,
            )
            .map_err(|e| browser_error("setTimeout", e))
        });
        if let Err(e) = result {
            tracing::error!(error = %e, "deferred task dropped");
        }
    }
}

/// Routes `popstate` events to a reconciler while alive.
pub struct PopStateListener {
    callback: Closure<dyn FnMut(web_sys::PopStateEvent)>,
}

impl PopStateListener {
    pub fn attach(reconciler: Reconciler) -> Result<Self> {
        let callback = Closure::<dyn FnMut(web_sys::PopStateEvent)>::new(
            move |event: web_sys::PopStateEvent| {
                let event = PopState::new(from_js(&event.state()));
                if let Err(e) = reconciler.on_popstate(&event) {
                    tracing::error!(error = %e, "popstate not reconciled");
                }
            },
        );

        window()?
            .add_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref())
            .map_err(|e| browser_error("addEventListener", e))?;

        Ok(Self { callback })
    }
}

impl Drop for PopStateListener {
    fn drop(&mut self) {
        if let Ok(window) = window() {
            let listener = self.callback.as_ref().unchecked_ref();
            let _ = window.remove_event_listener_with_callback("popstate", listener);
        }
    }
}
