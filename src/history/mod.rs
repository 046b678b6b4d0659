//! Native history primitives the reconciler wraps.
//!
//! [`NativeHistory`] is the five mutators plus the two readers (`state`,
//! `location`) of a browser's `window.history`/`window.location`. The
//! reconciler wraps an implementation in an interception decorator and
//! receives `popstate` events as [`PopState`] values.

mod memory;

pub use memory::MemoryHistory;

use crate::types::{Location, NavTag};
use serde_json::{Map, Value};

/// Field injected into native history state objects.
pub const TAG_FIELD: &str = "watchRouteID";

/// The browser's session history for one tab.
pub trait NativeHistory: Send + Sync {
    fn back(&self);

    fn forward(&self);

    fn go(&self, delta: i64);

    fn push_state(&self, state: Value, title: &str, url: Option<&str>);

    fn replace_state(&self, state: Value, title: &str, url: Option<&str>);

    /// `history.state` of the current entry (`Value::Null` if none).
    fn state(&self) -> Value;

    /// `location` of the current entry.
    fn location(&self) -> Location;
}

/// A `popstate` event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopState {
    pub state: Value,
}

impl PopState {
    pub fn new(state: Value) -> Self {
        Self { state }
    }

    pub fn nav_tag(&self) -> Option<NavTag> {
        read_tag(&self.state)
    }
}

/// Inject `tag` into a caller's state: merged into plain objects, anything
/// else is wrapped as `{ "data": state, "watchRouteID": tag }`.
pub fn tag_state(state: Value, tag: NavTag) -> Value {
    let mut object = match state {
        Value::Object(object) => object,
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("data".to_string(), other);
            wrapped
        }
    };
    object.insert(TAG_FIELD.to_string(), Value::from(tag.0));
    Value::Object(object)
}

/// Nav tag carried by a native state object, if any.
pub fn read_tag(state: &Value) -> Option<NavTag> {
    state.get(TAG_FIELD).and_then(Value::as_u64).map(NavTag)
}
