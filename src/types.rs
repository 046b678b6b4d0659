//! Core types for the page stack.

use crate::error::{Result, WatchError};
use crate::stack::SideData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a page stack entry, unique within a session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl EntryId {
    pub fn next(self) -> Self {
        EntryId(self.0 + 1)
    }
}

/// Tag correlating a native history state object with the call that created it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NavTag(pub u64);

impl fmt::Debug for NavTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavTag({})", self.0)
    }
}

impl fmt::Display for NavTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl NavTag {
    /// First tag handed out in a fresh session.
    pub const FIRST: NavTag = NavTag(1);

    pub fn next(self) -> Self {
        NavTag(self.0 + 1)
    }
}

/// How a page entry came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavSource {
    /// Created by an intercepted `pushState`/`replaceState`.
    History,
    /// Created by a user hash edit the browser reported through `popstate`.
    Hash,
    /// Created by a full page load that matched nothing in the stack.
    Location,
    /// First page of the session.
    Enter,
}

/// Provenance of a page entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavData {
    pub from: NavSource,
    #[serde(rename = "navTagId", default, skip_serializing_if = "Option::is_none")]
    pub nav_tag: Option<NavTag>,
}

impl NavData {
    pub fn new(from: NavSource) -> Self {
        Self { from, nav_tag: None }
    }

    pub fn tagged(tag: NavTag) -> Self {
        Self {
            from: NavSource::History,
            nav_tag: Some(tag),
        }
    }
}

/// Raw URL components, following the browser convention of keeping the
/// leading `?` on `search` and `#` on `hash` (both empty when absent).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    pub fn new(
        pathname: impl Into<String>,
        search: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            pathname: pathname.into(),
            search: search.into(),
            hash: hash.into(),
        }
    }

    /// Parse a path-and-after url (`/a/b?x=1#top`).
    pub fn parse(url: &str) -> Result<Self> {
        Self::resolve(&Location::new("/", "", ""), url)
    }

    /// `pathname + search + hash`, the string compared during reconciliation.
    pub fn joined(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }

    /// Resolve a url handed to `pushState`/`replaceState` against `base`.
    pub fn resolve(base: &Location, url: &str) -> Result<Self> {
        if url.is_empty() {
            return Ok(base.clone());
        }

        let rest = match strip_origin(url) {
            Some(Some(rest)) => rest,
            Some(None) => return Err(WatchError::InvalidUrl(url.to_string())),
            None => url,
        };

        let (before_hash, hash) = split_at_char(rest, '#');
        let (path, search) = split_at_char(before_hash, '?');

        let pathname = if path.is_empty() {
            base.pathname.clone()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            let dir = match base.pathname.rfind('/') {
                Some(i) => &base.pathname[..=i],
                None => "/",
            };
            format!("{dir}{path}")
        };

        // "#x" keeps the current query string, anything else replaces it.
        let search = if path.is_empty() && search.is_empty() && !hash.is_empty() {
            base.search.clone()
        } else {
            normalize_marker(search)
        };

        Ok(Self {
            pathname,
            search,
            hash: normalize_marker(hash),
        })
    }

    /// Location to record for a page: `self`, unless `url_override` names a
    /// different page (neither pathname contains the other).
    pub fn with_override(&self, url_override: Option<&str>) -> Result<Self> {
        match url_override {
            Some(url)
                if !url.is_empty()
                    && !self.pathname.contains(url)
                    && !url.contains(self.pathname.as_str()) =>
            {
                Self::resolve(self, url)
            }
            _ => Ok(self.clone()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// For an absolute url (`scheme://host...`), the part after the host.
/// `None` when `url` has no scheme; `Some(None)` when the host is missing
/// or nothing follows it.
fn strip_origin(url: &str) -> Option<Option<&str>> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    let valid_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return None;
    }

    let after = url[colon + 1..].strip_prefix("//")?;
    match after.find(|c: char| matches!(c, '/' | '?' | '#')) {
        Some(0) | None => Some(None),
        Some(i) => Some(Some(&after[i..])),
    }
}

fn split_at_char(s: &str, c: char) -> (&str, &str) {
    match s.find(c) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

/// A bare `?` or `#` reads back as empty from `location`.
fn normalize_marker(part: &str) -> String {
    if part.len() == 1 {
        String::new()
    } else {
        part.to_string()
    }
}

/// One logical page in the stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub id: EntryId,
    pub pathname: String,
    pub hash: String,
    pub search: String,
    #[serde(rename = "navData")]
    pub nav_data: NavData,
    /// Never persisted; empty again after a reload.
    #[serde(skip)]
    pub side_data: SideData,
}

impl PageEntry {
    pub fn new(id: EntryId, location: Location, nav_data: NavData) -> Self {
        Self {
            id,
            pathname: location.pathname,
            hash: location.hash,
            search: location.search,
            nav_data,
            side_data: SideData::default(),
        }
    }

    pub fn location(&self) -> Location {
        Location::new(&self.pathname, &self.search, &self.hash)
    }

    pub fn joined(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }

    pub fn nav_tag(&self) -> Option<NavTag> {
        self.nav_data.nav_tag
    }

    /// True for entries that can only be found by url, not by tag.
    pub fn is_untagged(&self) -> bool {
        self.nav_data.nav_tag.is_none()
    }

    /// Untagged entry whose url equals `joined`.
    pub fn matches_untagged(&self, joined: &str) -> bool {
        self.is_untagged() && self.joined() == joined
    }

    /// Freeze this entry for the forward trail, evaluating its side data.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            pathname: self.pathname.clone(),
            hash: self.hash.clone(),
            search: self.search.clone(),
            nav_data: self.nav_data,
            side_data: self.side_data.values(),
        }
    }
}

/// Immutable copy of a page taken just before the cursor leaves it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub pathname: String,
    pub hash: String,
    pub search: String,
    #[serde(rename = "navData")]
    pub nav_data: NavData,
    /// Producer results at snapshot time (`null` where a producer failed).
    #[serde(rename = "sideData", default)]
    pub side_data: BTreeMap<String, serde_json::Value>,
}

impl PageSnapshot {
    pub fn location(&self) -> Location {
        Location::new(&self.pathname, &self.search, &self.hash)
    }
}
