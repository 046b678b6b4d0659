//! Session-scoped key/value storage the page stack persists into.
//!
//! The stack never talks to a concrete backend. Everything goes through
//! [`SessionStorage`], which mirrors the browser's `sessionStorage`:
//! synchronous, scoped to one tab's session, shared by every page load in
//! that session.
//!
//! Backends:
//! - [`MemoryStorage`]: shared in-process map (tests, simulated reloads)
//! - [`FileStorage`]: one checksummed file per key in a locked directory
//! - `web::BrowserSessionStorage` (feature `web`): `window.sessionStorage`

mod codec;
#[cfg(not(target_arch = "wasm32"))]
mod file;
mod memory;

pub use codec::ChunkEncoding;
#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Synchronous session storage primitives.
pub trait SessionStorage: Send + Sync {
    /// Read a value, `None` if the key was never set or has been removed.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Namespaced storage keys used by the page stack.
#[derive(Clone, Debug)]
pub struct StorageKeys {
    namespace: String,
}

impl StorageKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}/{}", self.namespace, name)
    }

    pub fn forward_trail(&self) -> String {
        self.key("PAGE_FORWARD")
    }

    /// Key of stack chunk `index` (entries `[index * size, (index + 1) * size)`).
    pub fn stack_chunk(&self, index: usize) -> String {
        format!("{}/PAGE_STACK/{}", self.namespace, index)
    }

    pub fn position(&self) -> String {
        self.key("PAGE_POSITION")
    }

    pub fn nav_tag(&self) -> String {
        self.key("HISTORY_STATE_ID")
    }

    pub fn entry_id(&self) -> String {
        self.key("ENTRY_ID")
    }
}
