//! Value encodings for persisted page stack data.

use crate::error::{Result, WatchError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// How values are encoded before they reach [`super::SessionStorage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkEncoding {
    /// UTF-8 JSON text, what a browser `sessionStorage` can hold.
    Json,
    /// Compact MessagePack with named fields.
    MessagePack,
}

impl Default for ChunkEncoding {
    fn default() -> Self {
        ChunkEncoding::Json
    }
}

impl ChunkEncoding {
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            ChunkEncoding::Json => Ok(serde_json::to_vec(value)?),
            // Named fields so optional/skipped fields decode back correctly.
            ChunkEncoding::MessagePack => Ok(rmp_serde::to_vec_named(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            ChunkEncoding::Json => serde_json::from_slice(bytes)
                .map_err(|e| WatchError::Deserialization(e.to_string())),
            ChunkEncoding::MessagePack => Ok(rmp_serde::from_slice(bytes)?),
        }
    }
}
