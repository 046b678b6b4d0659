//! The page stack and its persistence.
//!
//! The stack is the single source of truth for "where am I": an ordered
//! list of pages, a cursor, a capped trail of pages recently left, and the
//! nav tag counter. Storage is a cache of it, rewritten chunk by chunk
//! after every mutation.

pub mod chunks;
mod side_data;
mod store;

pub use chunks::{ChunkPlan, ChunkSync, DEFAULT_CHUNK_SIZE};
pub use side_data::{Produced, Producer, ProducerError, SideData};
pub use store::{StackConfig, StackStore, DEFAULT_FORWARD_LIMIT, DEFAULT_NAMESPACE};
