//! Chunked persistence planning for the page stack.
//!
//! The stack is persisted in fixed-size groups so a mutation only rewrites
//! the groups it touched. Group `k` holds entries `[k * size, (k + 1) * size)`.

use std::collections::BTreeSet;

/// Default number of entries per persisted chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// Describes a change to the stack that needs persisting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkSync {
    /// First modified entry.
    pub index: usize,
    /// Entries dropped from the end of the array by this change.
    pub removed_tail: usize,
    /// Rewrite every chunk from `index`'s through the tail (mid-stack removal).
    pub refresh_tail: bool,
}

impl ChunkSync {
    pub fn at(index: usize) -> Self {
        Self {
            index,
            removed_tail: 0,
            refresh_tail: false,
        }
    }
}

/// Storage operations that bring the chunk cache in line with memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Chunks that no longer exist, removed from storage.
    pub removals: Vec<usize>,
    /// Chunks to rewrite, ascending.
    pub writes: Vec<usize>,
}

/// Chunk index holding entry `index`.
pub fn chunk_of(index: usize, chunk_size: usize) -> usize {
    index / chunk_size
}

/// Plan the storage work for `sync` given the stack length before and
/// after the change.
pub fn plan(sync: ChunkSync, old_len: usize, new_len: usize, chunk_size: usize) -> ChunkPlan {
    let mut plan = ChunkPlan::default();

    let old_tail = old_len.checked_sub(1).map(|i| chunk_of(i, chunk_size));
    let new_tail = new_len.checked_sub(1).map(|i| chunk_of(i, chunk_size));

    if let Some(old_tail) = old_tail {
        let first_gone = new_tail.map_or(0, |t| t + 1);
        plan.removals.extend(first_gone..=old_tail);
    }

    let Some(tail) = new_tail else {
        return plan;
    };

    let in_chunk = chunk_of(sync.index, chunk_size).min(tail);
    let mut writes = BTreeSet::new();

    // Tail membership shifts whenever entries were dropped behind it.
    if sync.removed_tail > 0 && in_chunk != tail {
        writes.insert(tail);
    }

    let last = if sync.refresh_tail { tail } else { in_chunk };
    writes.extend(in_chunk..=last);

    plan.writes = writes.into_iter().collect();
    plan
}
