//! Workloads shared by the stackpool benchmarks and examples.
//!
//! - [`build_list`]: bump-allocate a singly linked list inside the active
//!   frame, each node storing the location of its predecessor
//! - [`scoped_rounds`]: repeat a list build inside a fresh frame per round
//! - [`node_link`]: decode the predecessor link stored in a node

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use stackpool_core::{Allocation, Pool, PoolError, Strategy};
use tracing::debug;

/// Size of one list node: two little-endian `u64`s, the block index and
/// offset of the previous node (`u64::MAX` for none).
pub const NODE_SIZE: usize = 16;

const NIL: u64 = u64::MAX;

/// Append `len` nodes to the active frame and return the tail.
///
/// Returns `None` for an empty list.
pub fn build_list<S: Strategy>(
    pool: &mut Pool<S>,
    len: usize,
) -> Result<Option<Allocation>, PoolError> {
    let mut tail: Option<Allocation> = None;
    for _ in 0..len {
        let node = pool.allocate(NODE_SIZE)?;
        let (block, offset) = match &tail {
            Some(prev) => (prev.block().index() as u64, prev.offset() as u64),
            None => (NIL, NIL),
        };
        let bytes = pool.get_mut(&node)?;
        bytes[..8].copy_from_slice(&block.to_le_bytes());
        bytes[8..].copy_from_slice(&offset.to_le_bytes());
        tail = Some(node);
    }
    Ok(tail)
}

/// Decode a node's predecessor as `(block index, offset)`.
///
/// Returns `None` for the head of the list or a slice that is not a node.
pub fn node_link(node: &[u8]) -> Option<(usize, usize)> {
    if node.len() != NODE_SIZE {
        return None;
    }
    let block = read_u64(&node[..8]);
    let offset = read_u64(&node[8..]);
    if block == NIL {
        return None;
    }
    Some((usize::try_from(block).ok()?, usize::try_from(offset).ok()?))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

/// Run `rounds` frames, each building a list of `len` nodes.
///
/// Each round pops its own frame before the next begins, so a pool that
/// starts empty is empty on return. A mismatched pop is reported as
/// `FrameMismatch`.
pub fn scoped_rounds<S: Strategy>(
    pool: &mut Pool<S>,
    rounds: usize,
    len: usize,
) -> Result<(), PoolError> {
    for round in 0..rounds {
        let frame = pool.push()?;
        build_list(pool, len)?;
        debug!(
            round,
            %frame,
            blocks = pool.block_count(),
            reserved = pool.reserved_bytes(),
            "round built"
        );
        pool.pop_expect(frame)?;
    }
    Ok(())
}
