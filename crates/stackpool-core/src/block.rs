//! Blocks and the block stack.
//!
//! A [`Block`] is one buffer obtained from the pool's [`Strategy`]. The
//! [`BlockStack`] holds every live block in acquisition order. Only the top
//! frame ever acquires blocks, so the blocks owned by any frame are always
//! the most recent ones on the stack, and popping a frame's chain is the
//! same as popping the tail of the block stack.

use tracing::{debug, warn};

use crate::error::PoolError;
use crate::handle::BlockId;
use crate::strategy::Strategy;

/// A contiguous buffer obtained from a strategy.
pub struct Block {
    /// Backing storage. Its length is the usable size.
    data: Box<[u8]>,
    /// Older block in the same frame's chain. Never crosses frames.
    prev: Option<BlockId>,
    /// Size originally asked of the strategy.
    requested: usize,
}

impl Block {
    /// Bytes available for bumping. At least [`Block::requested`].
    pub fn usable(&self) -> usize {
        self.data.len()
    }

    /// Size originally asked of the strategy.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Older block in the owning frame's chain.
    pub fn prev(&self) -> Option<BlockId> {
        self.prev
    }

    pub(crate) fn bytes(&self, range: std::ops::Range<usize>) -> Option<&[u8]> {
        self.data.get(range)
    }

    pub(crate) fn bytes_mut(&mut self, range: std::ops::Range<usize>) -> Option<&mut [u8]> {
        self.data.get_mut(range)
    }
}

/// Live blocks in acquisition order.
#[derive(Default)]
pub struct BlockStack {
    blocks: Vec<Block>,
}

impl BlockStack {
    /// Create an empty block stack.
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Acquire a block of at least `requested` bytes and push it.
    ///
    /// `prev` is the current head of the acquiring frame's own chain. On
    /// failure nothing is pushed. A buffer shorter than `requested` breaks
    /// the strategy contract: it is handed straight back and the call fails.
    pub fn acquire<S: Strategy + ?Sized>(
        &mut self,
        strategy: &mut S,
        requested: usize,
        prev: Option<BlockId>,
    ) -> Result<BlockId, PoolError> {
        let data = strategy
            .allocate(requested)
            .ok_or(PoolError::AllocationFailure { requested })?;
        if data.len() < requested {
            warn!(
                requested,
                usable = data.len(),
                "strategy returned a block smaller than requested"
            );
            strategy.release(data);
            return Err(PoolError::AllocationFailure { requested });
        }

        let id = BlockId(self.blocks.len());
        debug!(%id, requested, usable = data.len(), "acquired block");
        self.blocks.push(Block {
            data,
            prev,
            requested,
        });
        Ok(id)
    }

    /// Release the chain starting at `head`, newest to oldest.
    ///
    /// Returns the number of blocks released.
    pub fn release_chain<S: Strategy + ?Sized>(
        &mut self,
        strategy: &mut S,
        head: Option<BlockId>,
    ) -> usize {
        let mut released = 0;
        let mut next = head;
        while let Some(id) = next {
            // A frame's chain is always the tail of the stack.
            debug_assert_eq!(id.0 + 1, self.blocks.len(), "chain head is not on top");
            let Some(block) = self.blocks.pop() else {
                break;
            };
            next = block.prev;
            debug!(%id, usable = block.usable(), "released block");
            strategy.release(block.data);
            released += 1;
        }
        released
    }

    /// Release every block, newest first.
    pub fn release_all<S: Strategy + ?Sized>(&mut self, strategy: &mut S) -> usize {
        let count = self.blocks.len();
        while let Some(block) = self.blocks.pop() {
            strategy.release(block.data);
        }
        count
    }

    /// Look up a live block.
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id.0)
    }

    /// Usable size of a live block, or 0 if `id` is not live.
    pub fn usable(&self, id: BlockId) -> usize {
        self.get(id).map_or(0, Block::usable)
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no blocks are live.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total usable bytes across live blocks.
    pub fn usable_bytes(&self) -> usize {
        self.blocks.iter().map(Block::usable).sum()
    }

    /// Walk a chain from `head` towards older blocks.
    pub fn chain(&self, head: Option<BlockId>) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        std::iter::successors(head.and_then(|id| self.get(id).map(|b| (id, b))), |(_, b)| {
            b.prev.and_then(|id| self.get(id).map(|b| (id, b)))
        })
    }
}
