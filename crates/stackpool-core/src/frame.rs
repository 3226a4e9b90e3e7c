//! Frames: one entry of the pool's scope stack.
//!
//! A frame bumps a cursor through one block at a time. A frame pushed on
//! top of a frame with enough leftover room is *embedded*: its header is
//! placed at the parent's cursor and it keeps bumping the parent's block,
//! owning no block of its own until it has to grow.

use crate::handle::{BlockId, FrameHandle};

/// Bytes reserved for a frame header inside a block.
///
/// Four machine words: owned-chain head, previous frame, cursor, free
/// count.
pub const FRAME_HEADER_SIZE: usize = 4 * std::mem::size_of::<usize>();

/// Bump state of one frame.
#[derive(Clone, Debug)]
pub(crate) struct Frame {
    /// Push serial, unique within the pool.
    serial: u64,
    /// Stack slot of the frame beneath this one.
    prev: Option<usize>,
    /// Head of the chain of blocks this frame acquired itself.
    blocks: Option<BlockId>,
    /// Number of blocks in the owned chain.
    owned: usize,
    /// Whether the header lives in the parent's block.
    embedded: bool,
    /// Block currently being bumped. May belong to an ancestor.
    block: BlockId,
    /// Next free offset within `block`.
    cursor: usize,
    /// Bytes left in `block` after `cursor`.
    free: usize,
}

impl Frame {
    /// A frame whose header opens a freshly acquired block.
    ///
    /// `usable` must exceed [`FRAME_HEADER_SIZE`]; the pool config
    /// guarantees this for every block it asks for on push.
    pub(crate) fn with_block(serial: u64, prev: Option<usize>, block: BlockId, usable: usize) -> Self {
        Self {
            serial,
            prev,
            blocks: Some(block),
            owned: 1,
            embedded: false,
            block,
            cursor: FRAME_HEADER_SIZE,
            free: usable.saturating_sub(FRAME_HEADER_SIZE),
        }
    }

    /// A frame whose header sits at `parent`'s cursor.
    ///
    /// The parent is suspended while this frame lives and is not touched:
    /// the header and everything bumped after it are reclaimed for the
    /// parent simply by this frame going away.
    pub(crate) fn embedded(serial: u64, prev: usize, parent: &Frame) -> Self {
        Self {
            serial,
            prev: Some(prev),
            blocks: None,
            owned: 0,
            embedded: true,
            block: parent.block,
            cursor: parent.cursor + FRAME_HEADER_SIZE,
            free: parent.free - FRAME_HEADER_SIZE,
        }
    }

    /// Bump `size` bytes from the current block.
    ///
    /// Returns the block and offset of the reserved range, or `None` if
    /// fewer than `size` bytes are left.
    pub(crate) fn bump(&mut self, size: usize) -> Option<(BlockId, usize)> {
        if size > self.free {
            return None;
        }
        let offset = self.cursor;
        self.cursor += size;
        self.free -= size;
        Some((self.block, offset))
    }

    /// Make a newly acquired block the head of the owned chain and move
    /// the cursor to its start.
    pub(crate) fn adopt(&mut self, block: BlockId, usable: usize) {
        self.blocks = Some(block);
        self.owned += 1;
        self.block = block;
        self.cursor = 0;
        self.free = usable;
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub(crate) fn blocks(&self) -> Option<BlockId> {
        self.blocks
    }

    pub(crate) fn owned(&self) -> usize {
        self.owned
    }

    pub(crate) fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub(crate) fn block(&self) -> BlockId {
        self.block
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn free(&self) -> usize {
        self.free
    }

    pub(crate) fn handle(&self, index: usize) -> FrameHandle {
        FrameHandle::new(index, self.serial)
    }
}

/// Point-in-time view of one frame, for inspection and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
    /// The frame described.
    pub handle: FrameHandle,
    /// Blocks the frame acquired itself.
    pub owned_blocks: usize,
    /// Usable bytes across the owned blocks.
    pub owned_bytes: usize,
    /// Bytes left in the block the frame is bumping.
    pub free_bytes: usize,
    /// Bytes already bumped in that block, frame headers included.
    pub cursor: usize,
    /// The block being bumped.
    pub block: BlockId,
    /// Whether the frame's header lives in its parent's block.
    pub embedded: bool,
}
