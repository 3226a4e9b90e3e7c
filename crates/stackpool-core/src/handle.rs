//! Frame and allocation handles.
//!
//! Handles are small `Copy` values. A [`FrameHandle`] identifies one push
//! of one frame: the `serial` makes two frames that occupy the same stack
//! slot at different times distinguishable, which is what lets the pool
//! detect stale [`Allocation`]s in O(1).

use std::fmt;
use std::ops::Range;

/// Identity of a pushed frame.
///
/// Returned by `push` and by `pop`; comparing the two detects an
/// unbalanced stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle {
    /// Zero-based stack slot (0 is the bottom frame).
    pub(crate) index: usize,
    /// Unique per push within one pool.
    pub(crate) serial: u64,
}

impl FrameHandle {
    pub(crate) fn new(index: usize, serial: u64) -> Self {
        Self { index, serial }
    }

    /// Stack slot of the frame (0 is the bottom frame).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Push serial, unique within the pool that issued it.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}@{}", self.serial, self.index)
    }
}

/// Index of a block in the pool's block stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Position of the block in acquisition order among live blocks.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block{}", self.0)
    }
}

/// Location of a bump allocation.
///
/// Resolve it to bytes through the pool that issued it. Once the frame
/// that made the allocation is popped, resolution fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub(crate) frame: FrameHandle,
    pub(crate) block: BlockId,
    pub(crate) offset: usize,
    pub(crate) len: usize,
}

impl Allocation {
    /// The frame the allocation was made in.
    pub fn frame(&self) -> FrameHandle {
        self.frame
    }

    /// The block holding the bytes.
    pub fn block(&self) -> BlockId {
        self.block
    }

    /// Byte offset within the block.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte range within the block.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocation({}, {}, off={}, len={})",
            self.frame, self.block, self.offset, self.len
        )
    }
}
