//! The pool: frame stack, growth policy, and strategy orchestration.
//!
//! [`Pool`] is the top-level type. The lifecycle is:
//! 1. `push()`: open a frame (embedded in the parent's leftover room when
//!    it fits, otherwise in a fresh block)
//! 2. `allocate()`: bump the top frame's cursor, growing into a new block
//!    owned by that frame when the current one is exhausted
//! 3. `pop()`: close the top frame and release every block it acquired
//! 4. `destroy()`: tear down once the stack is empty
//!
//! # Memory layout
//!
//! ```text
//! blocks: [b0 | b1 | b2 | b3]          acquisition order
//!           │    │    └──┴── frame 2 chain (b3.prev = b2)
//!           │    └────────── frame 1 chain
//!           └─────────────── frame 0 chain; frame 0' embedded in b0
//! frames: [f0, f0', f1, f2]            f2 is ACTIVE
//! ```

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::block::BlockStack;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::frame::{Frame, FrameStats, FRAME_HEADER_SIZE};
use crate::handle::{Allocation, FrameHandle};
use crate::strategy::{HeapStrategy, Strategy};

/// Frame slots kept inline before the stack spills to the heap.
const INLINE_FRAMES: usize = 8;

/// Lifetime counters for one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Frames pushed.
    pub pushes: u64,
    /// Pushes that embedded the frame in the parent's block.
    pub embedded_pushes: u64,
    /// Frames popped.
    pub pops: u64,
    /// Successful `allocate` calls.
    pub allocations: u64,
    /// Allocations that had to acquire a new block.
    pub growths: u64,
    /// Blocks obtained from the strategy.
    pub blocks_acquired: u64,
    /// Blocks handed back to the strategy.
    pub blocks_released: u64,
    /// Usable bytes across all blocks ever acquired.
    pub bytes_acquired: u64,
}

/// A stack-discipline memory pool.
///
/// Allocations are bump-pointer fast and are never freed individually;
/// popping a frame releases everything allocated since the matching push.
///
/// The pool is single-owner: every mutating operation takes `&mut self`.
pub struct Pool<S: Strategy = HeapStrategy> {
    config: PoolConfig,
    strategy: S,
    frames: SmallVec<[Frame; INLINE_FRAMES]>,
    blocks: BlockStack,
    next_serial: u64,
    stats: PoolStats,
}

impl Pool<HeapStrategy> {
    /// Create a pool with default configuration backed by the heap.
    pub fn new() -> Self {
        Self::with_strategy(HeapStrategy)
    }

    /// Create a heap-backed pool with the given configuration.
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        Self::with_config_and_strategy(config, HeapStrategy)
    }
}

impl Default for Pool<HeapStrategy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Strategy> Pool<S> {
    /// Create a pool with default configuration and the given strategy.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            config: PoolConfig::default(),
            strategy,
            frames: SmallVec::new(),
            blocks: BlockStack::new(),
            next_serial: 1,
            stats: PoolStats::default(),
        }
    }

    /// Create a pool with the given configuration and strategy.
    ///
    /// Returns `Err(PoolError::InvalidConfig)` if `config` fails validation.
    pub fn with_config_and_strategy(config: PoolConfig, strategy: S) -> Result<Self, PoolError> {
        config.validate()?;
        let mut pool = Self::with_strategy(strategy);
        pool.config = config;
        Ok(pool)
    }

    /// Tear the pool down.
    ///
    /// Fails with `StackImbalance` if frames are still live. Blocks held by
    /// those frames are returned to the strategy either way.
    pub fn destroy(mut self) -> Result<(), PoolError> {
        let depth = self.frames.len();
        self.release_everything();
        if depth > 0 {
            return Err(PoolError::StackImbalance {
                operation: "destroy",
                depth,
            });
        }
        Ok(())
    }

    // ── Configuration ────────────────────────────────────────────

    /// Replace the strategy, returning the previous one.
    ///
    /// Rejected while any frame is live: blocks acquired through one
    /// strategy must be released through the same one.
    pub fn set_strategy(&mut self, strategy: S) -> Result<S, PoolError> {
        self.ensure_idle("set_strategy")?;
        Ok(std::mem::replace(&mut self.strategy, strategy))
    }

    /// Change the default block size. Rejected while any frame is live.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), PoolError> {
        self.set_config(self.config.clone().with_block_size(block_size))
    }

    /// Change the growth factor. Rejected while any frame is live.
    pub fn set_growth_factor(&mut self, growth_factor: usize) -> Result<(), PoolError> {
        self.set_config(self.config.clone().with_growth_factor(growth_factor))
    }

    /// Replace the whole configuration. Rejected while any frame is live.
    pub fn set_config(&mut self, config: PoolConfig) -> Result<(), PoolError> {
        self.ensure_idle("set_config")?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), PoolError> {
        if self.frames.is_empty() {
            Ok(())
        } else {
            Err(PoolError::PreconditionViolation {
                operation,
                depth: self.frames.len(),
            })
        }
    }

    // ── Frame stack ──────────────────────────────────────────────

    /// Push a new frame and make it active.
    ///
    /// If the current top frame has room for a frame header, the new frame
    /// is embedded there and no block is acquired. Otherwise one block of
    /// `block_size` bytes is acquired and owned by the new frame.
    ///
    /// On `AllocationFailure` the stack is unchanged.
    pub fn push(&mut self) -> Result<FrameHandle, PoolError> {
        let index = self.frames.len();
        let serial = self.next_serial;

        let frame = match self.frames.last() {
            Some(parent) if parent.free() >= FRAME_HEADER_SIZE => {
                self.stats.embedded_pushes += 1;
                Frame::embedded(serial, index - 1, parent)
            }
            _ => {
                let id = self
                    .blocks
                    .acquire(&mut self.strategy, self.config.block_size, None)?;
                let usable = self.blocks.usable(id);
                self.stats.blocks_acquired += 1;
                self.stats.bytes_acquired += usable as u64;
                Frame::with_block(serial, index.checked_sub(1), id, usable)
            }
        };

        trace!(
            serial,
            index,
            embedded = frame.is_embedded(),
            free = frame.free(),
            "push"
        );
        self.frames.push(frame);
        self.next_serial += 1;
        self.stats.pushes += 1;
        Ok(FrameHandle::new(index, serial))
    }

    /// Pop the active frame, releasing every block it acquired.
    ///
    /// Blocks belonging to frames further down are never touched. Returns
    /// the popped frame's handle; compare it with the handle `push`
    /// returned to check balance, or use [`Pool::pop_expect`].
    ///
    /// Fails with `StackImbalance` on an empty stack.
    pub fn pop(&mut self) -> Result<FrameHandle, PoolError> {
        let frame = self.frames.pop().ok_or(PoolError::StackImbalance {
            operation: "pop",
            depth: 0,
        })?;
        let index = self.frames.len();
        let released = self.blocks.release_chain(&mut self.strategy, frame.blocks());
        debug_assert_eq!(released, frame.owned());

        trace!(
            serial = frame.serial(),
            index,
            prev = ?frame.prev(),
            released,
            "pop"
        );
        self.stats.pops += 1;
        self.stats.blocks_released += released as u64;
        Ok(frame.handle(index))
    }

    /// Pop the active frame only if it is `expected`.
    ///
    /// On mismatch nothing is popped and `FrameMismatch` is returned.
    pub fn pop_expect(&mut self, expected: FrameHandle) -> Result<FrameHandle, PoolError> {
        match self.top() {
            Some(top) if top == expected => self.pop(),
            Some(found) => Err(PoolError::FrameMismatch {
                expected,
                found: Some(found),
            }),
            None => Err(PoolError::FrameMismatch {
                expected,
                found: None,
            }),
        }
    }

    // ── Allocation ───────────────────────────────────────────────

    /// Bump-allocate `size` bytes from the active frame.
    ///
    /// When the current block is too small, a new block is acquired for
    /// the active frame: `block_size` bytes if `size < block_size`, else
    /// `size * growth_factor`. An allocation never straddles blocks.
    ///
    /// On failure nothing is bumped and no block is linked.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, PoolError> {
        let index = self
            .frames
            .len()
            .checked_sub(1)
            .ok_or(PoolError::NoActiveFrame)?;
        let frame = &mut self.frames[index];

        if size > frame.free() {
            let requested = self
                .config
                .growth_size(size)
                .ok_or(PoolError::AllocationFailure { requested: size })?;
            let id = self
                .blocks
                .acquire(&mut self.strategy, requested, frame.blocks())?;
            let usable = self.blocks.usable(id);
            trace!(
                serial = frame.serial(),
                size,
                requested,
                usable,
                "frame grew into new block"
            );
            frame.adopt(id, usable);
            self.stats.growths += 1;
            self.stats.blocks_acquired += 1;
            self.stats.bytes_acquired += usable as u64;
        }

        let (block, offset) = frame
            .bump(size)
            .ok_or(PoolError::AllocationFailure { requested: size })?;
        self.stats.allocations += 1;
        Ok(Allocation {
            frame: FrameHandle::new(index, frame.serial()),
            block,
            offset,
            len: size,
        })
    }

    /// Allocate `size` bytes and return them zero-filled.
    pub fn allocate_bytes(&mut self, size: usize) -> Result<&mut [u8], PoolError> {
        let allocation = self.allocate(size)?;
        let bytes = self.get_mut(&allocation)?;
        bytes.fill(0);
        Ok(bytes)
    }

    /// Resolve an allocation to its bytes.
    ///
    /// Fails with `StaleAllocation` once the owning frame has been popped.
    pub fn get(&self, allocation: &Allocation) -> Result<&[u8], PoolError> {
        self.ensure_live(allocation)?;
        self.blocks
            .get(allocation.block)
            .and_then(|b| b.bytes(allocation.range()))
            .ok_or(PoolError::StaleAllocation {
                frame: allocation.frame,
            })
    }

    /// Resolve an allocation to its bytes, mutably.
    pub fn get_mut(&mut self, allocation: &Allocation) -> Result<&mut [u8], PoolError> {
        self.ensure_live(allocation)?;
        self.blocks
            .get_mut(allocation.block)
            .and_then(|b| b.bytes_mut(allocation.range()))
            .ok_or(PoolError::StaleAllocation {
                frame: allocation.frame,
            })
    }

    /// Whether the frame that made `allocation` is still on the stack.
    pub fn is_live(&self, allocation: &Allocation) -> bool {
        self.contains(allocation.frame)
    }

    /// Whether `handle` names a frame currently on the stack.
    pub fn contains(&self, handle: FrameHandle) -> bool {
        self.frames
            .get(handle.index)
            .is_some_and(|f| f.serial() == handle.serial)
    }

    fn ensure_live(&self, allocation: &Allocation) -> Result<(), PoolError> {
        if self.is_live(allocation) {
            Ok(())
        } else {
            Err(PoolError::StaleAllocation {
                frame: allocation.frame,
            })
        }
    }

    // ── Inspection ───────────────────────────────────────────────

    /// Current configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The backing strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame is on the stack.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Handle of the active frame.
    pub fn top(&self) -> Option<FrameHandle> {
        let index = self.frames.len().checked_sub(1)?;
        Some(self.frames[index].handle(index))
    }

    /// Bytes the active frame can bump before it must grow.
    pub fn free_bytes(&self) -> usize {
        self.frames.last().map_or(0, Frame::free)
    }

    /// Number of blocks currently held.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Usable bytes across all blocks currently held.
    pub fn reserved_bytes(&self) -> usize {
        self.blocks.usable_bytes()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Per-frame view, bottom of the stack first.
    pub fn frame_stats(&self) -> Vec<FrameStats> {
        self.frames
            .iter()
            .enumerate()
            .map(|(index, frame)| FrameStats {
                handle: frame.handle(index),
                owned_blocks: frame.owned(),
                owned_bytes: self
                    .blocks
                    .chain(frame.blocks())
                    .map(|(_, b)| b.usable())
                    .sum(),
                free_bytes: frame.free(),
                cursor: frame.cursor(),
                block: frame.block(),
                embedded: frame.is_embedded(),
            })
            .collect()
    }

    // ── Internals ────────────────────────────────────────────────

    fn release_everything(&mut self) {
        let released = self.blocks.release_all(&mut self.strategy);
        self.stats.blocks_released += released as u64;
        self.frames.clear();
    }
}

impl<S: Strategy> Drop for Pool<S> {
    fn drop(&mut self) {
        if !self.frames.is_empty() {
            warn!(
                depth = self.frames.len(),
                blocks = self.blocks.len(),
                "pool dropped with live frames; releasing their blocks"
            );
        }
        self.release_everything();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{FnStrategy, PageStrategy};
    use indexmap::IndexMap;

    /// Heap strategy that records every buffer it hands out.
    #[derive(Default)]
    struct Ledger {
        live: IndexMap<usize, usize>,
        requests: Vec<usize>,
        released: usize,
        foreign: usize,
        fail_after: Option<usize>,
    }

    impl Ledger {
        fn failing_after(n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Self::default()
            }
        }
    }

    impl Strategy for Ledger {
        fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
            if self.fail_after == Some(self.requests.len()) {
                return None;
            }
            self.requests.push(requested);
            let buf = vec![0u8; requested].into_boxed_slice();
            self.live.insert(buf.as_ptr() as usize, buf.len());
            Some(buf)
        }

        fn release(&mut self, block: Box<[u8]>) {
            if self.live.shift_remove(&(block.as_ptr() as usize)).is_some() {
                self.released += 1;
            } else {
                self.foreign += 1;
            }
        }
    }

    fn small_pool(ledger: &mut Ledger) -> Pool<&mut Ledger> {
        let config = PoolConfig::new().with_block_size(1024).with_growth_factor(2);
        Pool::with_config_and_strategy(config, ledger).unwrap()
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = Pool::new();
        assert_eq!(pool.depth(), 0);
        assert_eq!(pool.block_count(), 0);
        assert_eq!(pool.top(), None);
        assert_eq!(pool.config(), &PoolConfig::default());
        pool.destroy().unwrap();
    }

    #[test]
    #[deny(unused_must_use)]
    fn handles_can_be_discarded() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        pool.allocate(8).unwrap();
        pool.push().unwrap();
        pool.pop().unwrap();
        pool.pop().unwrap();
        pool.destroy().unwrap();
    }

    #[test]
    fn first_push_acquires_one_block() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        let f = pool.push().unwrap();
        assert_eq!(f.index(), 0);
        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.free_bytes(), 1024 - FRAME_HEADER_SIZE);
        pool.pop_expect(f).unwrap();
        pool.destroy().unwrap();
        assert_eq!(ledger.requests, vec![1024]);
        assert_eq!(ledger.released, 1);
        assert!(ledger.live.is_empty());
    }

    #[test]
    fn second_push_embeds_in_parent() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        let parent_free = pool.free_bytes();
        pool.push().unwrap();

        assert_eq!(pool.block_count(), 1);
        assert_eq!(pool.free_bytes(), parent_free - FRAME_HEADER_SIZE);
        assert_eq!(pool.stats().embedded_pushes, 1);
        let frames = pool.frame_stats();
        assert!(frames[1].embedded);
        assert_eq!(frames[1].owned_blocks, 0);
        assert_eq!(frames[1].block, frames[0].block);
    }

    #[test]
    fn push_without_room_acquires_block() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        let fill = pool.free_bytes() - (FRAME_HEADER_SIZE - 1);
        pool.allocate(fill).unwrap();
        assert_eq!(pool.free_bytes(), FRAME_HEADER_SIZE - 1);

        pool.push().unwrap();
        assert_eq!(pool.block_count(), 2);
        assert!(!pool.frame_stats()[1].embedded);
    }

    #[test]
    fn push_pop_round_trip_restores_state() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        let outer = pool.push().unwrap();
        pool.allocate(100).unwrap();
        let free_before = pool.free_bytes();
        let blocks_before = pool.block_count();

        let inner = pool.push().unwrap();
        assert_eq!(pool.pop().unwrap(), inner);
        assert_eq!(pool.top(), Some(outer));
        assert_eq!(pool.free_bytes(), free_before);
        assert_eq!(pool.block_count(), blocks_before);
    }

    #[test]
    fn pop_on_empty_stack_fails() {
        let mut pool = Pool::new();
        assert_eq!(
            pool.pop(),
            Err(PoolError::StackImbalance {
                operation: "pop",
                depth: 0
            })
        );
    }

    #[test]
    fn pop_expect_rejects_wrong_frame() {
        let mut pool = Pool::new();
        let outer = pool.push().unwrap();
        let inner = pool.push().unwrap();
        let err = pool.pop_expect(outer).unwrap_err();
        assert_eq!(
            err,
            PoolError::FrameMismatch {
                expected: outer,
                found: Some(inner)
            }
        );
        assert_eq!(pool.depth(), 2);
        pool.pop_expect(inner).unwrap();
        pool.pop_expect(outer).unwrap();
        assert!(matches!(
            pool.pop_expect(outer),
            Err(PoolError::FrameMismatch { found: None, .. })
        ));
    }

    #[test]
    fn growth_with_small_request_uses_block_size() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        pool.allocate(500).unwrap();
        pool.allocate(600).unwrap();
        let frames = pool.frame_stats();
        assert_eq!(frames[0].owned_blocks, 2);
        assert_eq!(pool.stats().growths, 1);
        drop(pool);
        assert_eq!(ledger.requests, vec![1024, 1024]);
    }

    #[test]
    fn growth_with_large_request_multiplies() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        let a = pool.allocate(5000).unwrap();
        assert_eq!(a.offset(), 0);
        assert_eq!(pool.free_bytes(), 10_000 - 5000);
        drop(pool);
        assert_eq!(ledger.requests, vec![1024, 10_000]);
    }

    #[test]
    fn growth_uses_actual_usable_size() {
        let config = PoolConfig::new().with_block_size(1000);
        let mut pool = Pool::with_config_and_strategy(config, PageStrategy::new(4096).unwrap())
            .unwrap();
        pool.push().unwrap();
        assert_eq!(pool.free_bytes(), 4096 - FRAME_HEADER_SIZE);
        pool.allocate(4096).unwrap();
        // 4096 * 2 rounded to pages is exactly 8192.
        assert_eq!(pool.free_bytes(), 8192 - 4096);
    }

    #[test]
    fn allocations_do_not_overlap() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        let a = pool.allocate(16).unwrap();
        let b = pool.allocate(16).unwrap();
        assert_eq!(a.block(), b.block());
        assert_eq!(b.offset(), a.offset() + 16);

        pool.get_mut(&a).unwrap().fill(0xAA);
        pool.get_mut(&b).unwrap().fill(0xBB);
        assert!(pool.get(&a).unwrap().iter().all(|&x| x == 0xAA));
        assert!(pool.get(&b).unwrap().iter().all(|&x| x == 0xBB));
    }

    #[test]
    fn allocate_without_frame_fails() {
        let mut pool = Pool::new();
        assert_eq!(pool.allocate(8), Err(PoolError::NoActiveFrame));
    }

    #[test]
    fn zero_size_allocation_consumes_nothing() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        let free = pool.free_bytes();
        let a = pool.allocate(0).unwrap();
        assert!(a.is_empty());
        assert_eq!(pool.free_bytes(), free);
        assert!(pool.get(&a).unwrap().is_empty());
    }

    #[test]
    fn allocate_bytes_zeroes_reused_memory() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        pool.push().unwrap();
        pool.allocate_bytes(64).unwrap().fill(0xFF);
        pool.pop().unwrap();
        pool.push().unwrap();
        let bytes = pool.allocate_bytes(64).unwrap();
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn stale_allocation_is_detected() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        let inner = pool.push().unwrap();
        let a = pool.allocate(8).unwrap();
        assert!(pool.is_live(&a));
        pool.pop().unwrap();
        assert!(!pool.is_live(&a));
        assert_eq!(pool.get(&a), Err(PoolError::StaleAllocation { frame: inner }));

        // Same slot, new serial: still stale.
        pool.push().unwrap();
        assert!(pool.get(&a).is_err());
    }

    #[test]
    fn failed_growth_leaves_frame_unchanged() {
        let mut ledger = Ledger::failing_after(1);
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        pool.allocate(10).unwrap();
        let before = pool.frame_stats();

        let err = pool.allocate(2000).unwrap_err();
        assert_eq!(err, PoolError::AllocationFailure { requested: 4000 });
        assert_eq!(pool.frame_stats(), before);
        assert_eq!(pool.block_count(), 1);
    }

    #[test]
    fn failed_push_leaves_stack_unchanged() {
        let mut ledger = Ledger::failing_after(0);
        let mut pool = small_pool(&mut ledger);
        assert!(matches!(
            pool.push(),
            Err(PoolError::AllocationFailure { requested: 1024 })
        ));
        assert_eq!(pool.depth(), 0);
        assert_eq!(pool.stats().pushes, 0);
    }

    #[test]
    fn growth_overflow_is_allocation_failure() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        assert_eq!(
            pool.allocate(usize::MAX),
            Err(PoolError::AllocationFailure {
                requested: usize::MAX
            })
        );
    }

    #[test]
    fn pop_releases_only_own_blocks() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        pool.allocate(2000).unwrap(); // outer grows: 2 blocks
        pool.push().unwrap(); // embedded
        pool.allocate(3000).unwrap(); // inner grows: 1 block
        pool.allocate(3000).unwrap(); // fits the 6000-byte block
        pool.allocate(5000).unwrap(); // inner grows again
        assert_eq!(pool.block_count(), 4);

        pool.pop().unwrap();
        assert_eq!(pool.block_count(), 2);
        assert_eq!(pool.stats().blocks_released, 2);
        pool.pop().unwrap();
        pool.destroy().unwrap();
        assert_eq!(ledger.released, 4);
        assert_eq!(ledger.foreign, 0);
    }

    #[test]
    fn destroy_with_live_frames_fails_but_releases() {
        let mut ledger = Ledger::default();
        let mut pool = small_pool(&mut ledger);
        pool.push().unwrap();
        pool.push().unwrap();
        assert_eq!(
            pool.destroy(),
            Err(PoolError::StackImbalance {
                operation: "destroy",
                depth: 2
            })
        );
        assert!(ledger.live.is_empty());
        assert_eq!(ledger.released, 1);
    }

    #[test]
    fn configuration_locked_while_frames_live() {
        let mut pool = Pool::new();
        pool.push().unwrap();
        assert!(matches!(
            pool.set_block_size(8192),
            Err(PoolError::PreconditionViolation {
                operation: "set_config",
                depth: 1
            })
        ));
        assert!(pool.set_growth_factor(4).is_err());
        assert!(pool.set_strategy(HeapStrategy).is_err());
        pool.pop().unwrap();

        pool.set_block_size(8192).unwrap();
        pool.set_growth_factor(4).unwrap();
        assert_eq!(pool.config().block_size, 8192);
        assert_eq!(pool.config().growth_factor, 4);
    }

    #[test]
    fn invalid_configuration_rejected() {
        let mut pool = Pool::new();
        assert!(matches!(
            pool.set_block_size(1),
            Err(PoolError::InvalidConfig { .. })
        ));
        assert!(matches!(
            pool.set_growth_factor(0),
            Err(PoolError::InvalidConfig { .. })
        ));
        assert_eq!(pool.config(), &PoolConfig::default());
    }

    #[test]
    fn boxed_strategy_can_be_swapped() {
        let heap: Box<dyn Strategy> = Box::new(HeapStrategy);
        let mut pool = Pool::with_strategy(heap);
        let old = pool
            .set_strategy(Box::new(PageStrategy::new(8192).unwrap()))
            .unwrap();
        drop(old);
        pool.push().unwrap();
        assert_eq!(pool.reserved_bytes(), 8192);
    }

    #[test]
    fn fn_strategy_drives_pool() {
        let mut acquired = Vec::new();
        let mut released = 0;
        {
            let strategy = FnStrategy::new(
                |n| {
                    acquired.push(n);
                    Some(vec![0u8; n].into_boxed_slice())
                },
                |_| released += 1,
            );
            let mut pool = Pool::with_strategy(strategy);
            pool.push().unwrap();
            pool.allocate(10_000).unwrap();
            pool.pop().unwrap();
        }
        assert_eq!(acquired, vec![4096, 20_000]);
        assert_eq!(released, 2);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use proptest::strategy::Strategy;

        #[derive(Clone, Debug)]
        enum Op {
            Push,
            Pop,
            Alloc(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                2 => Just(Op::Push),
                2 => Just(Op::Pop),
                5 => (0usize..3000).prop_map(Op::Alloc),
            ]
        }

        proptest! {
            #[test]
            fn balanced_sequences_release_every_block_once(
                ops in proptest::collection::vec(op(), 1..80),
            ) {
                let mut ledger = Ledger::default();
                {
                    let mut pool = small_pool(&mut ledger);
                    let mut live: Vec<Allocation> = Vec::new();
                    for op in ops {
                        match op {
                            Op::Push => { pool.push().unwrap(); }
                            Op::Pop => {
                                if pool.is_empty() {
                                    prop_assert!(pool.pop().is_err());
                                } else {
                                    pool.pop().unwrap();
                                    live.retain(|a| pool.is_live(a));
                                }
                            }
                            Op::Alloc(n) => {
                                if pool.is_empty() {
                                    prop_assert_eq!(pool.allocate(n), Err(PoolError::NoActiveFrame));
                                } else {
                                    live.push(pool.allocate(n).unwrap());
                                }
                            }
                        }

                        // Every frame's free space stays inside its block.
                        for stats in pool.frame_stats() {
                            let usable = pool.blocks.usable(stats.block);
                            prop_assert_eq!(stats.cursor + stats.free_bytes, usable);
                        }
                        prop_assert!(pool.free_bytes() <= pool.reserved_bytes());

                        // Live allocations in the same block never overlap.
                        for (i, a) in live.iter().enumerate() {
                            prop_assert!(a.range().end <= pool.blocks.usable(a.block()));
                            for b in &live[i + 1..] {
                                if a.block() == b.block() && !a.is_empty() && !b.is_empty() {
                                    prop_assert!(a.range().end <= b.range().start
                                        || b.range().end <= a.range().start);
                                }
                            }
                        }
                    }
                    while !pool.is_empty() {
                        pool.pop().unwrap();
                    }
                    pool.destroy().unwrap();
                }
                prop_assert!(ledger.live.is_empty());
                prop_assert_eq!(ledger.released, ledger.requests.len());
                prop_assert_eq!(ledger.foreign, 0);
            }

            #[test]
            fn push_pop_is_identity(
                allocs in proptest::collection::vec(0usize..2000, 0..10),
            ) {
                let mut pool = Pool::new();
                pool.push().unwrap();
                for n in allocs {
                    pool.allocate(n).unwrap();
                }
                let top = pool.top();
                let free = pool.free_bytes();
                let blocks = pool.block_count();

                let handle = pool.push().unwrap();
                prop_assert_eq!(pool.pop().unwrap(), handle);
                prop_assert_eq!(pool.top(), top);
                prop_assert_eq!(pool.free_bytes(), free);
                prop_assert_eq!(pool.block_count(), blocks);
            }
        }
    }
}
