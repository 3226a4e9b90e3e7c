//! Instrumented backing strategies for stackpool tests.
//!
//! Each fixture wraps heap allocation with bookkeeping so tests can assert
//! exactly which blocks a pool acquired and released:
//!
//! - [`CountingStrategy`]: records every request and live buffer, and
//!   flags releases of buffers it never handed out.
//! - [`FailingStrategy`]: succeeds a fixed number of times, then fails.
//! - [`ShortchangingStrategy`]: breaks the contract by returning buffers
//!   smaller than requested.
//!
//! Pass fixtures by `&mut` (every `&mut S` is a `Strategy`) so the ledger
//! stays inspectable after the pool is destroyed.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use indexmap::IndexMap;
use stackpool_core::Strategy;
use tracing::trace;

/// Heap strategy that keeps a ledger of every block.
///
/// Buffers are identified by address while live, so a release of a buffer
/// that was never handed out (or was already returned) is counted in
/// [`CountingStrategy::foreign_releases`] instead of being lost.
#[derive(Debug, Default)]
pub struct CountingStrategy {
    /// Round each request up to a multiple of this many bytes.
    round_to: Option<usize>,
    /// Address → usable size of every buffer not yet released.
    live: IndexMap<usize, usize>,
    /// Requested sizes, in call order.
    requests: Vec<usize>,
    /// Usable sizes handed out, in call order.
    acquired: Vec<usize>,
    /// Usable sizes released, in call order.
    released: Vec<usize>,
    foreign_releases: usize,
}

impl CountingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round every block up to a multiple of `granule` bytes, the way a
    /// page-backed allocator would.
    pub fn rounding_to(granule: usize) -> Self {
        Self {
            round_to: Some(granule.max(1)),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> &[usize] {
        &self.requests
    }

    pub fn acquired(&self) -> &[usize] {
        &self.acquired
    }

    pub fn released(&self) -> &[usize] {
        &self.released
    }

    pub fn live_blocks(&self) -> usize {
        self.live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.live.values().sum()
    }

    /// Total usable bytes ever handed out.
    pub fn total_acquired_bytes(&self) -> usize {
        self.acquired.iter().sum()
    }

    pub fn foreign_releases(&self) -> usize {
        self.foreign_releases
    }

    /// Every acquired block came back exactly once.
    pub fn is_balanced(&self) -> bool {
        self.live.is_empty()
            && self.foreign_releases == 0
            && self.acquired.len() == self.released.len()
    }

    fn usable_for(&self, requested: usize) -> Option<usize> {
        match self.round_to {
            Some(granule) => requested.max(1).checked_next_multiple_of(granule),
            None => Some(requested),
        }
    }
}

impl Strategy for CountingStrategy {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        self.requests.push(requested);
        let usable = self.usable_for(requested)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(usable).ok()?;
        buf.resize(usable, 0u8);
        let buf = buf.into_boxed_slice();
        trace!(requested, usable, "counting strategy acquired");
        self.live.insert(buf.as_ptr() as usize, usable);
        self.acquired.push(usable);
        Some(buf)
    }

    fn release(&mut self, block: Box<[u8]>) {
        match self.live.shift_remove(&(block.as_ptr() as usize)) {
            Some(usable) => self.released.push(usable),
            None => self.foreign_releases += 1,
        }
    }
}

/// Strategy that succeeds `budget` times and fails every call after.
#[derive(Debug, Default)]
pub struct FailingStrategy {
    budget: usize,
    failures: usize,
    inner: CountingStrategy,
}

impl FailingStrategy {
    /// Allow `budget` successful allocations.
    pub fn after(budget: usize) -> Self {
        Self {
            budget,
            failures: 0,
            inner: CountingStrategy::new(),
        }
    }

    /// Allow `extra` more successful allocations.
    pub fn refill(&mut self, extra: usize) {
        self.budget += extra;
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn ledger(&self) -> &CountingStrategy {
        &self.inner
    }
}

impl Strategy for FailingStrategy {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        if self.budget == 0 {
            self.failures += 1;
            return None;
        }
        self.budget -= 1;
        self.inner.allocate(requested)
    }

    fn release(&mut self, block: Box<[u8]>) {
        self.inner.release(block)
    }
}

/// Strategy that returns half of what was asked for.
///
/// A conforming pool must hand the buffer back and report failure.
#[derive(Debug, Default)]
pub struct ShortchangingStrategy {
    handed_out: usize,
    returned: usize,
}

impl ShortchangingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handed_out(&self) -> usize {
        self.handed_out
    }

    pub fn returned(&self) -> usize {
        self.returned
    }
}

impl Strategy for ShortchangingStrategy {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        self.handed_out += 1;
        Some(vec![0u8; requested / 2].into_boxed_slice())
    }

    fn release(&mut self, _block: Box<[u8]>) {
        self.returned += 1;
    }
}
