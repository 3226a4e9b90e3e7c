//! Backing strategies: where block memory comes from.
//!
//! A [`Strategy`] is the only thing in the pool that acquires or returns
//! real memory. The pool asks it for whole blocks and hands every block
//! back exactly once, when the frame that owns it is popped.
//!
//! Three implementations ship with the crate:
//!
//! - [`HeapStrategy`]: zeroed heap buffers of exactly the requested size.
//! - [`PageStrategy`]: heap buffers rounded up to whole pages.
//! - [`FnStrategy`]: a pair of closures; captured state plays the role
//!   of an opaque context.

use crate::error::PoolError;

/// Acquires and releases raw block memory.
///
/// # Contract
///
/// - `allocate(requested)` returns a buffer of at least `requested` bytes,
///   or `None` if memory is unavailable. The buffer length is the block's
///   usable size; rounding up is allowed, returning less is not.
/// - `release(buffer)` receives only buffers previously returned by
///   `allocate` on the same pool, each exactly once.
pub trait Strategy {
    /// Acquire a buffer of at least `requested` bytes.
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>>;

    /// Return a buffer obtained from [`Strategy::allocate`].
    fn release(&mut self, block: Box<[u8]>);
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        (**self).allocate(requested)
    }

    fn release(&mut self, block: Box<[u8]>) {
        (**self).release(block)
    }
}

impl<S: Strategy + ?Sized> Strategy for &mut S {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        (**self).allocate(requested)
    }

    fn release(&mut self, block: Box<[u8]>) {
        (**self).release(block)
    }
}

/// Allocate a zeroed buffer of exactly `len` bytes, reporting failure
/// instead of aborting.
fn try_zeroed(len: usize) -> Option<Box<[u8]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize(len, 0);
    Some(buf.into_boxed_slice())
}

/// Heap-backed strategy with no rounding.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapStrategy;

impl Strategy for HeapStrategy {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        try_zeroed(requested)
    }

    fn release(&mut self, block: Box<[u8]>) {
        drop(block);
    }
}

/// Heap-backed strategy that rounds every block up to whole pages.
///
/// Mirrors a page-mapping backend: a block is never smaller than one page,
/// and the pool sees the rounded length as the block's usable size.
#[derive(Clone, Copy, Debug)]
pub struct PageStrategy {
    page_size: usize,
}

impl PageStrategy {
    /// Default page size in bytes.
    pub const DEFAULT_PAGE_SIZE: usize = 4096;

    /// Create a strategy rounding to `page_size` bytes.
    ///
    /// `page_size` must be a non-zero power of two.
    pub fn new(page_size: usize) -> Result<Self, PoolError> {
        if !page_size.is_power_of_two() {
            return Err(PoolError::InvalidConfig {
                reason: format!("page_size must be a power of two (got {page_size})"),
            });
        }
        Ok(Self { page_size })
    }

    /// The page size blocks are rounded to.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Size actually acquired for a request of `requested` bytes.
    pub fn rounded(&self, requested: usize) -> Option<usize> {
        requested.max(1).checked_next_multiple_of(self.page_size)
    }
}

impl Default for PageStrategy {
    fn default() -> Self {
        Self {
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Strategy for PageStrategy {
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        try_zeroed(self.rounded(requested)?)
    }

    fn release(&mut self, block: Box<[u8]>) {
        drop(block);
    }
}

/// Strategy built from an allocate closure and a release closure.
pub struct FnStrategy<A, R> {
    allocate: A,
    release: R,
}

impl<A, R> FnStrategy<A, R>
where
    A: FnMut(usize) -> Option<Box<[u8]>>,
    R: FnMut(Box<[u8]>),
{
    /// Pair the two closures.
    pub fn new(allocate: A, release: R) -> Self {
        Self { allocate, release }
    }
}

impl<A, R> Strategy for FnStrategy<A, R>
where
    A: FnMut(usize) -> Option<Box<[u8]>>,
    R: FnMut(Box<[u8]>),
{
    fn allocate(&mut self, requested: usize) -> Option<Box<[u8]>> {
        (self.allocate)(requested)
    }

    fn release(&mut self, block: Box<[u8]>) {
        (self.release)(block)
    }
}
