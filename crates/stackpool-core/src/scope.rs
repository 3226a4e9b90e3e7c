//! Lexically scoped frames.
//!
//! [`Scope`] pushes a frame when created and pops it when dropped. Because
//! the guard holds the pool's only mutable borrow, frames opened through
//! scopes are balanced by construction: an inner scope must end before the
//! outer one can be used again.

use tracing::error;

use crate::error::PoolError;
use crate::handle::{Allocation, FrameHandle};
use crate::pool::Pool;
use crate::strategy::{HeapStrategy, Strategy};

/// Guard for one pushed frame.
///
/// Created by [`Pool::scope()`] or [`Scope::scope()`]. Allocations made
/// through the guard belong to its frame and are released when the guard
/// goes away.
///
/// Leaking a guard (`std::mem::forget`) leaves its frame on the stack. The
/// enclosing guard's drop then finds the wrong frame on top, logs the
/// `FrameMismatch`, and pops nothing, so both frames stay live until the
/// pool is popped by hand or destroyed.
#[must_use]
pub struct Scope<'p, S: Strategy = HeapStrategy> {
    pool: &'p mut Pool<S>,
    handle: FrameHandle,
    closed: bool,
}

impl<S: Strategy> Pool<S> {
    /// Push a frame and return a guard that pops it on drop.
    pub fn scope(&mut self) -> Result<Scope<'_, S>, PoolError> {
        let handle = self.push()?;
        Ok(Scope {
            pool: self,
            handle,
            closed: false,
        })
    }
}

impl<S: Strategy> Scope<'_, S> {
    /// The frame this guard owns.
    pub fn handle(&self) -> FrameHandle {
        self.handle
    }

    /// Open a nested scope on top of this one.
    pub fn scope(&mut self) -> Result<Scope<'_, S>, PoolError> {
        self.pool.scope()
    }

    /// Bump-allocate `size` bytes in this scope's frame.
    pub fn allocate(&mut self, size: usize) -> Result<Allocation, PoolError> {
        self.pool.allocate(size)
    }

    /// Allocate `size` zero-filled bytes in this scope's frame.
    pub fn allocate_bytes(&mut self, size: usize) -> Result<&mut [u8], PoolError> {
        self.pool.allocate_bytes(size)
    }

    /// Resolve an allocation made in this scope or an enclosing one.
    pub fn get(&self, allocation: &Allocation) -> Result<&[u8], PoolError> {
        self.pool.get(allocation)
    }

    /// Resolve an allocation mutably.
    pub fn get_mut(&mut self, allocation: &Allocation) -> Result<&mut [u8], PoolError> {
        self.pool.get_mut(allocation)
    }

    /// Bytes this scope can bump before it must grow.
    pub fn free_bytes(&self) -> usize {
        self.pool.free_bytes()
    }

    /// Read-only view of the pool.
    pub fn pool(&self) -> &Pool<S> {
        &*self.pool
    }

    /// Pop the frame now, reporting any imbalance.
    pub fn close(mut self) -> Result<FrameHandle, PoolError> {
        self.closed = true;
        self.pool.pop_expect(self.handle)
    }
}

impl<S: Strategy> Drop for Scope<'_, S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.pool.pop_expect(self.handle) {
            error!(%err, handle = %self.handle, "scope exit found an unbalanced frame stack");
        }
    }
}
