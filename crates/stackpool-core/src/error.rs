//! Pool error types.

use thiserror::Error;

use crate::handle::FrameHandle;

/// Errors that can occur during pool operations.
///
/// Every failure is reported synchronously to the immediate caller. The
/// pool never retries a failed strategy call and never leaves a partially
/// linked block behind.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The backing strategy could not supply a block.
    ///
    /// Also reported when the growth size overflows `usize`, and when a
    /// strategy hands back a buffer shorter than requested.
    #[error("allocation failure: backing strategy could not supply {requested} bytes")]
    AllocationFailure {
        /// Number of bytes requested from the strategy.
        requested: usize,
    },
    /// The frame stack was not in the shape the operation requires:
    /// `pop` on an empty stack, or `destroy` with frames still live.
    #[error("stack imbalance: {operation} with {depth} frame(s) on the stack")]
    StackImbalance {
        /// The operation that found the imbalance.
        operation: &'static str,
        /// Number of frames on the stack at the time.
        depth: usize,
    },
    /// A balance check found a different frame on top than expected.
    #[error("frame mismatch: expected {expected} on top, found {found:?}")]
    FrameMismatch {
        /// The handle the caller expected to pop.
        expected: FrameHandle,
        /// The handle actually on top, if any.
        found: Option<FrameHandle>,
    },
    /// Configuration or strategy changed while frames are live.
    #[error("precondition violation: {operation} while {depth} frame(s) are live")]
    PreconditionViolation {
        /// The rejected operation.
        operation: &'static str,
        /// Number of live frames.
        depth: usize,
    },
    /// `allocate` was called with no frame on the stack.
    #[error("no active frame: push a frame before allocating")]
    NoActiveFrame,
    /// An allocation handle whose frame has already been popped.
    #[error("stale allocation: owning frame {frame} is no longer live")]
    StaleAllocation {
        /// The frame the allocation was made in.
        frame: FrameHandle,
    },
    /// Rejected tuning value.
    #[error("invalid pool configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the rejected value.
        reason: String,
    },
}
