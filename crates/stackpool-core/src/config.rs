//! Pool configuration parameters.

use crate::error::PoolError;
use crate::frame::FRAME_HEADER_SIZE;

/// Tuning values for block sizing.
///
/// Both values should be settled before the first push; the pool rejects
/// changes while any frame is live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Size in bytes of an ordinary block.
    ///
    /// Default: 4096. Used for every root-frame block and for growth when
    /// the request is smaller than this. Must exceed [`FRAME_HEADER_SIZE`].
    pub block_size: usize,

    /// Multiplier applied to requests of at least `block_size` bytes.
    ///
    /// Default: 2. A request of `n >= block_size` bytes that does not fit
    /// acquires a block of `n * growth_factor` bytes, leaving room for
    /// further allocations in the same block. Must be at least 1.
    pub growth_factor: usize,
}

impl PoolConfig {
    /// Default block size in bytes.
    pub const DEFAULT_BLOCK_SIZE: usize = 4096;

    /// Default growth factor.
    pub const DEFAULT_GROWTH_FACTOR: usize = 2;

    /// Create a config with default values.
    pub fn new() -> Self {
        Self {
            block_size: Self::DEFAULT_BLOCK_SIZE,
            growth_factor: Self::DEFAULT_GROWTH_FACTOR,
        }
    }

    /// Replace the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Replace the growth factor.
    pub fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Check that the values can drive a pool.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.block_size <= FRAME_HEADER_SIZE {
            return Err(PoolError::InvalidConfig {
                reason: format!(
                    "block_size must exceed the {FRAME_HEADER_SIZE}-byte frame header (got {})",
                    self.block_size
                ),
            });
        }
        if self.growth_factor == 0 {
            return Err(PoolError::InvalidConfig {
                reason: "growth_factor must be at least 1 (got 0)".into(),
            });
        }
        Ok(())
    }

    /// Size of the block to acquire when `size` bytes do not fit.
    ///
    /// Returns `None` if the product overflows `usize`.
    pub fn growth_size(&self, size: usize) -> Option<usize> {
        if size < self.block_size {
            Some(self.block_size)
        } else {
            size.checked_mul(self.growth_factor)
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
