//! Frame-stack bump allocation engine for stackpool.
//!
//! A [`Pool`] hands out memory by bumping a cursor and releases it a whole
//! frame at a time. Callers push a frame, allocate freely, and pop the
//! frame to return everything allocated since the push.
//!
//! # Architecture
//!
//! ```text
//! Pool (orchestrator)
//! ├── PoolConfig (block size, growth factor)
//! ├── Strategy (where block memory comes from)
//! ├── BlockStack → Block[] (Box<[u8]> from the strategy, acquisition order)
//! └── Frame[] (LIFO; each bumps one block, owns a private block chain)
//! ```
//!
//! # Embedding and growth
//!
//! - **Embedded push:** a new frame whose header fits in the parent's
//!   leftover room reuses the parent's block and acquires nothing.
//! - **Growth:** an allocation that does not fit acquires a block owned by
//!   the active frame, sized `block_size` for small requests and
//!   `size * growth_factor` for large ones.
//!
//! # Safety
//!
//! Blocks are owned buffers and frames are indices into the pool, so there
//! is no raw pointer aliasing. Allocations are returned as [`Allocation`]
//! handles and resolved through the pool; handles from popped frames are
//! detected as stale.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod error;
pub mod frame;
pub mod handle;
pub mod pool;
pub mod scope;
pub mod strategy;
pub mod version;

// Public re-exports for the primary API surface.
pub use config::PoolConfig;
pub use error::PoolError;
pub use frame::{FrameStats, FRAME_HEADER_SIZE};
pub use handle::{Allocation, BlockId, FrameHandle};
pub use pool::{Pool, PoolStats};
pub use scope::Scope;
pub use strategy::{FnStrategy, HeapStrategy, PageStrategy, Strategy};
pub use version::{version, version_major, version_minor, version_patch};
