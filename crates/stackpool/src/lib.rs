//! stackpool: a stack-discipline memory pool.
//!
//! This is the top-level facade crate that re-exports the public API of
//! `stackpool-core`. For most users, adding `stackpool` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use stackpool::prelude::*;
//!
//! let config = PoolConfig::new().with_block_size(1024).with_growth_factor(2);
//! let mut pool = Pool::with_config(config).unwrap();
//!
//! // Everything allocated between push and pop goes away together.
//! let frame = pool.push().unwrap();
//! let a = pool.allocate(500).unwrap();
//! pool.get_mut(&a).unwrap()[0] = 42;
//! let b = pool.allocate(600).unwrap(); // does not fit: frame grows
//! assert_ne!(a.block(), b.block());
//! assert_eq!(pool.pop().unwrap(), frame);
//!
//! // Scopes pop themselves.
//! {
//!     let mut scope = pool.scope().unwrap();
//!     let bytes = scope.allocate_bytes(64).unwrap();
//!     bytes.fill(7);
//! }
//! assert_eq!(pool.depth(), 0);
//! pool.destroy().unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`pool`] | `Pool`, `PoolStats` |
//! | [`scope`] | `Scope` guard that pops its frame on drop |
//! | [`frame`] | `FrameStats`, `FRAME_HEADER_SIZE` |
//! | [`block`] | `Block`, `BlockStack` |
//! | [`strategy`] | `Strategy` trait, heap/page/closure strategies |
//! | [`config`] | `PoolConfig` |
//! | [`handle`] | `FrameHandle`, `Allocation`, `BlockId` |
//! | [`error`] | `PoolError` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use stackpool_core::{block, config, error, frame, handle, pool, scope, strategy};

pub use stackpool_core::{
    version, version_major, version_minor, version_patch, Allocation, BlockId, FnStrategy,
    FrameHandle, FrameStats, HeapStrategy, PageStrategy, Pool, PoolConfig, PoolError, PoolStats,
    Scope, Strategy, FRAME_HEADER_SIZE,
};

/// Common imports for working with a pool.
///
/// ```rust
/// use stackpool::prelude::*;
/// ```
pub mod prelude {
    pub use stackpool_core::{
        Allocation, FrameHandle, HeapStrategy, PageStrategy, Pool, PoolConfig, PoolError, Scope,
        Strategy,
    };
}
