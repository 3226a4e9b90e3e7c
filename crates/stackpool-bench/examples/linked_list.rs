//! Build a large linked list in a fresh frame, several times over.
//!
//! Each round pushes a frame, bump-allocates every node, and pops the frame
//! to release the whole list at once. The blocks come from a page-rounding
//! strategy that counts what it hands out, so the overhead of the pool is
//! visible at the end.
//!
//! Set `RUST_LOG=stackpool_core=debug` to watch blocks come and go.

use stackpool_bench::{build_list, NODE_SIZE};
use stackpool_core::{Pool, PoolError};
use stackpool_test_utils::CountingStrategy;
use tracing_subscriber::EnvFilter;

const NUM_LOOPS: usize = 3;
const LIST_SIZE: usize = 1_000_000;
const PAGE_SIZE: usize = 4096;

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    eprintln!("stackpool version: {}\n", stackpool_core::version());

    let mut pool = Pool::with_strategy(CountingStrategy::rounding_to(PAGE_SIZE));
    for _ in 0..NUM_LOOPS {
        let frame = pool.push()?;
        build_list(&mut pool, LIST_SIZE)?;
        pool.pop_expect(frame)?;
    }

    let ledger = pool.strategy();
    let per_loop = LIST_SIZE * NODE_SIZE;
    let total = per_loop * NUM_LOOPS;
    let allocated = ledger.total_acquired_bytes();

    println!("statistics:");
    println!("===========");
    println!("number of loops: {NUM_LOOPS}");
    println!("object size: {NODE_SIZE} bytes");
    println!("number of objects (per loop): {LIST_SIZE}");
    println!("total object size (per loop): {per_loop} bytes");
    println!("total object size (all loops): {total} bytes");
    println!("allocated {allocated} bytes");
    println!("# of allocations: {}", ledger.acquired().len());
    println!("# of deallocations: {}", ledger.released().len());
    println!("overhead: {} bytes", allocated.saturating_sub(total));

    pool.destroy()
}
