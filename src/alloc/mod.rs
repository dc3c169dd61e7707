//! Bulk-lifetime and fixed-block allocators for short-lived, per-task
//! objects (§4.4).

pub mod arena;
pub mod pool;

pub use arena::{Arena, SyncArena};
pub use pool::{FixedSizeMemoryPool, PoolHandle};
