//! Lock-free concurrency primitives (§4.1–§4.3): the tagged pointer, the
//! node freelist built on it, and the MPMC queue built on both.

mod node_pool;
mod tagged_ptr;

pub mod queue;

pub use node_pool::NodePool;
pub use queue::LockFreeQueue;
pub use tagged_ptr::{AtomicTaggedPtr, Packed};
