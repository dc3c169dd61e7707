//! Lock-free MPMC queue (C3): the Michael–Scott algorithm over the tagged
//! pointers of C1 and the node pool of C2.
//!
//! Grounded on the teacher's `LockFreeReceiptQueue`
//! (`innovation/lockfree.rs`), generalized from a single concrete payload
//! type to any `T`, and rewired to reuse nodes through [`NodePool`] instead
//! of leaking the sentinel on every pop.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::node_pool::{Node, NodePool};
use super::tagged_ptr::AtomicTaggedPtr;

/// Pads a value to a cache line to keep `head`, `tail`, and the length
/// counter from sharing a line and inducing false sharing between the
/// loop thread and concurrent producers.
#[repr(align(64))]
struct CacheLinePadded<T>(T);

/// A lock-free, multi-producer multi-consumer FIFO queue.
///
/// Progress: lock-free — some thread always completes a push or pop in a
/// bounded number of steps, even under contention (§4.3, §8).
pub struct LockFreeQueue<T> {
    head: CacheLinePadded<AtomicTaggedPtr<Node<T>>>,
    tail: CacheLinePadded<AtomicTaggedPtr<Node<T>>>,
    len: CacheLinePadded<AtomicUsize>,
    pool: NodePool<T>,
}

impl<T> LockFreeQueue<T> {
    /// Create an empty queue. A sentinel node is installed immediately so
    /// `head == tail` characterises emptiness without a special case.
    pub fn new() -> Self {
        let pool = NodePool::new();
        let sentinel = pool.allocate().as_ptr();
        Self {
            head: CacheLinePadded(AtomicTaggedPtr::new(sentinel, 0)),
            tail: CacheLinePadded(AtomicTaggedPtr::new(sentinel, 0)),
            len: CacheLinePadded(AtomicUsize::new(0)),
            pool,
        }
    }

    /// Push a value. Lock-free; safe from any number of concurrent
    /// producers and consumers.
    pub fn push(&self, value: T) {
        let node = self.pool.allocate();
        // Safety: we hold the only reference to this freshly allocated node
        // until we link it into the queue below.
        unsafe { node.as_ref().set(value) };
        node.as_ref().set_next(std::ptr::null_mut(), Ordering::Release);

        loop {
            let tail = self.tail.0.load(Ordering::Acquire);
            let tail_ptr = tail.ptr::<Node<T>>();
            // Safety: tail always points at a live node — either the
            // sentinel or a node linked by a previous successful push.
            let tail_ref = unsafe { &*tail_ptr };
            let next = tail_ref.next(Ordering::Acquire);

            if next.is_null() {
                match tail_ref.cas_next(
                    std::ptr::null_mut(),
                    node.as_ptr(),
                    Ordering::Release,
                    Ordering::Acquire,
                ) {
                    Ok(_) => {
                        let advanced = tail.with_next_tag(node.as_ptr());
                        // Best-effort: if this CAS loses, another thread's
                        // push or pop already advanced tail past us.
                        let _ = self.tail.0.compare_exchange(
                            tail,
                            advanced,
                            Ordering::Release,
                            Ordering::Acquire,
                        );
                        self.len.0.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    Err(_) => continue,
                }
            } else {
                // Tail is lagging one node behind reality; help it catch up.
                let advanced = tail.with_next_tag(next);
                let _ =
                    self.tail
                        .0
                        .compare_exchange(tail, advanced, Ordering::Release, Ordering::Acquire);
            }
        }
    }

    /// Pop a value, or `None` if the queue was empty at the linearization
    /// point of this call.
    pub fn pop(&self) -> Option<T> {
        loop {
            let head = self.head.0.load(Ordering::Acquire);
            let tail = self.tail.0.load(Ordering::Acquire);
            let head_ptr = head.ptr::<Node<T>>();
            // Safety: head always points at a live node.
            let next = unsafe { (*head_ptr).next(Ordering::Acquire) };

            if next.is_null() {
                // head == tail and head->next == nullptr: empty (§4.3).
                return None;
            }

            if head_ptr == tail.ptr::<Node<T>>() {
                // Tail lags behind head; help it advance and retry.
                let advanced = tail.with_next_tag(next);
                let _ =
                    self.tail
                        .0
                        .compare_exchange(tail, advanced, Ordering::Release, Ordering::Acquire);
                continue;
            }

            let advanced = head.with_next_tag(next);
            match self.head.0.compare_exchange(
                head,
                advanced,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    // We alone won this CAS; we alone may take `next`'s
                    // value and retire the old sentinel.
                    let value = unsafe { (*next).take() };
                    // Safety: head_ptr is no longer reachable from the
                    // queue — we just replaced head past it.
                    let old_head =
                        unsafe { std::ptr::NonNull::new_unchecked(head_ptr) };
                    unsafe { self.pool.deallocate(old_head) };
                    self.len.0.fetch_sub(1, Ordering::Relaxed);
                    return value;
                }
                Err(_) => continue,
            }
        }
    }

    /// Approximate element count (§4.3's size counter; relaxed ordering).
    pub fn len(&self) -> usize {
        self.len.0.load(Ordering::Relaxed)
    }

    /// Whether the queue is (approximately) empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live node count backing this queue, including the sentinel.
    pub fn allocated_nodes(&self) -> u64 {
        self.pool.allocated_count()
    }
}

impl<T> Default for LockFreeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for LockFreeQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
        let head = self.head.0.load(Ordering::Relaxed);
        let head_ptr = head.ptr::<Node<T>>();
        if !head_ptr.is_null() {
            // Safety: draining above guarantees no other node is reachable;
            // the sentinel is the pool's last live allocation.
            unsafe { self.pool.deallocate(std::ptr::NonNull::new_unchecked(head_ptr)) };
        }
    }
}

// Safety: all shared mutable state goes through atomics / the CAS protocol
// documented on each method.
unsafe impl<T: Send> Send for LockFreeQueue<T> {}
unsafe impl<T: Send> Sync for LockFreeQueue<T> {}
