//! Node pool (C2): a lock-free Treiber-stack freelist of reusable queue
//! nodes, backing the MPMC queue's per-push/pop allocation.
//!
//! Grounded on the teacher's cache-line-padded `LockFreeReceiptQueue` node
//! (`innovation/lockfree.rs`), generalized to a standalone pool shared by
//! push and pop so nodes recycle instead of round-tripping through the
//! global allocator on every operation.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use super::tagged_ptr::{AtomicTaggedPtr, Packed};

/// A node in the lock-free queue: one task slot plus a `next` link.
///
/// A node is owned by exactly one container at a time — the pool's
/// freelist, or the queue — never both (§3).
pub struct Node<T> {
    data: std::cell::UnsafeCell<Option<T>>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn empty() -> Box<Self> {
        Box::new(Node {
            data: std::cell::UnsafeCell::new(None),
            next: AtomicPtr::new(std::ptr::null_mut()),
        })
    }

    /// Store a value into this node's data slot.
    ///
    /// # Safety
    /// The caller must hold exclusive logical access to this node (it must
    /// not be concurrently reachable from the queue or another thread).
    pub unsafe fn set(&self, value: T) {
        *self.data.get() = Some(value);
    }

    /// Take the value out of this node's data slot, leaving `None`.
    ///
    /// # Safety
    /// The caller must be the unique winner of the CAS that made this node's
    /// data the logical head of the queue (see [`super::queue::LockFreeQueue::pop`]).
    pub unsafe fn take(&self) -> Option<T> {
        (*self.data.get()).take()
    }

    /// Load the `next` pointer.
    pub fn next(&self, order: Ordering) -> *mut Node<T> {
        self.next.load(order)
    }

    /// Store the `next` pointer.
    pub fn set_next(&self, next: *mut Node<T>, order: Ordering) {
        self.next.store(next, order);
    }

    /// Compare-and-swap the `next` pointer.
    pub fn cas_next(
        &self,
        current: *mut Node<T>,
        new: *mut Node<T>,
        success: Ordering,
        failure: Ordering,
    ) -> Result<*mut Node<T>, *mut Node<T>> {
        self.next.compare_exchange(current, new, success, failure)
    }
}

/// A lock-free Treiber stack of free [`Node`]s.
///
/// `allocate()` pops a node from the freelist, falling back to a fresh heap
/// allocation when the freelist is empty. `deallocate()` pushes a node back.
/// Nodes are never returned to the OS while the pool is alive — destruction
/// of the pool frees everything still on the freelist at once.
pub struct NodePool<T> {
    free_head: AtomicTaggedPtr<Node<T>>,
    allocated_count: AtomicU64,
    total_allocations: AtomicU64,
}

impl<T> NodePool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            free_head: AtomicTaggedPtr::new(std::ptr::null_mut(), 0),
            allocated_count: AtomicU64::new(0),
            total_allocations: AtomicU64::new(0),
        }
    }

    /// Allocate a node: pop from the freelist, or mint a fresh one.
    pub fn allocate(&self) -> NonNull<Node<T>> {
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            let head_ptr = head.ptr::<Node<T>>();

            if head_ptr.is_null() {
                let fresh = Box::into_raw(Node::empty());
                self.total_allocations.fetch_add(1, Ordering::Relaxed);
                self.allocated_count.fetch_add(1, Ordering::Relaxed);
                // Safety: just boxed, never null.
                return unsafe { NonNull::new_unchecked(fresh) };
            }

            // Safety: head_ptr came from a live freelist entry; nodes are
            // never freed individually while the pool lives.
            let next = unsafe { (*head_ptr).next(Ordering::Acquire) };
            let desired = head.with_next_tag(next);

            if self
                .free_head
                .compare_exchange(head, desired, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.allocated_count.fetch_add(1, Ordering::Relaxed);
                return unsafe { NonNull::new_unchecked(head_ptr) };
            }
        }
    }

    /// Return a node to the freelist.
    ///
    /// # Safety
    /// `node` must not be reachable from anywhere else (queue, another
    /// thread's local variable) once this call begins.
    pub unsafe fn deallocate(&self, node: NonNull<Node<T>>) {
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            node.as_ref().set_next(head.ptr(), Ordering::Relaxed);
            let desired = head.with_next_tag(node.as_ptr());
            if self
                .free_head
                .compare_exchange(head, desired, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.allocated_count.fetch_sub(1, Ordering::Relaxed);
                return;
            }
        }
    }

    /// Nodes currently checked out (live).
    pub fn allocated_count(&self) -> u64 {
        self.allocated_count.load(Ordering::Relaxed)
    }

    /// Total nodes ever minted fresh (excludes freelist reuse).
    pub fn total_allocations(&self) -> u64 {
        self.total_allocations.load(Ordering::Relaxed)
    }
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for NodePool<T> {
    fn drop(&mut self) {
        let mut current = self.free_head.load(Ordering::Relaxed).ptr::<Node<T>>();
        while !current.is_null() {
            // Safety: sole owner at drop time; no concurrent access possible.
            let next = unsafe { (*current).next(Ordering::Relaxed) };
            unsafe { drop(Box::from_raw(current)) };
            current = next;
        }
    }
}

// Safety: all mutation goes through atomics or is guarded by the CAS
// protocol documented on each method.
unsafe impl<T: Send> Send for NodePool<T> {}
unsafe impl<T: Send> Sync for NodePool<T> {}
