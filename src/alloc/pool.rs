//! Fixed-size memory pool (C4): slab-backed, freelist-driven, RAII-scoped.
//!
//! Grounded on the teacher's `ObjectPool<T>` / `PooledObject<T>`
//! (`innovation/custom_allocators.rs`), generalized with a compile-time
//! block size, growable slab storage, a `max_blocks` cap with an explicit
//! pool-exhausted error instead of a bare `Option`, and `shrink_to_fit`.

use std::mem::MaybeUninit;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::sources::PoolError;

struct Slab<T, const BLOCK_SIZE: usize> {
    storage: Box<[MaybeUninit<T>]>,
    /// Indices within this slab currently holding a live value.
    occupied: usize,
}

impl<T, const BLOCK_SIZE: usize> Slab<T, BLOCK_SIZE> {
    fn new() -> Self {
        let mut storage = Vec::with_capacity(BLOCK_SIZE);
        storage.resize_with(BLOCK_SIZE, MaybeUninit::uninit);
        Self {
            storage: storage.into_boxed_slice(),
            occupied: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.occupied == 0
    }
}

struct PoolInner<T, const BLOCK_SIZE: usize> {
    slabs: Vec<Slab<T, BLOCK_SIZE>>,
    /// Free slots as `(slab_index, slot_index)`, most-recently-freed last.
    free: Vec<(usize, usize)>,
    in_use: usize,
}

impl<T, const BLOCK_SIZE: usize> PoolInner<T, BLOCK_SIZE> {
    fn new() -> Self {
        Self {
            slabs: Vec::new(),
            free: Vec::new(),
            in_use: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slabs.len() * BLOCK_SIZE
    }
}

/// A growable pool of fixed-size, placement-constructed `T` slots.
///
/// Every operation locks an internal mutex; the pool is meant for use from
/// multiple threads via a shared `Arc`, not for single-thread hot paths
/// (those should use a local [`super::arena::Arena`] instead).
pub struct FixedSizeMemoryPool<T, const BLOCK_SIZE: usize> {
    inner: Mutex<PoolInner<T, BLOCK_SIZE>>,
    max_blocks: Option<usize>,
}

impl<T, const BLOCK_SIZE: usize> FixedSizeMemoryPool<T, BLOCK_SIZE> {
    /// Create an unbounded pool (slabs grow until the process runs out of
    /// memory).
    pub fn new() -> Arc<Self> {
        Self::with_max_blocks(None)
    }

    /// Create a pool capped at `max_blocks` live slots.
    pub fn with_max_blocks(max_blocks: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(PoolInner::new()),
            max_blocks,
        })
    }

    /// Placement-construct a value into a free slot, growing the pool by
    /// one slab if none is free and the cap allows it.
    ///
    /// Returns [`PoolError::Exhausted`] if `max_blocks` would be exceeded.
    pub fn create(self: &Arc<Self>, value: T) -> Result<PoolHandle<T, BLOCK_SIZE>, PoolError> {
        let mut inner = self.inner.lock();

        if inner.free.is_empty() {
            if let Some(max) = self.max_blocks {
                if inner.in_use >= max {
                    return Err(PoolError::Exhausted {
                        in_use: inner.in_use,
                        max_blocks: max,
                    });
                }
            }
            let new_slab_index = inner.slabs.len();
            inner.slabs.push(Slab::new());
            for slot in (0..BLOCK_SIZE).rev() {
                inner.free.push((new_slab_index, slot));
            }
        }

        let (slab_index, slot_index) = inner.free.pop().expect("just ensured a free slot");
        let slab = &mut inner.slabs[slab_index];
        slab.storage[slot_index].write(value);
        slab.occupied += 1;
        inner.in_use += 1;

        Ok(PoolHandle {
            pool: Arc::clone(self),
            slab_index,
            slot_index,
        })
    }

    /// Remove trailing slabs that hold no live slots.
    pub fn shrink_to_fit(&self) {
        let mut inner = self.inner.lock();
        while matches!(inner.slabs.last(), Some(slab) if slab.is_empty()) {
            let removed = inner.slabs.pop().unwrap();
            drop(removed);
            let removed_index = inner.slabs.len();
            inner.free.retain(|(slab_index, _)| *slab_index != removed_index);
        }
    }

    /// Live (checked-out) slot count.
    pub fn in_use(&self) -> usize {
        self.inner.lock().in_use
    }

    /// Total slot capacity across all slabs, whether free or in use.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    fn release(&self, slab_index: usize, slot_index: usize) {
        let mut inner = self.inner.lock();
        // Safety: a `PoolHandle` holding these indices is the unique owner
        // of this slot's value; dropping the handle is the one place this
        // is called, and exactly once.
        unsafe {
            inner.slabs[slab_index].storage[slot_index].assume_init_drop();
        }
        inner.slabs[slab_index].occupied -= 1;
        inner.in_use -= 1;
        inner.free.push((slab_index, slot_index));
    }
}

/// A scoped handle to a pool-owned value. Dropping it runs the value's
/// destructor and returns the slot to the pool's freelist.
pub struct PoolHandle<T, const BLOCK_SIZE: usize> {
    pool: Arc<FixedSizeMemoryPool<T, BLOCK_SIZE>>,
    slab_index: usize,
    slot_index: usize,
}

impl<T, const BLOCK_SIZE: usize> std::ops::Deref for PoolHandle<T, BLOCK_SIZE> {
    type Target = T;

    fn deref(&self) -> &T {
        let inner = self.pool.inner.lock();
        // Safety: this handle's slot was written in `create` and not yet
        // released; the returned reference does not outlive the guard's
        // scope by construction (it is re-derived from raw storage below).
        let slab = &inner.slabs[self.slab_index];
        unsafe {
            let ptr = slab.storage[self.slot_index].as_ptr();
            &*ptr
        }
    }
}

impl<T, const BLOCK_SIZE: usize> std::ops::DerefMut for PoolHandle<T, BLOCK_SIZE> {
    fn deref_mut(&mut self) -> &mut T {
        let mut inner = self.pool.inner.lock();
        let slab = &mut inner.slabs[self.slab_index];
        unsafe {
            let ptr = slab.storage[self.slot_index].as_mut_ptr();
            &mut *ptr
        }
    }
}

impl<T, const BLOCK_SIZE: usize> Drop for PoolHandle<T, BLOCK_SIZE> {
    fn drop(&mut self) {
        self.pool.release(self.slab_index, self.slot_index);
    }
}
