//! Bounded FIFO experience buffer and its batched view.
//!
//! # Design
//!
//! - Timesteps are appended to a preallocated ring (no per-append reallocation)
//! - At capacity, the oldest timestep is evicted (strict FIFO)
//! - `as_batches` fixes an order over the current contents and hands out
//!   restartable batch iterators for training
//!
//! ```text
//! append ──> [ oldest ... newest ] ──> BatchedView ──> [batch 0] [batch 1] ... [short tail]
//!              ^ cursor (once full)
//! ```

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::timestep::{Timestep, TimestepBatch};

/// Fixed-capacity ring.
///
/// Fills `slots` up to capacity (reserved up front), then overwrites in place
/// at `cursor`, which always points at the oldest entry once full.
struct RingStorage<T> {
    slots: Vec<T>,
    capacity: usize,
    cursor: usize,
}

impl<T> RingStorage<T> {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Store `item`; once full, hands back the entry it displaced.
    fn push(&mut self, item: T) -> Option<T> {
        if !self.is_full() {
            self.slots.push(item);
            return None;
        }
        let evicted = std::mem::replace(&mut self.slots[self.cursor], item);
        self.cursor = (self.cursor + 1) % self.capacity;
        Some(evicted)
    }

    /// Entry `age` places after the oldest.
    fn get(&self, age: usize) -> Option<&T> {
        let len = self.slots.len();
        if age >= len {
            return None;
        }
        let oldest = if self.is_full() { self.cursor } else { 0 };
        self.slots.get((oldest + age) % len)
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}

/// Order in which a [`BatchedView`] walks the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrder {
    /// Temporal order, oldest first.
    Sequential,
    /// Seeded shuffle. Same seed and contents give the same batches.
    Shuffled { seed: u64 },
}

/// Bounded store of past timesteps.
///
/// The only memory of past interaction: estimators never keep their own copy
/// of history. Single owner, no concurrent writers.
pub struct ExperienceBuffer {
    storage: RingStorage<Timestep>,
}

impl ExperienceBuffer {
    /// Create an empty buffer holding at most `capacity` timesteps.
    ///
    /// # Panics
    /// Panics if `capacity` is zero. `AgentConfig::validate` rejects that first.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ExperienceBuffer capacity must be positive");
        Self {
            storage: RingStorage::new(capacity),
        }
    }

    /// Append a timestep, evicting the oldest at capacity.
    ///
    /// Returns the evicted timestep, if any.
    pub fn append(&mut self, timestep: Timestep) -> Option<Timestep> {
        self.storage.push(timestep)
    }

    /// Current number of timesteps.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Get buffer utilization as fraction (0.0 to 1.0).
    pub fn utilization(&self) -> f32 {
        self.len() as f32 / self.capacity() as f32
    }

    /// Timestep at position `idx`, where 0 is the oldest retained.
    pub fn get(&self, idx: usize) -> Option<&Timestep> {
        self.storage.get(idx)
    }

    pub fn oldest(&self) -> Option<&Timestep> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&Timestep> {
        self.len().checked_sub(1).and_then(|idx| self.get(idx))
    }

    /// Iterate in temporal order.
    pub fn iter(&self) -> impl Iterator<Item = &Timestep> + '_ {
        (0..self.len()).filter_map(move |idx| self.get(idx))
    }

    /// Drop all timesteps.
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// View the current contents as training batches of `batch_size`.
    ///
    /// # Panics
    /// Panics if `batch_size` is zero.
    pub fn as_batches(&self, batch_size: usize, order: BatchOrder) -> BatchedView<'_> {
        assert!(batch_size > 0, "batch_size must be positive");

        let mut indices: Vec<usize> = (0..self.len()).collect();
        if let BatchOrder::Shuffled { seed } = order {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        BatchedView {
            buffer: self,
            indices,
            batch_size,
        }
    }
}

/// Restartable batch view over an [`ExperienceBuffer`].
///
/// The order is fixed when the view is created; every call to
/// [`iter`](Self::iter) yields the same batches. All batches hold
/// `batch_size` timesteps except possibly the last.
pub struct BatchedView<'a> {
    buffer: &'a ExperienceBuffer,
    indices: Vec<usize>,
    batch_size: usize,
}

impl<'a> BatchedView<'a> {
    /// Number of batches.
    pub fn len(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Lazily build batches, cloning timesteps out of the buffer.
    pub fn iter(&self) -> impl Iterator<Item = TimestepBatch> + '_ {
        self.indices.chunks(self.batch_size).map(move |chunk| {
            TimestepBatch::new(
                chunk
                    .iter()
                    .filter_map(|&idx| self.buffer.get(idx).cloned())
                    .collect(),
            )
        })
    }

    /// Materialize every batch.
    pub fn collect_batches(&self) -> Vec<TimestepBatch> {
        self.iter().collect()
    }
}

impl<'a, 'v> IntoIterator for &'v BatchedView<'a> {
    type Item = TimestepBatch;
    type IntoIter = Box<dyn Iterator<Item = TimestepBatch> + 'v>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
