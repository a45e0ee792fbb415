//! Audio ring buffer: fixed pre-allocated circular history of f64 samples,
//! addressed by absolute sample index. Capacity must be a power of two so the
//! physical slot is `index & mask`. No dynamic allocation after construction.
//!
//! The buffer is lossy: writing past capacity silently evicts the oldest
//! samples. Readers must expect ranges to disappear between calls.

use parking_lot::Mutex;

use crate::error::{ScopeError, ScopeResult};

struct RingState {
    buffer: Box<[f64]>,
    oldest: u64,
    newest: u64,
    empty: bool,
}

impl RingState {
    #[inline]
    fn contains(&self, start: u64, end: u64) -> bool {
        !self.empty && start <= end && start >= self.oldest && end <= self.newest + 1
    }

    #[inline]
    fn store(&mut self, index: u64, value: f64, capacity: u64, mask: u64) {
        self.buffer[(index & mask) as usize] = value;

        if self.empty {
            self.oldest = index;
            self.newest = index;
            self.empty = false;
            return;
        }

        if index > self.newest {
            self.newest = index;
        }
        if self.newest - self.oldest + 1 > capacity {
            self.oldest = self.newest - capacity + 1;
        }
    }
}

/// Fixed-capacity sample history shared between the producer and the
/// acquisition thread. Every operation runs inside the buffer's own lock.
pub struct RingBuffer {
    state: Mutex<RingState>,
    capacity: usize,
    mask: u64,
}

impl RingBuffer {
    /// Create a ring holding `capacity` samples. Fails unless `capacity` is a
    /// non-zero power of two.
    pub fn new(capacity: usize) -> ScopeResult<Self> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(ScopeError::InvalidCapacity(capacity));
        }
        Ok(Self {
            state: Mutex::new(RingState {
                buffer: vec![0.0; capacity].into_boxed_slice(),
                oldest: 0,
                newest: 0,
                empty: true,
            }),
            capacity,
            mask: capacity as u64 - 1,
        })
    }

    /// Store one sample at an absolute index.
    #[inline]
    pub fn write_at(&self, index: u64, value: f64) {
        let mut state = self.state.lock();
        state.store(index, value, self.capacity as u64, self.mask);
    }

    /// Store a contiguous batch starting at `start` under a single lock.
    /// Called from the capture callback: must stay non-allocating.
    pub fn write_batch(&self, start: u64, values: &[f64]) {
        if values.is_empty() {
            return;
        }
        let capacity = self.capacity as u64;
        let mut state = self.state.lock();
        for (offset, &value) in values.iter().enumerate() {
            state.store(start + offset as u64, value, capacity, self.mask);
        }
    }

    /// Sample at `index`, or `None` if the ring is empty or `index` lies
    /// outside `[oldest, newest]`.
    #[inline]
    pub fn read_at(&self, index: u64) -> Option<f64> {
        let state = self.state.lock();
        if state.empty || index < state.oldest || index > state.newest {
            return None;
        }
        Some(state.buffer[(index & self.mask) as usize])
    }

    /// Copy the half-open range `[start, end)` into a new vector.
    pub fn read_range(&self, start: u64, end: u64) -> ScopeResult<Vec<f64>> {
        let mut out = Vec::new();
        self.read_range_into(start, end, &mut out)?;
        Ok(out)
    }

    /// Copy `[start, end)` into `out`, replacing its contents. Reuses the
    /// vector's allocation, which lets the acquisition thread keep one
    /// scratch buffer across wakeups.
    pub fn read_range_into(&self, start: u64, end: u64, out: &mut Vec<f64>) -> ScopeResult<()> {
        let state = self.state.lock();
        if !state.contains(start, end) {
            return Err(ScopeError::OutOfBounds { start, end });
        }

        out.clear();
        out.reserve((end - start) as usize);

        // At most two contiguous physical segments.
        let first = (start & self.mask) as usize;
        let len = (end - start) as usize;
        let head = len.min(self.capacity - first);
        out.extend_from_slice(&state.buffer[first..first + head]);
        out.extend_from_slice(&state.buffer[..len - head]);
        Ok(())
    }

    /// Whether `[start, end)` is fully retained right now.
    #[inline]
    pub fn has_range(&self, start: u64, end: u64) -> bool {
        self.state.lock().contains(start, end)
    }

    /// Number of retained samples.
    #[inline]
    pub fn count(&self) -> usize {
        let state = self.state.lock();
        if state.empty {
            0
        } else {
            (state.newest - state.oldest + 1) as usize
        }
    }

    /// `(oldest, newest)` read under one lock, `None` while empty.
    #[inline]
    pub fn bounds(&self) -> Option<(u64, u64)> {
        let state = self.state.lock();
        (!state.empty).then_some((state.oldest, state.newest))
    }

    pub fn oldest_index(&self) -> u64 {
        self.state.lock().oldest
    }

    pub fn newest_index(&self) -> u64 {
        self.state.lock().newest
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().empty
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
