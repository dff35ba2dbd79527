//! Indicator value buffer and its pool
//!
//! A `ValueBuffer` collects the distinct indicator values that scanners extract
//! while one record is encoded. Buffers are recycled through a `BufferPool`;
//! the `PooledBuffer` guard returns a buffer on every exit path.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::field::FieldId;

#[derive(Debug, Clone, Default)]
struct Slot {
    values: Vec<String>,
    sorted: bool,
}

/// Multimap from field id to distinct, non-empty string values.
///
/// Values keep insertion order while written and are sorted on read, so two
/// encodes of the same data render identically.
#[derive(Debug, Clone, Default)]
pub struct ValueBuffer {
    slots: BTreeMap<FieldId, Slot>,
    dirty: bool,
}

impl ValueBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values for `id`, skipping empty strings and values already present
    pub fn write_values<I, S>(&mut self, id: FieldId, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for value in values {
            self.write_value(id, value.as_ref());
        }
    }

    pub fn write_value(&mut self, id: FieldId, value: &str) {
        if value.is_empty() {
            return;
        }
        let slot = self.slots.entry(id).or_default();
        if slot.values.iter().any(|v| v == value) {
            return;
        }
        slot.values.push(value.to_string());
        slot.sorted = false;
        self.dirty = true;
    }

    /// Sorted values for `id`, `None` if nothing was written
    pub fn get(&mut self, id: FieldId) -> Option<&[String]> {
        let slot = self.slots.get_mut(&id)?;
        if slot.values.is_empty() {
            return None;
        }
        if !slot.sorted {
            slot.values.sort_unstable();
            slot.sorted = true;
        }
        Some(&slot.values)
    }

    pub fn contains(&self, id: FieldId, value: &str) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slot| slot.values.iter().any(|v| v == value))
    }

    /// Ids holding at least one value, in ascending order
    pub fn fields(&self) -> Vec<FieldId> {
        self.slots
            .iter()
            .filter(|(_, slot)| !slot.values.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(|slot| slot.values.is_empty())
    }

    /// Clear all values, keeping the allocated slots for reuse
    pub fn reset(&mut self) {
        for slot in self.slots.values_mut() {
            slot.values.clear();
            slot.sorted = true;
        }
        self.dirty = false;
    }
}

/// Thread-safe free list of value buffers
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<ValueBuffer>>,
    max_idle: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IDLE)
    }
}

impl BufferPool {
    pub const DEFAULT_MAX_IDLE: usize = 64;

    /// Pool that keeps at most `max_idle` buffers around
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Pool pre-filled with `initial` buffers (capped at `max_idle`)
    pub fn with_initial(max_idle: usize, initial: usize) -> Self {
        let count = initial.min(max_idle);
        Self {
            free: Mutex::new((0..count).map(|_| ValueBuffer::new()).collect()),
            max_idle,
        }
    }

    /// Process-wide pool
    pub fn global() -> &'static BufferPool {
        static POOL: OnceLock<BufferPool> = OnceLock::new();
        POOL.get_or_init(BufferPool::default)
    }

    /// Borrow a buffer; it is reset and returned when the guard drops
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = self.free.lock().pop().unwrap_or_default();
        PooledBuffer {
            pool: self,
            buffer,
            detached: false,
        }
    }

    /// Return a buffer to the pool.
    ///
    /// The buffer is reset first. Buffers beyond `max_idle` are dropped.
    pub fn release(&self, mut buffer: ValueBuffer) {
        buffer.reset();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(buffer);
        }
    }

    /// Number of buffers waiting in the pool
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}

/// Scoped checkout of a pooled `ValueBuffer`
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: ValueBuffer,
    detached: bool,
}

impl PooledBuffer<'_> {
    /// Detach the buffer from the pool; it will not be returned on drop
    pub fn into_inner(mut self) -> ValueBuffer {
        self.detached = true;
        std::mem::take(&mut self.buffer)
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = ValueBuffer;

    fn deref(&self) -> &ValueBuffer {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut ValueBuffer {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if !self.detached {
            self.pool.release(std::mem::take(&mut self.buffer));
        }
    }
}
