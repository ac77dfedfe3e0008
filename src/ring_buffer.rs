use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Result, RingBufferError};
use crate::stats::Stats;

/// Smallest capacity a ring buffer can be created with
///
/// One byte is always reserved so that equal cursors can only mean "empty".
pub const MIN_CAPACITY: usize = 2;

/// Storage and cursors, only ever touched with the lock held
struct Ring {
    /// Backing storage, fixed length for the lifetime of the buffer
    storage: Box<[u8]>,
    /// Offset of the next byte to read
    read_cursor: usize,
    /// Offset of the next byte to write
    write_cursor: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            read_cursor: 0,
            write_cursor: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.storage.len()
    }

    fn used(&self) -> usize {
        if self.write_cursor >= self.read_cursor {
            self.write_cursor - self.read_cursor
        } else {
            self.capacity() - self.read_cursor + self.write_cursor
        }
    }

    fn free(&self) -> usize {
        self.capacity() - 1 - self.used()
    }

    fn advance(&self, cursor: usize, len: usize) -> usize {
        (cursor + len) % self.capacity()
    }

    /// Copy `src` into storage starting at the write cursor.
    ///
    /// Caller must have checked that `src.len() <= self.free()`.
    fn copy_in(&mut self, src: &[u8]) {
        let at = self.write_cursor;
        let tail = self.capacity() - at;

        if src.len() <= tail {
            self.storage[at..at + src.len()].copy_from_slice(src);
        } else {
            // wraps past the physical end
            let (first, second) = src.split_at(tail);
            self.storage[at..].copy_from_slice(first);
            self.storage[..second.len()].copy_from_slice(second);
        }
    }

    /// Copy `dst.len()` bytes out of storage starting at the read cursor.
    ///
    /// Caller must have checked that `dst.len() <= self.used()`.
    fn copy_out(&self, dst: &mut [u8]) {
        let at = self.read_cursor;
        let tail = self.capacity() - at;

        if dst.len() <= tail {
            dst.copy_from_slice(&self.storage[at..at + dst.len()]);
        } else {
            let (first, second) = dst.split_at_mut(tail);
            first.copy_from_slice(&self.storage[at..]);
            second.copy_from_slice(&self.storage[..second.len()]);
        }
    }

    fn ensure_data(&self, requested: usize) -> Result<()> {
        let available = self.used();
        if available < requested {
            return Err(RingBufferError::InsufficientData {
                requested,
                available,
            });
        }
        Ok(())
    }

    fn stats(&self) -> Stats {
        Stats {
            start: 0,
            end: self.capacity() - 1,
            read_pos: self.read_cursor,
            write_pos: self.write_cursor,
            capacity: self.capacity(),
            free: self.free(),
            used: self.used(),
        }
    }
}

/// Fixed-capacity byte ring buffer guarded by a single mutex
///
/// - Any number of threads may share it (typically one producer, one consumer)
/// - Every operation holds the lock for its whole critical section, copy included
/// - Requests are all-or-nothing: a call either moves every requested byte or
///   fails without touching the buffer
/// - One byte of capacity is reserved, so at most `capacity - 1` bytes are
///   buffered at any time
pub struct RingBuffer {
    ring: Mutex<Ring>,
    capacity: usize,
}

impl RingBuffer {
    /// Create a ring buffer backed by `capacity` bytes of storage
    ///
    /// # Returns
    /// * `Ok(RingBuffer)` on success
    /// * `Err(RingBufferError::InvalidCapacity)` if `capacity` is below [`MIN_CAPACITY`]
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_CAPACITY {
            return Err(RingBufferError::InvalidCapacity { capacity });
        }

        Ok(RingBuffer {
            ring: Mutex::new(Ring::new(capacity)),
            capacity,
        })
    }

    /// Write all of `data` into the buffer
    ///
    /// # Returns
    /// * `Ok(data.len())` once every byte has been copied in
    /// * `Err(RingBufferError::InsufficientSpace)` if fewer than `data.len()`
    ///   bytes are free; nothing is written
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut ring = self.ring.lock();

        let free = ring.free();
        if free < data.len() {
            debug!(requested = data.len(), free, "ring buffer write rejected");
            return Err(RingBufferError::InsufficientSpace {
                requested: data.len(),
                free,
            });
        }

        ring.copy_in(data);
        let next = ring.advance(ring.write_cursor, data.len());
        ring.write_cursor = next;

        trace!(
            len = data.len(),
            write_pos = ring.write_cursor,
            "ring buffer write"
        );
        Ok(data.len())
    }

    /// Read exactly `dst.len()` bytes, consuming them
    ///
    /// # Returns
    /// * `Ok(dst.len())` once `dst` has been filled
    /// * `Err(RingBufferError::InsufficientData)` if fewer than `dst.len()`
    ///   bytes are buffered; the read cursor does not move
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        let mut ring = self.ring.lock();

        if let Err(e) = ring.ensure_data(dst.len()) {
            debug!(error = %e, "ring buffer read rejected");
            return Err(e);
        }

        ring.copy_out(dst);
        let next = ring.advance(ring.read_cursor, dst.len());
        ring.read_cursor = next;

        trace!(len = dst.len(), read_pos = ring.read_cursor, "ring buffer read");
        Ok(dst.len())
    }

    /// Copy the next `dst.len()` bytes without consuming them
    ///
    /// A following [`read`](Self::read) of the same length returns the same
    /// bytes, as long as no other reader runs in between.
    ///
    /// # Returns
    /// * `Ok(dst.len())` once `dst` has been filled
    /// * `Err(RingBufferError::InsufficientData)` if fewer than `dst.len()`
    ///   bytes are buffered
    pub fn peek(&self, dst: &mut [u8]) -> Result<usize> {
        let ring = self.ring.lock();

        if let Err(e) = ring.ensure_data(dst.len()) {
            debug!(error = %e, "ring buffer peek rejected");
            return Err(e);
        }

        ring.copy_out(dst);

        trace!(len = dst.len(), read_pos = ring.read_cursor, "ring buffer peek");
        Ok(dst.len())
    }

    /// Discard all buffered data by moving both cursors back to the start
    ///
    /// Storage is not cleared.
    pub fn flush(&self) {
        let mut ring = self.ring.lock();
        let discarded = ring.used();
        ring.read_cursor = 0;
        ring.write_cursor = 0;
        debug!(discarded, "ring buffer flushed");
    }

    /// Snapshot of cursors and fill level
    pub fn stats(&self) -> Stats {
        self.ring.lock().stats()
    }

    /// Total storage size in bytes, including the reserved byte
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes that can be written right now
    pub fn free_bytes(&self) -> usize {
        self.ring.lock().free()
    }

    /// Bytes that can be read right now
    pub fn used_bytes(&self) -> usize {
        self.ring.lock().used()
    }

    /// Whether no data is buffered
    pub fn is_empty(&self) -> bool {
        self.used_bytes() == 0
    }

    /// Whether no further byte can be written
    pub fn is_full(&self) -> bool {
        self.free_bytes() == 0
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ring = self.ring.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("read_cursor", &ring.read_cursor)
            .field("write_cursor", &ring.write_cursor)
            .field("used", &ring.used())
            .finish()
    }
}
