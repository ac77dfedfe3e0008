use thiserror::Error;

/// Errors returned by ring buffer operations.
///
/// Every failing call leaves the buffer exactly as it was: there are no
/// partial writes and no partial reads.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingBufferError {
    /// Not enough free space to hold the whole write
    #[error("not enough space: requested {requested} bytes, {free} free")]
    InsufficientSpace {
        /// Bytes the caller asked to write
        requested: usize,
        /// Bytes free at the time of the call
        free: usize,
    },

    /// Not enough buffered data to satisfy the whole read or peek
    #[error("not enough data: requested {requested} bytes, {available} available")]
    InsufficientData {
        /// Bytes the caller asked to read
        requested: usize,
        /// Bytes buffered at the time of the call
        available: usize,
    },

    /// Capacity below the minimum of two bytes
    #[error("invalid capacity {capacity}: a ring buffer needs at least 2 bytes")]
    InvalidCapacity {
        /// Capacity that was requested
        capacity: usize,
    },
}

/// Convenience alias for results carrying a [`RingBufferError`].
pub type Result<T> = std::result::Result<T, RingBufferError>;
