//! # cirbuf - mutex-guarded byte ring buffer
//!
//! A fixed-capacity circular byte buffer for handing data from a producer
//! thread to a consumer thread running at a different rate.
//!
//! ## Design
//!
//! - Storage allocated once at construction, never resized
//! - Index cursors advanced modulo capacity; copies that cross the physical
//!   end are split in two
//! - A single lock serializes every operation, copy included
//! - Fail-fast: a write that does not fit, or a read/peek asking for more than
//!   is buffered, returns an error and leaves the buffer untouched
//! - One byte is reserved, so equal cursors always mean "empty" and at most
//!   `capacity - 1` bytes are buffered
//!
//! ## Example
//!
//! ```
//! use cirbuf::{RingBuffer, RingBufferError};
//!
//! // 8 bytes of storage, 7 usable
//! let rb = RingBuffer::new(8).unwrap();
//!
//! // Producer side
//! rb.write(b"hello").unwrap();
//!
//! // Consumer side: look first, then consume
//! let mut header = [0u8; 2];
//! rb.peek(&mut header).unwrap();
//! assert_eq!(&header, b"he");
//!
//! let mut out = [0u8; 5];
//! rb.read(&mut out).unwrap();
//! assert_eq!(&out, b"hello");
//!
//! // Nothing left to read
//! assert!(matches!(
//!     rb.read(&mut out),
//!     Err(RingBufferError::InsufficientData { .. })
//! ));
//! ```

#![warn(missing_docs)]

mod error;
mod ring_buffer;
mod stats;

pub use error::{Result, RingBufferError};
pub use ring_buffer::{RingBuffer, MIN_CAPACITY};
pub use stats::Stats;
