use std::sync::Arc;
use std::thread;

use cirbuf::{RingBuffer, RingBufferError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn basic_single_thread_roundtrip() {
    let rb = RingBuffer::new(1024).expect("new");

    assert_eq!(rb.write(b"hello").expect("write"), 5);

    let mut out = [0u8; 5];
    assert_eq!(rb.read(&mut out).expect("read"), 5);
    assert_eq!(&out, b"hello");
    assert!(rb.is_empty());
}

#[test]
fn wraparound_preserves_order() {
    let rb = RingBuffer::new(8).unwrap();

    rb.write(&[1, 2, 3, 4, 5]).unwrap();
    assert_eq!(rb.stats().write_pos, 5);

    let mut first = [0u8; 3];
    rb.read(&mut first).unwrap();
    assert_eq!(first, [1, 2, 3]);
    assert_eq!(rb.stats().read_pos, 3);
    assert_eq!(rb.used_bytes(), 2);

    // 7 usable - 2 used = 5 free, so this fits and wraps
    assert_eq!(rb.free_bytes(), 5);
    rb.write(&[6, 7, 8, 9, 10]).unwrap();
    assert_eq!(rb.stats().write_pos, 2);

    let mut rest = [0u8; 7];
    rb.read(&mut rest).unwrap();
    assert_eq!(rest, [4, 5, 6, 7, 8, 9, 10]);
}

#[test]
fn exact_fit_at_boundary_wraps_to_zero() {
    let rb = RingBuffer::new(8).unwrap();

    rb.write(&[0; 7]).unwrap();
    let mut drain = [0u8; 7];
    rb.read(&mut drain).unwrap();
    assert_eq!(rb.stats().write_pos, 7);

    rb.write(&[1]).unwrap();
    assert_eq!(rb.stats().write_pos, 0);
}

#[test]
fn only_capacity_minus_one_bytes_are_usable() {
    // The reserved byte keeps "full" distinguishable from "empty".
    let rb = RingBuffer::new(16).unwrap();

    assert_eq!(
        rb.write(&[0; 16]).unwrap_err(),
        RingBufferError::InsufficientSpace {
            requested: 16,
            free: 15
        }
    );
    rb.write(&[0; 15]).unwrap();
    assert!(rb.is_full());
    assert_eq!(rb.free_bytes(), 0);
}

#[test]
fn flush_allows_full_write_from_any_position() {
    let rb = RingBuffer::new(8).unwrap();

    rb.write(&[1, 2, 3, 4, 5, 6]).unwrap();
    let mut out = [0u8; 4];
    rb.read(&mut out).unwrap();
    rb.write(&[7, 8, 9]).unwrap();

    rb.flush();
    let stats = rb.stats();
    assert_eq!((stats.read_pos, stats.write_pos, stats.used), (0, 0, 0));

    rb.write(&[0xAB; 7]).unwrap();
    let mut all = [0u8; 7];
    rb.read(&mut all).unwrap();
    assert_eq!(all, [0xAB; 7]);
}

#[test]
fn peek_then_read_return_same_bytes() {
    let rb = RingBuffer::new(32).unwrap();
    rb.write(b"\x00\x05hello").unwrap();

    let mut len_prefix = [0u8; 2];
    rb.peek(&mut len_prefix).unwrap();
    let body_len = u16::from_be_bytes(len_prefix) as usize;
    assert_eq!(body_len, 5);

    let mut frame = vec![0u8; 2 + body_len];
    let mut peeked = frame.clone();
    rb.peek(&mut peeked).unwrap();
    rb.read(&mut frame).unwrap();
    assert_eq!(frame, peeked);
    assert_eq!(&frame[2..], b"hello");
}

/// Producer and consumer threads move a random byte stream through a small
/// buffer using random chunk sizes, then compare both ends.
fn stream_through(capacity: usize, total: usize, seed: u64, use_peek: bool) {
    let rb = Arc::new(RingBuffer::new(capacity).unwrap());
    let mut rng = StdRng::seed_from_u64(seed);
    let source: Vec<u8> = (0..total).map(|_| rng.gen()).collect();
    let source = Arc::new(source);

    let producer = {
        let rb = Arc::clone(&rb);
        let source = Arc::clone(&source);
        thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(seed ^ 0x5EED);
            let mut sent = 0;
            while sent < source.len() {
                let len = rng.gen_range(0..capacity).min(source.len() - sent);
                match rb.write(&source[sent..sent + len]) {
                    Ok(n) => {
                        assert_eq!(n, len);
                        sent += n;
                    }
                    Err(RingBufferError::InsufficientSpace { requested, free }) => {
                        assert!(free < requested);
                        thread::yield_now();
                    }
                    Err(e) => panic!("Unexpected error: {:?}", e),
                }
                assert!(rb.used_bytes() < capacity);
            }
        })
    };

    let mut rng = StdRng::seed_from_u64(seed ^ 0xC0FFEE);
    let mut received = vec![0u8; total];
    let mut scratch = vec![0u8; capacity];
    let mut got = 0;
    while got < total {
        let len = rng.gen_range(0..capacity).min(total - got);

        if use_peek && rb.peek(&mut scratch[..len]).is_ok() {
            // Single consumer: nothing else can advance the read cursor
            rb.read(&mut received[got..got + len]).unwrap();
            assert_eq!(&scratch[..len], &received[got..got + len]);
            got += len;
            continue;
        }

        match rb.read(&mut received[got..got + len]) {
            Ok(n) => got += n,
            Err(RingBufferError::InsufficientData { .. }) => thread::yield_now(),
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
        assert_eq!(&received[..got], &source[..got]);
    }

    producer.join().unwrap();
    assert_eq!(received.as_slice(), source.as_slice());
    assert!(rb.is_empty());
}

#[test]
fn concurrent_stream_with_random_chunks() {
    stream_through(32, 64 * 1024, 7, false);
}

#[test]
fn concurrent_stream_with_peek() {
    stream_through(32, 64 * 1024, 11, true);
}

#[test]
fn concurrent_stream_tiny_capacity() {
    stream_through(2, 4 * 1024, 3, false);
}

#[test]
fn concurrent_stream_large_capacity() {
    stream_through(4096, 1 << 20, 99, true);
}
