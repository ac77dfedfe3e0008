//! Producer/consumer soak harness: streams a file through a small ring buffer
//! with random chunk sizes and checks that the bytes come out unchanged.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context};
use cirbuf::{RingBuffer, RingBufferError, Stats};
use clap::Parser;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, Level};

/// Log a stats snapshot every this many successful operations
const STATS_EVERY: u64 = 1024;

#[derive(Parser, Debug)]
#[command(
    name = "cirbuf-soak",
    about = "Stream a file through a ring buffer from a producer to a consumer thread."
)]
struct Args {
    /// File whose bytes are streamed through the buffer
    #[arg(long)]
    input: PathBuf,

    /// Ring buffer capacity in bytes (one byte is reserved)
    #[arg(long, default_value = "32")]
    capacity: usize,

    /// Largest random chunk size, between 1 and capacity - 1 (defaults to capacity - 1)
    #[arg(long)]
    max_chunk: Option<usize>,

    /// Random seed; producer and consumer derive their own streams from it
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Directory receiving the `in_cir` and `out` dumps
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip the consumer's peek-then-read step
    #[arg(long)]
    no_peek: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let source = fs::read(&args.input)
        .with_context(|| format!("failed to read input {}", args.input.display()))?;
    let rb = RingBuffer::new(args.capacity).context("failed to create ring buffer")?;
    let max_chunk = resolve_max_chunk(args.max_chunk, rb.capacity())?;

    info!(
        input = %args.input.display(),
        bytes = source.len(),
        capacity = args.capacity,
        max_chunk,
        seed = args.seed,
        "starting soak"
    );

    let start = Instant::now();
    let mut sink = vec![0u8; source.len()];

    stream(&rb, &source, &mut sink, max_chunk, args.seed, !args.no_peek)?;

    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("failed to create output dir {}", args.output_dir.display())
    })?;
    let in_path = args.output_dir.join("in_cir");
    let out_path = args.output_dir.join("out");
    fs::write(&in_path, &source)
        .with_context(|| format!("failed to write {}", in_path.display()))?;
    fs::write(&out_path, &sink)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    info!("final buffer state\n{}", rb.stats());

    if sink != source {
        bail!(
            "producer and consumer streams differ ({} bytes)",
            source.len()
        );
    }

    info!(
        bytes = source.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "streams match"
    );
    Ok(())
}

/// Chunk sizes are drawn from `1..=max_chunk`, so every draw can make progress
/// and no draw can exceed what an empty buffer accepts.
fn resolve_max_chunk(requested: Option<usize>, capacity: usize) -> anyhow::Result<usize> {
    let usable = capacity - 1;
    let max_chunk = requested.unwrap_or(usable);
    if max_chunk == 0 || max_chunk > usable {
        bail!("max chunk must be between 1 and {usable}, got {max_chunk}");
    }
    Ok(max_chunk)
}

/// Runs a producer thread against the consumer on the calling thread until
/// `sink` holds every byte of `source`.
///
/// The producer is told to stop as soon as the consumer fails, otherwise it
/// would spin forever against a buffer nobody drains.
fn stream(
    rb: &RingBuffer,
    source: &[u8],
    sink: &mut [u8],
    max_chunk: usize,
    seed: u64,
    use_peek: bool,
) -> anyhow::Result<()> {
    let stop = AtomicBool::new(false);

    thread::scope(|s| -> anyhow::Result<()> {
        let producer = s.spawn(|| produce(rb, source, max_chunk, seed, &stop));
        let consumed = consume(rb, source, sink, max_chunk, seed, use_peek);
        if consumed.is_err() {
            stop.store(true, Ordering::Relaxed);
        }

        match producer.join() {
            Ok(sent) => debug!(sent, "producer finished"),
            Err(_) => bail!("producer thread panicked"),
        }
        consumed
    })
}

/// Writes `source` in random-sized chunks, retrying whenever the buffer is
/// full, until everything is sent or `stop` is raised.
fn produce(
    rb: &RingBuffer,
    source: &[u8],
    max_chunk: usize,
    seed: u64,
    stop: &AtomicBool,
) -> usize {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sent = 0;
    let mut ops = 0u64;

    while sent < source.len() {
        if stop.load(Ordering::Relaxed) {
            debug!(sent, "producer stopped");
            break;
        }
        let len = rng.gen_range(1..=max_chunk).min(source.len() - sent);
        match rb.write(&source[sent..sent + len]) {
            Ok(n) => {
                sent += n;
                ops += 1;
                debug!(written = n, sent, "producer chunk");
                if ops % STATS_EVERY == 0 {
                    log_stats(&rb.stats());
                }
            }
            Err(e) => {
                debug!(error = %e, "producer retrying");
                thread::yield_now();
            }
        }
    }
    sent
}

/// Drains the buffer into `sink`, alternating plain reads with
/// peek-then-read, and checks every consumed chunk against `source`.
fn consume(
    rb: &RingBuffer,
    source: &[u8],
    sink: &mut [u8],
    max_chunk: usize,
    seed: u64,
    use_peek: bool,
) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut scratch = vec![0u8; max_chunk];
    let mut got = 0;

    while got < sink.len() {
        let len = rng.gen_range(1..=max_chunk).min(sink.len() - got);
        match rb.read(&mut sink[got..got + len]) {
            Ok(n) => {
                check_range(source, sink, got, got + n)?;
                got += n;
                debug!(read = n, got, "consumer chunk");
            }
            Err(RingBufferError::InsufficientData { .. }) => thread::yield_now(),
            Err(e) => return Err(e.into()),
        }

        if !use_peek {
            continue;
        }

        if got == sink.len() {
            break;
        }
        let len = rng.gen_range(1..=max_chunk).min(sink.len() - got);
        let peeked = &mut scratch[..len];
        if rb.peek(peeked).is_err() {
            continue;
        }
        // only this thread consumes, so the peeked bytes are still next in line
        rb.read(&mut sink[got..got + len])
            .context("read after successful peek failed")?;
        if peeked[..] != sink[got..got + len] {
            bail!("peeked bytes differ from read bytes at offset {got}");
        }
        check_range(source, sink, got, got + len)?;
        got += len;
        debug!(peeked = len, got, "consumer peek+read");
    }
    Ok(())
}

fn check_range(source: &[u8], sink: &[u8], from: usize, to: usize) -> anyhow::Result<()> {
    if source[from..to] != sink[from..to] {
        bail!("consumer stream diverged between bytes {from} and {to}");
    }
    Ok(())
}

fn log_stats(stats: &Stats) {
    debug!(
        read_pos = stats.read_pos,
        write_pos = stats.write_pos,
        free = stats.free,
        used = stats.used,
        "ring stats"
    );
}
