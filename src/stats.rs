use std::fmt;

/// Point-in-time view of a ring buffer's cursors and fill level.
///
/// Offsets are relative to the start of the backing storage, so `start` is
/// always 0 and `end` is the offset of the last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Offset of the first byte of storage
    pub start: usize,
    /// Offset of the last byte of storage
    pub end: usize,
    /// Read cursor offset
    pub read_pos: usize,
    /// Write cursor offset
    pub write_pos: usize,
    /// Total storage size in bytes
    pub capacity: usize,
    /// Bytes that can currently be written
    pub free: usize,
    /// Bytes that can currently be read
    pub used: usize,
}

impl Stats {
    /// Bytes the buffer can hold at most; one byte is reserved.
    pub fn usable(&self) -> usize {
        self.capacity.saturating_sub(1)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============= CB STATS =============")?;
        writeln!(f, "start offset  {:#010x}", self.start)?;
        writeln!(f, "end offset    {:#010x}", self.end)?;
        writeln!(f, "read offset   {:#010x}", self.read_pos)?;
        writeln!(f, "write offset  {:#010x}", self.write_pos)?;
        writeln!(f, "cb size       {}", self.capacity)?;
        writeln!(f, "free size     {}", self.free)?;
        writeln!(f, "data size     {}", self.used)?;
        write!(f, "====================================")
    }
}
