//! Hybrid scrollback store
//!
//! Lines that scroll off the visible region land here. The most recent
//! lines live in a fixed-capacity in-memory ring; when the store is
//! disk-backed, every line is also appended to a newline-delimited JSON
//! log and older lines are read back on demand through a bounded cache
//! window. Without disk backing, lines older than the ring are gone.
//!
//! The store is safe to share between the PTY-reading thread (push) and
//! a rendering thread (line/lines/count): all mutable state sits behind
//! one mutex, and read paths open their own short-lived file handles so
//! they never disturb the writer's append position.
//!
//! Disk format: one JSON array per line, each cell a 4-tuple
//! `[codepoint, packed_fg, packed_bg, attr_bits]`, trailing blank cells
//! trimmed. The color packing is defined in [`crate::color`]. This
//! encoding is persisted and must round-trip exactly.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::cell::{Cell, CellFlags};
use crate::color::{pack_color, unpack_color};
use crate::line::Line;

/// Lines kept fully in memory
pub const RING_CAPACITY: usize = 100;

/// Size of the look-aside window for disk reads
pub const CACHE_WINDOW_LINES: usize = 1000;

/// Hard cap on the disk log before trimming kicks in
pub const MAX_LOG_BYTES: u64 = 5 * 1024 * 1024;

/// Bytes of tail retained by a trim
pub const TRIM_RETAIN_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ScrollbackError {
    #[error("scrollback I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("scrollback encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Fixed-capacity ring of the most recent lines
#[derive(Debug)]
struct Ring {
    lines: Vec<Line>,
    start: usize,
    len: usize,
    capacity: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Ring {
            lines: Vec::new(),
            start: 0,
            len: 0,
            capacity,
        }
    }

    fn push(&mut self, line: Line) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() < self.capacity {
            self.lines.push(line);
            self.len += 1;
        } else {
            let index = (self.start + self.len) % self.capacity;
            self.lines[index] = line;
            if self.len == self.capacity {
                self.start = (self.start + 1) % self.capacity;
            } else {
                self.len += 1;
            }
        }
    }

    /// Index 0 is the oldest line still in the ring
    fn get(&self, index: usize) -> Option<&Line> {
        if index >= self.len {
            return None;
        }
        Some(&self.lines[(self.start + index) % self.lines.len()])
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.start = 0;
        self.len = 0;
    }
}

#[derive(Debug)]
struct DiskLog {
    path: PathBuf,
    /// `None` once the store has been closed
    writer: Option<File>,
    bytes: u64,
    max_bytes: u64,
    retain_bytes: u64,
}

#[derive(Debug)]
struct CacheWindow {
    start: usize,
    lines: Vec<Option<Line>>,
}

impl CacheWindow {
    fn covers(&self, index: usize) -> bool {
        index >= self.start && index < self.start + self.lines.len()
    }

    fn get(&self, index: usize) -> Option<&Line> {
        self.lines.get(index - self.start)?.as_ref()
    }
}

#[derive(Debug)]
struct Inner {
    ring: Ring,
    disk: Option<DiskLog>,
    cache: Option<CacheWindow>,
    total: usize,
    replay: bool,
    closed: bool,
}

/// Hybrid in-memory/on-disk scrollback store
#[derive(Debug)]
pub struct ScrollbackStore {
    inner: Mutex<Inner>,
}

impl ScrollbackStore {
    /// Create a pure in-memory store; lines older than the ring are lost
    pub fn new_in_memory() -> Self {
        ScrollbackStore {
            inner: Mutex::new(Inner {
                ring: Ring::new(RING_CAPACITY),
                disk: None,
                cache: None,
                total: 0,
                replay: false,
                closed: false,
            }),
        }
    }

    /// Open a disk-backed store, creating the log file if needed.
    ///
    /// An existing log is scanned once (streaming, bounded memory) to
    /// recover the line count and prime the ring with the most recent
    /// lines.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ScrollbackError> {
        Self::open_with_limits(path.into(), MAX_LOG_BYTES, TRIM_RETAIN_BYTES)
    }

    fn open_with_limits(
        path: PathBuf,
        max_bytes: u64,
        retain_bytes: u64,
    ) -> Result<Self, ScrollbackError> {
        let writer = OpenOptions::new().create(true).append(true).open(&path)?;
        let bytes = writer.metadata()?.len();

        let (total, raw_tail) = scan_log(&path, RING_CAPACITY)?;
        let mut ring = Ring::new(RING_CAPACITY);
        for raw in raw_tail {
            ring.push(decode_line(&raw).unwrap_or_else(|| Line::from_cells(Vec::new())));
        }

        Ok(ScrollbackStore {
            inner: Mutex::new(Inner {
                ring,
                disk: Some(DiskLog {
                    path,
                    writer: Some(writer),
                    bytes,
                    max_bytes,
                    retain_bytes,
                }),
                cache: None,
                total,
                replay: false,
                closed: false,
            }),
        })
    }

    /// Derive the log path for a session name; `/`, `\` and NUL are
    /// replaced with `_`.
    pub fn log_path(dir: &Path, session: &str) -> PathBuf {
        let sanitized: String = session
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect();
        dir.join(format!("{sanitized}.scrollback"))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append lines to the store. Each line is copied; when disk-backed
    /// the encoded lines are flushed to the log before returning, and the
    /// log is trimmed if it grew past its cap. A complete no-op while the
    /// replay flag is set or after `close`.
    pub fn push(&self, lines: &[Line]) {
        if lines.is_empty() {
            return;
        }
        let mut inner = self.lock();
        if inner.replay {
            return;
        }
        if inner.closed {
            log::warn!("scrollback push after close ignored");
            return;
        }

        for line in lines {
            inner.ring.push(line.clone());
        }

        if inner.disk.is_none() {
            inner.total = inner.ring.len();
            return;
        }

        inner.total += lines.len();
        let mut needs_trim = false;
        if let Some(disk) = inner.disk.as_mut() {
            if let Some(writer) = disk.writer.as_mut() {
                let mut wrote = false;
                for line in lines {
                    match encode_line(line) {
                        Ok(mut encoded) => {
                            encoded.push('\n');
                            match writer.write_all(encoded.as_bytes()) {
                                Ok(()) => {
                                    disk.bytes += encoded.len() as u64;
                                    wrote = true;
                                }
                                Err(err) => log::warn!("scrollback write failed: {err}"),
                            }
                        }
                        Err(err) => log::warn!("scrollback encode failed: {err}"),
                    }
                }
                if wrote {
                    if let Err(err) = writer.sync_data() {
                        log::warn!("scrollback flush failed: {err}");
                    }
                }
            }
            needs_trim = disk.bytes > disk.max_bytes;
        }

        if needs_trim {
            if let Err(err) = trim_locked(&mut inner) {
                log::warn!("scrollback trim failed: {err}");
            }
        }
    }

    /// Fetch a line by absolute index. Recent lines come from the ring;
    /// older lines from the disk cache window, or `None` without disk
    /// backing (and for malformed disk records).
    pub fn line(&self, index: usize) -> Option<Line> {
        let mut inner = self.lock();
        if index >= inner.total {
            return None;
        }
        let ring_start = inner.total - inner.ring.len();
        if index >= ring_start {
            return inner.ring.get(index - ring_start).cloned();
        }

        let path = inner.disk.as_ref()?.path.clone();
        let covered = inner.cache.as_ref().is_some_and(|c| c.covers(index));
        if !covered {
            match load_cache_window(&path, index) {
                Ok(window) => inner.cache = Some(window),
                Err(err) => {
                    log::warn!("scrollback cache load failed: {err}");
                    return None;
                }
            }
        }
        inner.cache.as_ref().and_then(|c| c.get(index)).cloned()
    }

    /// Range fetch, clamped to `[0, count)`
    pub fn lines(&self, start: usize, end: usize) -> Vec<Option<Line>> {
        let total = self.count();
        let start = start.min(total);
        let end = end.min(total);
        (start..end).map(|i| self.line(i)).collect()
    }

    /// Total line count still addressable; only trimming decreases it
    pub fn count(&self) -> usize {
        self.lock().total
    }

    /// While set, `push` is a complete no-op. Used when re-feeding a
    /// persisted byte log through the parser: the on-disk lines are
    /// already the source of truth and must not be duplicated.
    pub fn set_replay(&self, replay: bool) {
        self.lock().replay = replay;
    }

    pub fn is_replaying(&self) -> bool {
        self.lock().replay
    }

    /// Drop everything; a disk-backed store truncates its log file
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.ring.clear();
        inner.cache = None;
        inner.total = 0;
        if let Some(disk) = inner.disk.as_mut() {
            disk.bytes = 0;
            if let Some(writer) = disk.writer.as_mut() {
                if let Err(err) = writer.set_len(0) {
                    log::warn!("scrollback truncate failed: {err}");
                }
            }
        }
    }

    /// Flush and close the log; further pushes are ignored
    pub fn close(&self) {
        let mut inner = self.lock();
        if let Some(disk) = inner.disk.as_mut() {
            if let Some(writer) = disk.writer.take() {
                if let Err(err) = writer.sync_all() {
                    log::warn!("scrollback close flush failed: {err}");
                }
            }
        }
        inner.closed = true;
    }
}

/// Serialize a line for the disk log, trimming trailing blank cells.
/// An entirely blank line encodes as `[]`.
fn encode_line(line: &Line) -> serde_json::Result<String> {
    let cells = line.cells();
    let end = cells
        .iter()
        .rposition(|cell| !cell.is_blank())
        .map_or(0, |i| i + 1);
    let tuples: Vec<(u32, u32, u32, u16)> = cells[..end]
        .iter()
        .map(|cell| {
            (
                cell.c as u32,
                pack_color(cell.fg),
                pack_color(cell.bg),
                cell.flags.bits(),
            )
        })
        .collect();
    serde_json::to_string(&tuples)
}

/// Decode one log record; `None` for malformed records
fn decode_line(raw: &[u8]) -> Option<Line> {
    let tuples: Vec<(u32, u32, u32, u16)> = serde_json::from_slice(raw).ok()?;
    let cells: Vec<Cell> = tuples
        .into_iter()
        .map(|(codepoint, fg, bg, bits)| Cell {
            c: match codepoint {
                0 => ' ',
                cp => char::from_u32(cp).unwrap_or(' '),
            },
            fg: unpack_color(fg),
            bg: unpack_color(bg),
            flags: CellFlags::new(bits),
        })
        .collect();
    Some(Line::from_cells(cells))
}

/// Stream over an existing log: count records and keep the raw bytes of
/// the last `ring_capacity` lines, without holding the whole file in
/// memory.
fn scan_log(path: &Path, ring_capacity: usize) -> io::Result<(usize, VecDeque<Vec<u8>>)> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok((0, VecDeque::new())),
        Err(err) => return Err(err),
    };
    let mut reader = BufReader::new(file);
    let mut count = 0usize;
    let mut tail: VecDeque<Vec<u8>> = VecDeque::with_capacity(ring_capacity + 1);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.is_empty() {
            continue;
        }
        count += 1;
        tail.push_back(buf.clone());
        if tail.len() > ring_capacity {
            tail.pop_front();
        }
    }
    Ok((count, tail))
}

/// Load a cache window from disk centered on the requested index, using
/// a read handle independent of the writer.
fn load_cache_window(path: &Path, index: usize) -> io::Result<CacheWindow> {
    let start = index.saturating_sub(CACHE_WINDOW_LINES / 2);
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();

    for _ in 0..start {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
    }

    let mut lines = Vec::with_capacity(CACHE_WINDOW_LINES);
    for _ in 0..CACHE_WINDOW_LINES {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        lines.push(decode_line(&buf));
    }

    Ok(CacheWindow { start, lines })
}

/// Rewrite the log keeping only the most recent `retain_bytes`, advanced
/// to a newline boundary so no record is split. Recomputes the total,
/// invalidates the cache, and reloads the ring from the new tail. This
/// is the only place the line count decreases.
fn trim_locked(inner: &mut Inner) -> Result<(), ScrollbackError> {
    let Some(disk) = inner.disk.as_mut() else {
        return Ok(());
    };
    let data = std::fs::read(&disk.path)?;
    if data.len() as u64 <= disk.retain_bytes {
        return Ok(());
    }

    let mut cut = data.len() - disk.retain_bytes as usize;
    while cut < data.len() && data[cut - 1] != b'\n' {
        cut += 1;
    }
    let tail = &data[cut..];

    let Some(writer) = disk.writer.as_mut() else {
        return Ok(());
    };
    writer.set_len(0)?;
    writer.write_all(tail)?;
    writer.sync_data()?;
    disk.bytes = tail.len() as u64;

    inner.total = tail.iter().filter(|&&b| b == b'\n').count();
    inner.cache = None;

    let records: Vec<&[u8]> = tail
        .split(|&b| b == b'\n')
        .filter(|record| !record.is_empty())
        .collect();
    let skip = records.len().saturating_sub(inner.ring.capacity);
    inner.ring.clear();
    for raw in &records[skip..] {
        inner
            .ring
            .push(decode_line(raw).unwrap_or_else(|| Line::from_cells(Vec::new())));
    }
    Ok(())
}
