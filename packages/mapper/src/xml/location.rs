//! Source positions for diagnostics.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};

/// Position of an event in the source document.
///
/// Line and column are 1-based; the column counts bytes from the start of the
/// line. `offset` is the absolute byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    /// 1-based line number.
    pub line: u64,
    /// 1-based byte column.
    pub column: u64,
    /// Absolute byte offset.
    pub offset: u64,
}

impl Location {
    /// Location of the first byte of a document.
    pub const START: Location = Location {
        line: 1,
        column: 1,
        offset: 0,
    };
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Reader adapter that records the offsets of the newlines it passes through.
///
/// Offsets are absolute, so read-ahead by an outer buffer does not affect
/// [`LineTracker::locate`]. Newlines the caller no longer asks about are
/// dropped with [`LineTracker::forget_before`] and only counted.
#[derive(Debug)]
pub struct LineTracker<R> {
    inner: R,
    consumed: u64,
    newlines: VecDeque<u64>,
    forgotten: u64,
    last_forgotten: Option<u64>,
}

impl<R: Read> LineTracker<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            consumed: 0,
            newlines: VecDeque::new(),
            forgotten: 0,
            last_forgotten: None,
        }
    }

    /// Translate a byte offset into a line/column location.
    ///
    /// `offset` must not lie before the last [`LineTracker::forget_before`].
    #[must_use]
    pub fn locate(&self, offset: u64) -> Location {
        let preceding = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = match preceding {
            0 => self.last_forgotten.map_or(0, |nl| nl + 1),
            n => self.newlines[n - 1] + 1,
        };
        Location {
            line: self.forgotten + preceding as u64 + 1,
            column: offset.saturating_sub(line_start) + 1,
            offset,
        }
    }

    /// Drop newlines before `offset`; later lookups start at `offset`.
    pub fn forget_before(&mut self, offset: u64) {
        while let Some(&nl) = self.newlines.front() {
            if nl >= offset {
                break;
            }
            self.newlines.pop_front();
            self.forgotten += 1;
            self.last_forgotten = Some(nl);
        }
    }

    /// Number of newlines still held for lookups.
    #[must_use]
    pub fn pending_newlines(&self) -> usize {
        self.newlines.len()
    }
}

impl<R: Read> Read for LineTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        for (i, byte) in buf[..read].iter().enumerate() {
            if *byte == b'\n' {
                self.newlines.push_back(self.consumed + i as u64);
            }
        }
        self.consumed += read as u64;
        Ok(read)
    }
}
