//! Sliding byte windows over a raw repository file.
//!
//! The input is read as newline-terminated chunks. A fixed number of trailing
//! chunks is re-joined into one buffer per step so that a record split across
//! a chunk boundary still shows up whole in at least one window. This is a
//! heuristic: records spread over more chunks than the window holds are
//! never seen.

use crate::error::{HunterError, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

const CHUNK_TERMINATOR: u8 = b'\n';

/// Something that can be read from the start once per pass.
pub trait ByteSource {
    type Reader: BufRead;

    fn open(&self) -> Result<Self::Reader>;

    /// Human-readable label for logs.
    fn describe(&self) -> String;
}

/// Repository file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ByteSource for FileSource {
    type Reader = BufReader<File>;

    fn open(&self) -> Result<Self::Reader> {
        let file = File::open(&self.path).map_err(|source| HunterError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        Ok(BufReader::new(file))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory bytes, mostly for tests and carved fragments.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }
}

impl ByteSource for MemorySource {
    type Reader = Cursor<Arc<[u8]>>;

    fn open(&self) -> Result<Self::Reader> {
        Ok(Cursor::new(Arc::clone(&self.bytes)))
    }

    fn describe(&self) -> String {
        format!("<{} bytes in memory>", self.bytes.len())
    }
}

/// How the chunks of a window are glued into one search buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Chunks kept intact, one separator byte between neighbours.
    Separated(u8),
    /// Line terminators dropped, chunks concatenated directly.
    ///
    /// A record split as `SEL\n` + `ECT` reads `SELECT`, not the `SEL ECT`
    /// that space-joined WMI carvers report for the same bytes.
    StripTerminators,
}

impl JoinMode {
    fn join_into(self, chunks: &VecDeque<Vec<u8>>, out: &mut Vec<u8>) {
        out.clear();
        match self {
            JoinMode::Separated(sep) => {
                for (i, chunk) in chunks.iter().enumerate() {
                    if i > 0 {
                        out.push(sep);
                    }
                    out.extend_from_slice(chunk);
                }
            }
            JoinMode::StripTerminators => {
                for chunk in chunks {
                    out.extend(chunk.iter().copied().filter(|&b| b != CHUNK_TERMINATOR));
                }
            }
        }
    }
}

/// One joined buffer handed to the matchers.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    /// Zero-based position of this window within the pass.
    pub index: u64,
    pub bytes: &'a [u8],
}

/// Forward-only scanner producing one window per chunk once primed.
///
/// Not restartable: open the source again for another pass.
pub struct WindowScanner<R> {
    reader: R,
    capacity: usize,
    mode: JoinMode,
    chunks: VecDeque<Vec<u8>>,
    spare: Vec<u8>,
    joined: Vec<u8>,
    chunks_read: u64,
    windows_emitted: u64,
    finished: bool,
}

impl<R: BufRead> WindowScanner<R> {
    pub fn new(reader: R, capacity: usize, mode: JoinMode) -> Self {
        let capacity = capacity.max(1);
        Self {
            reader,
            capacity,
            mode,
            chunks: VecDeque::with_capacity(capacity + 1),
            spare: Vec::new(),
            joined: Vec::new(),
            chunks_read: 0,
            windows_emitted: 0,
            finished: false,
        }
    }

    /// Advance to the next window, or `None` once the source is exhausted.
    ///
    /// Sources shorter than the window yield a single partial window.
    pub fn next_window(&mut self) -> Result<Option<Window<'_>>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            if self.read_chunk()? {
                if self.chunks.len() > self.capacity {
                    if let Some(evicted) = self.chunks.pop_front() {
                        self.spare = evicted;
                    }
                }
                if self.chunks.len() == self.capacity {
                    return Ok(Some(self.emit()));
                }
            } else {
                self.finished = true;
                if self.windows_emitted == 0 && !self.chunks.is_empty() {
                    return Ok(Some(self.emit()));
                }
                return Ok(None);
            }
        }
    }

    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    fn read_chunk(&mut self) -> Result<bool> {
        let mut chunk = std::mem::take(&mut self.spare);
        chunk.clear();
        let read = self.reader.read_until(CHUNK_TERMINATOR, &mut chunk)?;
        if read == 0 {
            self.spare = chunk;
            return Ok(false);
        }
        self.chunks_read += 1;
        self.chunks.push_back(chunk);
        Ok(true)
    }

    fn emit(&mut self) -> Window<'_> {
        self.mode.join_into(&self.chunks, &mut self.joined);
        let index = self.windows_emitted;
        self.windows_emitted += 1;
        Window {
            index,
            bytes: &self.joined,
        }
    }
}

/// Open `source` from the start and wrap it in a scanner.
pub fn scan<S: ByteSource>(
    source: &S,
    capacity: usize,
    mode: JoinMode,
) -> Result<WindowScanner<S::Reader>> {
    Ok(WindowScanner::new(source.open()?, capacity, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &[u8], capacity: usize, mode: JoinMode) -> Vec<Vec<u8>> {
        let source = MemorySource::new(input.to_vec());
        let mut scanner = scan(&source, capacity, mode).unwrap();
        let mut out = Vec::new();
        while let Some(window) = scanner.next_window().unwrap() {
            assert_eq!(window.index as usize, out.len());
            out.push(window.bytes.to_vec());
        }
        out
    }

    #[test]
    fn test_one_window_per_chunk_after_priming() {
        let input = b"a\nb\nc\nd\ne\nf\n";
        let windows = collect(input, 4, JoinMode::Separated(b' '));
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], b"a\n b\n c\n d\n");
        assert_eq!(windows[1], b"b\n c\n d\n e\n");
        assert_eq!(windows[2], b"c\n d\n e\n f\n");
    }

    #[test]
    fn test_last_chunk_without_terminator_still_counts() {
        let windows = collect(b"a\nb\nc", 2, JoinMode::Separated(b' '));
        assert_eq!(windows, vec![b"a\n b\n".to_vec(), b"b\n c".to_vec()]);
    }

    #[test]
    fn test_strip_terminators_concatenates() {
        let windows = collect(b"ab\ncd\nef\n", 3, JoinMode::StripTerminators);
        assert_eq!(windows, vec![b"abcdef".to_vec()]);
    }

    #[test]
    fn test_strip_terminators_rejoins_split_record_without_space() {
        let input = b"q\x00\x00SEL\nECT * FROM Z\x00\x00\n";
        let windows = collect(input, 2, JoinMode::StripTerminators);
        assert_eq!(windows, vec![b"q\x00\x00SELECT * FROM Z\x00\x00".to_vec()]);
    }

    #[test]
    fn test_short_source_yields_partial_window() {
        let windows = collect(b"only\ntwo\n", 4, JoinMode::Separated(b' '));
        assert_eq!(windows, vec![b"only\n two\n".to_vec()]);
    }

    #[test]
    fn test_empty_source_yields_nothing() {
        assert!(collect(b"", 4, JoinMode::StripTerminators).is_empty());
    }

    #[test]
    fn test_exactly_capacity_chunks_yields_one_window() {
        let windows = collect(b"1\n2\n3\n4\n", 4, JoinMode::StripTerminators);
        assert_eq!(windows, vec![b"1234".to_vec()]);
    }

    #[test]
    fn test_counters() {
        let source = MemorySource::new(b"1\n2\n3\n4\n5\n".to_vec());
        let mut scanner = scan(&source, 4, JoinMode::StripTerminators).unwrap();
        while scanner.next_window().unwrap().is_some() {}
        assert_eq!(scanner.chunks_read(), 5);
        assert_eq!(scanner.windows_emitted(), 2);
        // Exhausted scanners stay exhausted
        assert!(scanner.next_window().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let source = FileSource::new("/nonexistent/wmi/OBJECTS.DATA");
        let err = source.open().unwrap_err();
        assert!(matches!(err, HunterError::SourceUnavailable { .. }));
    }
}
