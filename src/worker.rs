use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use memchr::memchr;
use tracing::debug;

use crate::error::{Error, Result};
use crate::parse::{parse_line, trim_line};
use crate::split::Part;
use crate::table::AggregationTable;

const READ_BUFFER: usize = 1 << 20;

// Lines scanned between polls of the cancellation flag.
const CANCEL_POLL_LINES: u64 = 1 << 14;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub lines: u64,
    pub skipped: u64,
}

/// Aggregates the records of one [`Part`] into a private table.
#[derive(Debug, Clone, Copy)]
pub struct ChunkWorker {
    pub id: usize,
    pub part: Part,
}

impl ChunkWorker {
    pub fn new(id: usize, part: Part) -> Self {
        Self { id, part }
    }

    /// Opens its own handle on `path`, seeks to the part and reads at most
    /// `part.len` bytes.
    pub fn run_file(&self, path: &Path, cancel: &AtomicBool) -> Result<AggregationTable> {
        let mut file = File::open(path).map_err(|e| Error::io("open", path, e))?;
        file.seek(SeekFrom::Start(self.part.offset))
            .map_err(|e| Error::io("seek", path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER, file.take(self.part.len));

        let mut scan = Scan::default();
        let mut line = Vec::with_capacity(128);
        loop {
            line.clear();
            let n = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| Error::io("read", path, e))?;
            if n == 0 {
                break;
            }
            scan.line(&line);
            scan.poll(cancel)?;
        }
        Ok(self.finish(scan))
    }

    /// Scans the part's bytes inside `data`, the whole input mapped in memory.
    pub fn run_mapped(&self, data: &[u8], cancel: &AtomicBool) -> Result<AggregationTable> {
        let start = (self.part.offset as usize).min(data.len());
        let end = (self.part.end() as usize).min(data.len());
        let mut rest = &data[start..end];

        let mut scan = Scan::default();
        while !rest.is_empty() {
            let line = match memchr(b'\n', rest) {
                Some(pos) => {
                    let (line, tail) = rest.split_at(pos + 1);
                    rest = tail;
                    line
                }
                None => std::mem::take(&mut rest),
            };
            scan.line(line);
            scan.poll(cancel)?;
        }
        Ok(self.finish(scan))
    }

    fn finish(&self, scan: Scan) -> AggregationTable {
        debug!(
            worker = self.id,
            offset = self.part.offset,
            len = self.part.len,
            lines = scan.stats.lines,
            skipped = scan.stats.skipped,
            keys = scan.table.len(),
            "worker finished"
        );
        scan.table
    }
}

#[derive(Default)]
struct Scan {
    table: AggregationTable,
    stats: ScanStats,
}

impl Scan {
    #[inline]
    fn line(&mut self, raw: &[u8]) {
        self.stats.lines += 1;
        match parse_line(trim_line(raw)) {
            Some((key, value)) => self.table.update(key, value),
            None => self.stats.skipped += 1,
        }
    }

    #[inline]
    fn poll(&self, cancel: &AtomicBool) -> Result<()> {
        if self.stats.lines % CANCEL_POLL_LINES == 0 && cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
