//! Line-aligned partitioning of the input.
//!
//! Each internal boundary is found by peeking at a small window that starts
//! one window length before the nominal split point and putting the boundary
//! right after the last newline in it. Nothing else of the file is read.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use memchr::memrchr;
use tracing::trace;

use crate::error::{Error, Result};

/// Default lookback window, which is also the longest line supported near a
/// split point.
pub const DEFAULT_WINDOW: usize = 100;

/// A byte range of the input assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub offset: u64,
    pub len: u64,
}

impl Part {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Random access to the bytes that split points are searched in.
pub trait WindowSource {
    /// Fills `buf` starting at `offset`. Returns fewer bytes only at end of
    /// input.
    fn read_window(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl WindowSource for &[u8] {
    fn read_window(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = (offset as usize).min(self.len());
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

/// Adapts any seekable reader, typically a [`File`].
pub struct SeekSource<R>(pub R);

impl<R: Read + Seek> WindowSource for SeekSource<R> {
    fn read_window(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.0.seek(SeekFrom::Start(offset))?;
        let mut filled = 0;
        while filled < buf.len() {
            match self.0.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

/// Splits `size` bytes from `source` into exactly `parts` contiguous,
/// newline-aligned ranges.
///
/// Each internal boundary lands just after the last newline in the `window`
/// bytes starting at `window` before the nominal split point, clamped to the
/// current part's offset. The last range always runs to `size` and may be
/// empty. Fails with [`Error::Split`] when a window that did not reach end
/// of input holds no newline.
pub fn split<S: WindowSource>(
    source: &mut S,
    size: u64,
    parts: usize,
    window: usize,
) -> Result<Vec<Part>, SplitFailure> {
    let parts = parts.max(1);
    let nominal = size / parts as u64;
    let mut buf = vec![0u8; window];
    let mut out = Vec::with_capacity(parts);
    let mut offset = 0u64;

    for _ in 0..parts - 1 {
        let candidate = offset + nominal;
        let start = candidate.saturating_sub(window as u64).max(offset);
        let n = source
            .read_window(start, &mut buf)
            .map_err(SplitFailure::Io)?;

        let next = match memrchr(b'\n', &buf[..n]) {
            Some(pos) => start + pos as u64 + 1,
            // Only a trailing line without newline is left.
            None if n < window => offset,
            None => {
                return Err(SplitFailure::NoNewline {
                    offset: start,
                    window,
                })
            }
        };
        trace!(offset, next, "split boundary");
        out.push(Part {
            offset,
            len: next - offset,
        });
        offset = next;
    }
    out.push(Part {
        offset,
        len: size - offset,
    });
    Ok(out)
}

/// Reason [`split`] gave up, before a file path is attached.
#[derive(Debug)]
pub enum SplitFailure {
    NoNewline { offset: u64, window: usize },
    Io(io::Error),
}

impl SplitFailure {
    pub(crate) fn with_path(self, path: &Path) -> Error {
        match self {
            SplitFailure::NoNewline { offset, window } => Error::Split { offset, window },
            SplitFailure::Io(e) => Error::io("read", path, e),
        }
    }
}

/// Opens `path` and splits it by seeking to each window.
pub fn split_file(path: &Path, parts: usize, window: usize) -> Result<Vec<Part>> {
    let file = File::open(path).map_err(|e| Error::io("open", path, e))?;
    let size = file
        .metadata()
        .map_err(|e| Error::io("stat", path, e))?
        .len();
    split(&mut SeekSource(file), size, parts, window).map_err(|f| f.with_path(path))
}

/// Splits an in-memory (usually memory-mapped) buffer.
pub fn split_slice(data: &[u8], parts: usize, window: usize) -> Result<Vec<Part>> {
    let size = data.len() as u64;
    let mut source = data;
    split(&mut source, size, parts, window).map_err(|f| f.with_path(Path::new("<memory>")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    fn random_lines(rng: &mut StdRng, lines: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..lines {
            let key_len = rng.gen_range(1..30);
            for _ in 0..key_len {
                data.push(rng.gen_range(b'a'..=b'z'));
            }
            data.extend_from_slice(format!(";{:.1}\n", rng.gen_range(-99.9..99.9)).as_bytes());
        }
        data
    }

    fn check_parts(data: &[u8], parts: &[Part], count: usize) {
        assert_eq!(parts.len(), count);
        assert_eq!(parts[0].offset, 0);
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end(), pair[1].offset);
        }
        assert_eq!(parts.last().unwrap().end(), data.len() as u64);
        let total: u64 = parts.iter().map(|p| p.len).sum();
        assert_eq!(total, data.len() as u64);
        for part in &parts[1..] {
            if part.offset > 0 {
                assert_eq!(data[part.offset as usize - 1], b'\n');
            }
        }
    }

    #[test]
    fn parts_cover_input_on_line_boundaries() {
        let mut rng = StdRng::seed_from_u64(3);
        for lines in [1, 2, 10, 500, 5000] {
            let data = random_lines(&mut rng, lines);
            for count in [1, 2, 3, 7, 16, 64] {
                let parts = split_slice(&data, count, DEFAULT_WINDOW).unwrap();
                check_parts(&data, &parts, count);
            }
        }
    }

    #[test]
    fn seek_source_matches_slice_source() {
        let mut rng = StdRng::seed_from_u64(5);
        let data = random_lines(&mut rng, 2000);
        let from_slice = split_slice(&data, 8, DEFAULT_WINDOW).unwrap();
        let from_reader = split(
            &mut SeekSource(Cursor::new(&data)),
            data.len() as u64,
            8,
            DEFAULT_WINDOW,
        )
        .unwrap();
        assert_eq!(from_slice, from_reader);
    }

    #[test]
    fn empty_input_yields_empty_parts() {
        let parts = split_slice(b"", 4, DEFAULT_WINDOW).unwrap();
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|p| p.offset == 0 && p.len == 0));
    }

    #[test]
    fn single_part_is_whole_input() {
        let data = b"a;1\nb;2";
        let parts = split_slice(data, 1, DEFAULT_WINDOW).unwrap();
        assert_eq!(parts, vec![Part { offset: 0, len: 7 }]);
    }

    #[test]
    fn boundary_moves_back_to_newline() {
        // Five 50-byte lines; the nominal split at 125 lands inside the third.
        let mut data = Vec::new();
        for _ in 0..5 {
            data.extend(std::iter::repeat(b'a').take(45));
            data.extend_from_slice(b";1.0\n");
        }
        let parts = split_slice(&data, 2, DEFAULT_WINDOW).unwrap();
        assert_eq!(
            parts,
            vec![Part { offset: 0, len: 100 }, Part { offset: 100, len: 150 }]
        );
    }

    #[test]
    fn zero_part_count_is_treated_as_one() {
        let parts = split_slice(b"a;1\n", 0, DEFAULT_WINDOW).unwrap();
        assert_eq!(parts, vec![Part { offset: 0, len: 4 }]);
    }

    #[test]
    fn long_line_fails() {
        let mut data = vec![b'x'; 300];
        data.extend_from_slice(b";1.0\n");
        data.extend_from_slice(&data.clone());
        match split_slice(&data, 3, DEFAULT_WINDOW) {
            Err(Error::Split { window, .. }) => assert_eq!(window, DEFAULT_WINDOW),
            other => panic!("expected split error, got {other:?}"),
        }
    }

    #[test]
    fn newline_past_nominal_point_is_used() {
        // Nominal split at 70, newline at 79: still inside the window.
        let mut data = vec![b'a'; 75];
        data.extend_from_slice(b";1.0\n");
        data.extend(std::iter::repeat(b'b').take(55));
        data.extend_from_slice(b";2.0\n");
        assert_eq!(data.len(), 140);

        let parts = split_slice(&data, 2, DEFAULT_WINDOW).unwrap();
        assert_eq!(
            parts,
            vec![Part { offset: 0, len: 80 }, Part { offset: 80, len: 60 }]
        );
    }

    #[test]
    fn long_line_fails_even_when_parts_are_small() {
        // Nominal size 50 is below the window, but [0, 100) has no newline.
        let mut data = vec![b'x'; 145];
        data.extend_from_slice(b";1.0\n");
        while data.len() < 202 {
            data.extend_from_slice(b"a;1\n");
        }
        match split_slice(&data, 4, DEFAULT_WINDOW) {
            Err(Error::Split { offset, window }) => {
                assert_eq!(offset, 0);
                assert_eq!(window, DEFAULT_WINDOW);
            }
            other => panic!("expected split error, got {other:?}"),
        }
    }

    #[test]
    fn window_reaching_end_of_input_takes_last_newline() {
        let mut data = vec![b'k'; 30];
        data.extend_from_slice(b";1.0\nz;2\n");
        let parts = split_slice(&data, 2, DEFAULT_WINDOW).unwrap();
        check_parts(&data, &parts, 2);
        assert_eq!(parts[0], Part { offset: 0, len: 39 });
        assert_eq!(parts[1].len, 0);
    }

    #[test]
    fn unterminated_tail_at_end_of_input_is_not_an_error() {
        let data = b"abc;1.0";
        let parts = split_slice(data, 3, DEFAULT_WINDOW).unwrap();
        check_parts(data, &parts, 3);
        assert_eq!(parts[2], Part { offset: 0, len: 7 });
    }
}
