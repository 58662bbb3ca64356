use std::io;

use log::trace;

use crate::utils::cancel::CancellationToken;
use crate::utils::source::ByteSource;

/// Window granularity. New windows start at a multiple of this.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Extra bytes read past each chunk so a header straddling the boundary stays addressable.
pub const DEFAULT_OVERLAP: usize = 64;

/// A contiguous copy of part of the source.
#[derive(Debug)]
pub struct ByteWindow {
    pub base_offset: u64,
    pub bytes: Vec<u8>,
}

impl ByteWindow {
    #[inline(always)]
    fn covers(&self, offset: u64, end: u64) -> bool {
        offset >= self.base_offset && end <= self.base_offset + self.bytes.len() as u64
    }
}

/// Why the last [`ByteWindowReader::ensure_bytes`] call failed, when it was
/// not simply a request past the end of the source.
#[derive(Debug)]
pub enum Interrupt {
    Cancelled,
    Io(io::Error),
    ShortRead { offset: u64, expected: u64, actual: u64 },
}

type ProgressFn = Box<dyn FnMut(u64, u64)>;

/// Lazily materializes bounded views of a [`ByteSource`].
///
/// At most one [`ByteWindow`] is alive at a time. It is replaced wholesale
/// whenever a request is not fully covered, so peak memory stays around
/// `chunk_size + overlap` regardless of the source size.
pub struct ByteWindowReader<S> {
    source: S,
    size: u64,
    window: Option<ByteWindow>,
    chunk_size: usize,
    overlap: usize,
    cancellation: Option<CancellationToken>,
    progress: Option<ProgressFn>,
    interrupt: Option<Interrupt>,
    reads: usize,
}

impl<S: ByteSource> ByteWindowReader<S> {
    pub fn new(source: S) -> Self {
        Self::with_chunking(source, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
    }

    pub fn with_chunking(source: S, chunk_size: usize, overlap: usize) -> Self {
        let size = source.size();

        Self {
            source,
            size,
            window: None,
            chunk_size: chunk_size.max(1),
            overlap,
            cancellation: None,
            progress: None,
            interrupt: None,
            reads: 0,
        }
    }

    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancellation = Some(token);
    }

    /// Installs a callback receiving `(window_base, source_size)` each time
    /// a new window is read.
    pub fn set_progress(&mut self, progress: impl FnMut(u64, u64) + 'static) {
        self.progress = Some(Box::new(progress));
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of reads issued against the source so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Makes `[offset, offset + length)` addressable in the current window.
    ///
    /// Returns `false` when the range runs past the end of the source, when
    /// the scan has been cancelled or when the source fails. The latter two
    /// leave an [`Interrupt`] behind for [`Self::take_interrupt`].
    pub fn ensure_bytes(&mut self, offset: u64, length: usize) -> bool {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            self.interrupt.get_or_insert(Interrupt::Cancelled);
            return false;
        }

        let Some(end) = offset.checked_add(length as u64) else {
            return false;
        };
        if end > self.size {
            return false;
        }

        if self.window.as_ref().is_some_and(|w| w.covers(offset, end)) {
            return true;
        }

        let chunk = self.chunk_size as u64;
        let base = offset - offset % chunk;
        let wanted = (chunk + self.overlap as u64).max(end - base);
        let len = wanted.min(self.size - base) as usize;

        self.reads += 1;
        trace!("Reading window [{base}, {})", base + len as u64);

        let bytes = match self.source.read_range(base, len) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.window = None;
                self.interrupt = Some(Interrupt::Io(e));
                return false;
            }
        };

        let actual = bytes.len() as u64;
        self.window = Some(ByteWindow {
            base_offset: base,
            bytes,
        });

        if let Some(progress) = self.progress.as_mut() {
            progress(base, self.size);
        }

        if base + actual < end {
            self.interrupt = Some(Interrupt::ShortRead {
                offset: base,
                expected: len as u64,
                actual,
            });
            return false;
        }

        true
    }

    /// Returns the bytes at `[offset, offset + length)` if the current window
    /// covers them. Call [`Self::ensure_bytes`] first.
    #[inline(always)]
    pub fn slice(&self, offset: u64, length: usize) -> Option<&[u8]> {
        let window = self.window.as_ref()?;
        let end = offset.checked_add(length as u64)?;
        if !window.covers(offset, end) {
            return None;
        }

        let start = (offset - window.base_offset) as usize;
        Some(&window.bytes[start..start + length])
    }

    /// [`Self::ensure_bytes`] followed by [`Self::slice`].
    pub fn bytes(&mut self, offset: u64, length: usize) -> Option<&[u8]> {
        if !self.ensure_bytes(offset, length) {
            return None;
        }
        self.slice(offset, length)
    }

    /// Convenience for a single byte, materializing a window if needed.
    #[inline(always)]
    pub fn byte_at(&mut self, offset: u64) -> Option<u8> {
        if !self.ensure_bytes(offset, 1) {
            return None;
        }
        self.slice(offset, 1).map(|b| b[0])
    }

    pub fn take_interrupt(&mut self) -> Option<Interrupt> {
        self.interrupt.take()
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn cache_hits_do_not_read() {
        let bytes = data(1000);
        let mut reader = ByteWindowReader::with_chunking(&bytes[..], 256, 16);

        assert!(reader.ensure_bytes(10, 4));
        assert!(reader.ensure_bytes(200, 50));
        assert_eq!(reader.reads(), 1);
        assert_eq!(reader.slice(200, 2), Some(&bytes[200..202]));

        // Straddles the chunk boundary but stays inside the overlap.
        assert!(reader.ensure_bytes(250, 20));
        assert_eq!(reader.reads(), 1);

        assert!(reader.ensure_bytes(300, 4));
        assert_eq!(reader.reads(), 2);
        assert_eq!(reader.slice(300, 4), Some(&bytes[300..304]));
        assert_eq!(reader.slice(10, 4), None);
    }

    #[test]
    fn windows_grow_for_large_requests() {
        let bytes = data(2000);
        let mut reader = ByteWindowReader::with_chunking(&bytes[..], 256, 16);

        assert!(reader.ensure_bytes(250, 900));
        assert_eq!(reader.slice(250, 900), Some(&bytes[250..1150]));
    }

    #[test]
    fn past_end_is_false() {
        let bytes = data(100);
        let mut reader = ByteWindowReader::with_chunking(&bytes[..], 64, 8);

        assert!(reader.ensure_bytes(96, 4));
        assert!(!reader.ensure_bytes(97, 4));
        assert!(!reader.ensure_bytes(u64::MAX, 2));
        assert!(reader.take_interrupt().is_none());
        assert_eq!(reader.byte_at(99), Some(99));
        assert_eq!(reader.byte_at(100), None);
    }

    #[test]
    fn cancellation_interrupts() {
        let bytes = data(100);
        let token = CancellationToken::new();
        let mut reader = ByteWindowReader::new(&bytes[..]);
        reader.set_cancellation(token.clone());

        assert!(reader.ensure_bytes(0, 4));
        token.cancel();
        assert!(!reader.ensure_bytes(0, 4));
        assert!(matches!(reader.take_interrupt(), Some(Interrupt::Cancelled)));
    }

    #[test]
    fn io_errors_interrupt() {
        struct Failing;

        impl ByteSource for Failing {
            fn size(&self) -> u64 {
                10
            }

            fn read_range(&mut self, _offset: u64, _length: usize) -> io::Result<Vec<u8>> {
                Err(io::Error::other("device gone"))
            }
        }

        let mut reader = ByteWindowReader::new(Failing);
        assert!(!reader.ensure_bytes(0, 4));
        assert!(matches!(reader.take_interrupt(), Some(Interrupt::Io(_))));
    }
}
