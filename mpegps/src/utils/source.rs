//! Random-access byte sources.
//!
//! The scanner never assumes a whole file fits in memory. It only asks a
//! [`ByteSource`] for bounded ranges through the window reader.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A random-access, finite sequence of bytes.
pub trait ByteSource {
    /// Total number of bytes in the source.
    fn size(&self) -> u64;

    /// Reads up to `length` bytes starting at `offset`.
    ///
    /// May return fewer bytes than requested near the end of the source.
    fn read_range(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>>;
}

impl ByteSource for &[u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_range(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        let start = offset.min(self.len() as u64) as usize;
        let end = start.saturating_add(length).min(self.len());
        Ok(self[start..end].to_vec())
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_range(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        (**self).read_range(offset, length)
    }
}

/// Byte source over any seekable reader, typically a [`File`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
    size: u64,
}

impl<R: Read + Seek> ReaderSource<R> {
    /// Wraps a seekable reader, measuring its size once up front.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        Ok(Self { inner, size })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl ReaderSource<File> {
    /// Opens a file for scanning.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_range(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        self.inner.seek(SeekFrom::Start(offset))?;

        let mut buf = Vec::with_capacity(length);
        (&mut self.inner).take(length as u64).read_to_end(&mut buf)?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn slice_reads_are_clamped() -> io::Result<()> {
        let data = [1u8, 2, 3, 4, 5];
        let mut source = &data[..];

        assert_eq!(source.size(), 5);
        assert_eq!(source.read_range(1, 3)?, vec![2, 3, 4]);
        assert_eq!(source.read_range(3, 10)?, vec![4, 5]);
        assert!(source.read_range(9, 2)?.is_empty());

        Ok(())
    }

    #[test]
    fn reader_source_measures_and_reads() -> io::Result<()> {
        let mut source = ReaderSource::new(Cursor::new(vec![0xAAu8; 100]))?;

        assert_eq!(source.size(), 100);
        assert_eq!(source.read_range(98, 8)?, vec![0xAA, 0xAA]);
        assert_eq!(source.read_range(10, 4)?.len(), 4);

        Ok(())
    }
}
