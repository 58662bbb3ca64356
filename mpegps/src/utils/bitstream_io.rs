//! Bitstream I/O utilities for structure parsing.
//!
//! Wraps a big-endian [`bitstream_io::BitReader`] with bounds-checked reads,
//! skips and marker-bit helpers used by the structural decoders.

use std::io;

use bitstream_io::{BigEndian, BitRead, BitReader, UnsignedInteger};

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        if n <= 32 {
            match self.bs.read_unsigned_var(n) {
                Ok(val) => Ok(val),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "get_n({}): out of bounds bits at {}",
                        n,
                        self.bs.position_in_bits().unwrap_or(0)
                    ),
                )),
                Err(e) => Err(e),
            }
        } else {
            self.available().and_then(|avail| {
                if n as u64 > avail {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "get_n({}): out of bounds bits at {}",
                            n,
                            self.bs.position_in_bits().unwrap_or(0)
                        ),
                    ))
                } else {
                    self.bs.read_unsigned_var(n)
                }
            })
        }
    }

    /// Reads a single marker bit and reports whether it is set.
    #[inline(always)]
    pub fn marker(&mut self) -> io::Result<bool> {
        self.get()
    }

    /// Reads `n` bits that must all be set, returning whether they were.
    #[inline(always)]
    pub fn marker_n(&mut self, n: u32) -> io::Result<bool> {
        let value: u32 = self.get_n(n)?;
        Ok(value == (1u32 << n) - 1)
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs
            .position_in_bits()
            .map(|pos| self.len.saturating_sub(pos))
    }

    /// Bytes left until the end of the underlying slice, rounded down.
    #[inline(always)]
    pub fn available_bytes(&mut self) -> io::Result<u64> {
        self.available().map(|bits| bits >> 3)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        if n <= 64 {
            self.bs.skip(n)
        } else {
            self.available().and_then(|avail| {
                if n as u64 > avail {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "skip_n: out of bounds bits",
                    ))
                } else {
                    self.bs.skip(n)
                }
            })
        }
    }

    #[inline(always)]
    pub fn skip_bytes(&mut self, n: u64) -> io::Result<()> {
        let bits = n << 3;
        if bits > u32::MAX as u64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "skip_bytes: too many bytes",
            ));
        }
        self.skip_n(bits as u32)
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}
