use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use mpegps::utils::source::{ByteSource, ReaderSource};

/// Bytes needed to recognize a Program Stream.
pub const SIGNATURE_LEN: usize = 4;

enum Source {
    File(ReaderSource<File>),
    Memory(Vec<u8>),
}

/// Unified input that handles both file and pipe input.
///
/// Files are read lazily through the scanner's windows. Pipes cannot seek, so
/// stdin is buffered whole before scanning.
pub struct Input {
    source: Source,
}

impl Input {
    /// Create a new Input from a path
    /// Use "-" for stdin pipe input
    pub fn open<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let input_path = input_path.as_ref();

        let source = if input_path.as_os_str() == "-" {
            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .context("Failed to read stdin")?;
            Source::Memory(data)
        } else {
            let source = ReaderSource::open(input_path)
                .with_context(|| format!("Failed to open {}", input_path.display()))?;
            Source::File(source)
        };

        Ok(Self { source })
    }

    /// Check if this is pipe input
    pub fn is_pipe(&self) -> bool {
        matches!(self.source, Source::Memory(_))
    }

    /// Leading bytes used to identify the format.
    pub fn signature(&mut self) -> Result<Vec<u8>> {
        let len = SIGNATURE_LEN.min(self.size() as usize);
        Ok(self.read_range(0, len)?)
    }
}

impl ByteSource for Input {
    fn size(&self) -> u64 {
        match &self.source {
            Source::File(file) => file.size(),
            Source::Memory(data) => data.len() as u64,
        }
    }

    fn read_range(&mut self, offset: u64, length: usize) -> io::Result<Vec<u8>> {
        match &mut self.source {
            Source::File(file) => file.read_range(offset, length),
            Source::Memory(data) => {
                let mut bytes: &[u8] = data.as_slice();
                bytes.read_range(offset, length)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_signature_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&[0x00, 0x00, 0x01, 0xBA, 0x44, 0x00])?;
        file.flush()?;

        let mut input = Input::open(file.path())?;
        assert!(!input.is_pipe());
        assert_eq!(input.size(), 6);
        assert_eq!(input.signature()?, vec![0x00, 0x00, 0x01, 0xBA]);

        Ok(())
    }

    #[test]
    fn short_file_signature() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&[0x00, 0x00])?;
        file.flush()?;

        let mut input = Input::open(file.path())?;
        assert_eq!(input.signature()?, vec![0x00, 0x00]);

        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Input::open("/nonexistent/movie.mpg").is_err());
    }
}
