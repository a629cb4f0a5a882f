//! Memory-mapped archive source for direct mode

use memmap2::Mmap;
use nestfile_core::{Error, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A read-only, seekable view of a memory-mapped archive file.
///
/// Direct-mode providers may read central directories and entry data from
/// the mapping instead of issuing a read call per access.
///
/// # Example
///
/// ```rust,no_run
/// use nestfile_pipeline::MmapSource;
/// use std::path::Path;
///
/// let source = MmapSource::open(Path::new("bundle.zip")).unwrap();
/// println!("{} bytes mapped", source.len());
/// ```
pub struct MmapSource {
    mmap: Option<Mmap>,
    position: u64,
}

impl MmapSource {
    /// Map a file read-only
    ///
    /// # Errors
    ///
    /// `WrongKind` if the path is not a regular file, `NotExisting` if it is
    /// missing.
    ///
    /// # Safety
    ///
    /// Uses `unsafe` for memory mapping. The file must not be truncated while
    /// mapped; archives are opened read-only and short-lived.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::not_existing(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_file(&file)
            .map_err(|e| match e {
                Error::WrongKind(_) => Error::wrong_kind(format!("{} is not a regular file", path.display())),
                other => other,
            })
    }

    /// Map an already opened file
    pub fn from_file(file: &File) -> Result<Self> {
        let metadata = file.metadata()?;

        if !metadata.is_file() {
            return Err(Error::wrong_kind("Only regular files can be memory-mapped"));
        }

        // Zero-length mappings are rejected by the OS
        if metadata.len() == 0 {
            return Ok(Self { mmap: None, position: 0 });
        }

        // SAFETY: the descriptor is valid and refers to a regular file; the
        // mapping is private and read-only.
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self {
            mmap: Some(mmap),
            position: 0,
        })
    }

    /// Length of the mapped region
    pub fn len(&self) -> u64 {
        self.as_full_slice().len() as u64
    }

    /// Check if the mapped region is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position)
    }

    /// Mapped bytes from the current position
    pub fn as_slice(&self) -> &[u8] {
        let data = self.as_full_slice();
        let start = (self.position.min(data.len() as u64)) as usize;
        &data[start..]
    }

    /// Every mapped byte
    pub fn as_full_slice(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }
}

impl Read for MmapSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.as_slice();
        let to_read = buf.len().min(available.len());
        buf[..to_read].copy_from_slice(&available[..to_read]);
        self.position += to_read as u64;
        Ok(to_read)
    }
}

impl Seek for MmapSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => self.len().checked_add_signed(offset),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
        };

        match new_pos {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Seek before beginning of mapping",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn mapped(data: &[u8]) -> (NamedTempFile, MmapSource) {
        let mut tmpfile = NamedTempFile::new().unwrap();
        tmpfile.write_all(data).unwrap();
        tmpfile.flush().unwrap();
        let source = MmapSource::open(tmpfile.path()).unwrap();
        (tmpfile, source)
    }

    #[test]
    fn test_read_and_seek() {
        let data: Vec<u8> = (0..100).collect();
        let (_file, mut source) = mapped(&data);

        assert_eq!(source.len(), 100);
        source.seek(SeekFrom::End(-4)).unwrap();
        let mut buf = Vec::new();
        source.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![96, 97, 98, 99]);
        assert_eq!(source.remaining(), 0);

        source.seek(SeekFrom::Start(10)).unwrap();
        assert_eq!(source.as_slice()[0], 10);
        assert!(source.seek(SeekFrom::Current(-11)).is_err());
    }

    #[test]
    fn test_read_past_end() {
        let (_file, mut source) = mapped(b"abc");
        source.seek(SeekFrom::Start(10)).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
        assert!(source.as_slice().is_empty());
    }

    #[test]
    fn test_empty_file() {
        let (_file, mut source) = mapped(b"");
        assert!(source.is_empty());
        let mut buf = [0u8; 4];
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_rejects_directory_and_missing() {
        let dir = tempdir().unwrap();
        assert!(MmapSource::open(dir.path()).err().unwrap().is_wrong_kind());
        assert!(MmapSource::open(&dir.path().join("missing.zip"))
            .err()
            .unwrap()
            .is_not_existing());
    }
}
