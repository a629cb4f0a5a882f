//! Entry window - a bounded view over one member's bytes inside an archive

use std::io::{self, Read, Seek, SeekFrom};

/// Exposes `length` bytes of an underlying stream starting at `start`.
///
/// Direct-mode providers hand out a window over a stored member (or feed
/// one to a decompressor) so the member can be read without copying the
/// archive or keeping a borrow on the archive reader.
///
/// # Example
///
/// ```rust,no_run
/// use nestfile_pipeline::EntryWindow;
/// use std::io::Cursor;
///
/// let archive = Cursor::new(vec![0u8; 1024]);
/// let member = EntryWindow::new(archive, 512, 256).unwrap();
/// assert_eq!(member.length(), 256);
/// ```
pub struct EntryWindow<R: Read + Seek> {
    inner: R,
    start: u64,
    length: u64,
    position: u64,
}

impl<R: Read + Seek> EntryWindow<R> {
    /// Create a window, positioning the inner stream at `start`
    pub fn new(mut inner: R, start: u64, length: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;

        Ok(Self {
            inner,
            start,
            length,
            position: 0,
        })
    }

    /// Offset of the window in the inner stream
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Window length
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Position relative to the window start
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left in the window
    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    /// Give back the inner stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Read for EntryWindow<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let to_read = (buf.len() as u64).min(remaining) as usize;

        // Another reader may share the inner stream
        self.inner.seek(SeekFrom::Start(self.start + self.position))?;
        let bytes_read = self.inner.read(&mut buf[..to_read])?;

        if bytes_read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Archive ended {} bytes before the end of the entry",
                    remaining
                ),
            ));
        }

        self.position += bytes_read as u64;
        Ok(bytes_read)
    }
}

impl<R: Read + Seek> Seek for EntryWindow<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => self.length.checked_add_signed(offset),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
        };

        match new_pos {
            Some(position) if position <= self.length => {
                self.position = position;
                Ok(position)
            }
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Seek beyond end of entry",
            )),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Seek before beginning of entry",
            )),
        }
    }
}
