//! Entry stream - the readable stream handed back by `open_stream`

use crate::handle::{AccessMode, ArchiveHandle};
use nestfile_core::Result;
use std::fmt;
use std::io::{self, Read};

/// Readable stream over one archive entry, owning everything opened to
/// produce it
///
/// Reading after [`close`](Self::close) fails; closing twice reports
/// `ResourceMisuse`. Dropping the stream releases it.
pub struct EntryStream {
    handle: ArchiveHandle<Box<dyn Read + Send>>,
    read: u64,
}

impl EntryStream {
    /// Wrap a reader positioned on the entry's data
    pub fn new(label: impl Into<String>, mode: AccessMode, reader: Box<dyn Read + Send>) -> Self {
        Self {
            handle: ArchiveHandle::new(label, mode, reader),
            read: 0,
        }
    }

    /// Entry path used in diagnostics
    pub fn label(&self) -> &str {
        self.handle.label()
    }

    /// How the backing archive was opened
    pub fn mode(&self) -> AccessMode {
        self.handle.mode()
    }

    /// Bytes handed out so far
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    /// True until closed
    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Release the entry and its archive
    pub fn close(&mut self) -> Result<()> {
        tracing::trace!(entry = self.handle.label(), bytes = self.read, "Closing entry stream");
        self.handle.close()
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let reader = self.handle.get_mut().map_err(|e| e.into_io())?;
        let n = reader.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

impl fmt::Debug for EntryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStream")
            .field("label", &self.label())
            .field("mode", &self.mode())
            .field("bytes_read", &self.read)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(data: &[u8]) -> EntryStream {
        EntryStream::new("a.zip/x.txt", AccessMode::Direct, Box::new(Cursor::new(data.to_vec())))
    }

    #[test]
    fn test_reads_and_counts() {
        let mut entry = stream(b"hello");
        let mut buf = String::new();
        entry.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
        assert_eq!(entry.bytes_read(), 5);
    }

    #[test]
    fn test_read_after_close_fails() {
        let mut entry = stream(b"hello");
        entry.close().unwrap();
        assert!(!entry.is_open());

        let mut buf = [0u8; 4];
        assert!(entry.read(&mut buf).is_err());
        assert!(entry.close().unwrap_err().is_resource_misuse());
    }
}
