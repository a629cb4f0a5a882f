//! Archive readers
//!
//! Every provider operation is written once against [`ArchiveReader`]. Two
//! implementations exist: [`DirectZip`] opens an archive by host path with
//! random access, [`StreamedZip`] decodes a forward-only byte stream handed
//! down from an enclosing container.

use crate::listing;
use crate::local::{
    self, DataDescriptor, LocalHeader, CENTRAL_SIGNATURE, DESCRIPTOR_SIGNATURE, END_SIGNATURE,
    LOCAL_SIGNATURE, METHOD_DEFLATED, METHOD_STORED, SPANNING_MARKER, ZIP64_END_SIGNATURE,
};
use flate2::read::DeflateDecoder;
use flate2::{bufread, Crc};
use nestfile_core::security::validate_allocation_size;
use nestfile_core::{ByteSource, ContainerEntry, EntryKind, Error, ReadSeek, Result};
use nestfile_pipeline::{EntryWindow, MmapSource};
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive};

/// Mode-independent access to one opened archive
pub trait ArchiveReader: Send {
    /// Kind of the entry at `entry` (empty for the root), or `None`
    fn lookup(&mut self, entry: &[String]) -> Result<Option<EntryKind>>;

    /// Every member, in archive order
    fn entries(&mut self) -> Result<Vec<ContainerEntry>>;

    /// Materialize a file entry, refusing more than `limit` bytes
    fn read(&mut self, entry: &[String], limit: u64) -> Result<Vec<u8>>;

    /// Turn the reader into a stream over one file entry
    fn into_stream(self: Box<Self>, entry: &[String], limit: u64) -> Result<ByteSource>;
}

/// Map a zip library error onto the virtual file taxonomy
pub(crate) fn map_zip(err: ZipError, label: &str) -> Error {
    match err {
        ZipError::FileNotFound => Error::not_existing(label.to_string()),
        ZipError::InvalidArchive(msg) => {
            Error::malformed_container(format!("{}: {}", label, msg))
        }
        ZipError::UnsupportedArchive(msg) => Error::unsupported(format!("{}: {}", label, msg)),
        ZipError::Io(e) => map_read(e, label),
        other => Error::malformed_container(format!("{}: {}", label, other)),
    }
}

/// Map an I/O error raised while decoding archive bytes
///
/// Truncated or corrupt data surfaces as `UnexpectedEof` / `InvalidData`.
pub(crate) fn map_read(err: io::Error, label: &str) -> Error {
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData => {
            Error::malformed_container(format!("{}: {}", label, err))
        }
        _ => Error::Io(err),
    }
}

fn entry_label(label: &str, entry: &[String]) -> String {
    format!("{}:{}", label, entry.join("/"))
}

/// Read a member fully, guarding against sizes that lie
fn read_limited<R: Read + ?Sized>(reader: &mut R, declared: u64, limit: u64, label: &str) -> Result<Vec<u8>> {
    let capacity = validate_allocation_size(declared, limit, label)?;
    let mut data = Vec::with_capacity(capacity);
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|e| map_read(e, label))?;

    if data.len() as u64 > limit {
        return Err(Error::limit_exceeded(format!(
            "{} exceeds limit {}",
            label, limit
        )));
    }
    Ok(data)
}

/// Random-access reader bound to a host path
pub struct DirectZip {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    label: String,
}

impl DirectZip {
    /// Open an archive, optionally through a memory mapping
    pub fn open(path: &Path, use_mmap: bool) -> Result<Self> {
        let label = path.display().to_string();
        let reader: Box<dyn ReadSeek> = if use_mmap {
            Box::new(MmapSource::open(path)?)
        } else {
            let file = File::open(path).map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    Error::not_existing(label.clone())
                } else {
                    Error::Io(e)
                }
            })?;
            Box::new(BufReader::new(file))
        };

        let archive = ZipArchive::new(reader).map_err(|e| map_zip(e, &label))?;
        tracing::debug!(archive = %label, members = archive.len(), mmap = use_mmap, "Opened archive directly");
        Ok(Self { archive, label })
    }

    /// Index of the member named exactly `entry`
    fn index_of(&mut self, entry: &[String]) -> Result<Option<usize>> {
        let key = entry.join("/");
        if let Some(index) = self.archive.index_for_name(&key) {
            return Ok(Some(index));
        }
        if let Some(index) = self.archive.index_for_name(&format!("{}/", key)) {
            return Ok(Some(index));
        }

        // Names stored with backslashes or other spellings
        for index in 0..self.archive.len() {
            let file = self.archive.by_index_raw(index).map_err(|e| map_zip(e, &self.label))?;
            let normalized = ContainerEntry::from_archive_name(file.name(), file.is_dir(), 0);
            if normalized.segments == entry {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Index of a file member, with the precondition errors callers expect
    fn file_index(&mut self, entry: &[String]) -> Result<usize> {
        match self.index_of(entry)? {
            Some(index) => {
                let file = self.archive.by_index_raw(index).map_err(|e| map_zip(e, &self.label))?;
                if file.is_dir() {
                    return Err(Error::wrong_kind(entry_label(&self.label, entry)));
                }
                Ok(index)
            }
            None => match self.lookup(entry)? {
                Some(EntryKind::Directory) => Err(Error::wrong_kind(entry_label(&self.label, entry))),
                _ => Err(Error::not_existing(entry_label(&self.label, entry))),
            },
        }
    }
}

impl ArchiveReader for DirectZip {
    fn lookup(&mut self, entry: &[String]) -> Result<Option<EntryKind>> {
        if entry.is_empty() {
            return Ok(Some(EntryKind::Directory));
        }

        if let Some(index) = self.index_of(entry)? {
            let file = self.archive.by_index_raw(index).map_err(|e| map_zip(e, &self.label))?;
            let normalized = ContainerEntry::from_archive_name(file.name(), file.is_dir(), 0);
            return Ok(Some(normalized.kind));
        }

        // Not a member itself, but possibly an implied directory
        let entries = self.entries()?;
        Ok(listing::classify(&entries, entry))
    }

    fn entries(&mut self) -> Result<Vec<ContainerEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self.archive.by_index_raw(index).map_err(|e| map_zip(e, &self.label))?;
            entries.push(ContainerEntry::from_archive_name(file.name(), file.is_dir(), file.size()));
        }
        Ok(entries)
    }

    fn read(&mut self, entry: &[String], limit: u64) -> Result<Vec<u8>> {
        let index = self.file_index(entry)?;
        let label = entry_label(&self.label, entry);
        let mut file = self.archive.by_index(index).map_err(|e| map_zip(e, &label))?;
        let declared = file.size();
        read_limited(&mut file, declared, limit, &label)
    }

    fn into_stream(mut self: Box<Self>, entry: &[String], limit: u64) -> Result<ByteSource> {
        let index = self.file_index(entry)?;
        let label = entry_label(&self.label, entry);

        let (start, compressed, size, method, encrypted) = {
            let file = self.archive.by_index_raw(index).map_err(|e| map_zip(e, &label))?;
            (
                file.data_start(),
                file.compressed_size(),
                file.size(),
                file.compression(),
                file.encrypted(),
            )
        };

        if encrypted {
            return Err(Error::unsupported(format!("{} is encrypted", label)));
        }

        match method {
            CompressionMethod::Stored => {
                tracing::debug!(entry = %label, size, "Streaming stored entry");
                let window = EntryWindow::new(self.archive.into_inner(), start, compressed)?;
                Ok(Box::new(window))
            }
            CompressionMethod::Deflated => {
                tracing::debug!(entry = %label, size, compressed, "Streaming deflated entry");
                let window = EntryWindow::new(self.archive.into_inner(), start, compressed)?;
                Ok(Box::new(DeflateDecoder::new(window).take(size)))
            }
            other => {
                tracing::debug!(entry = %label, method = ?other, "Materializing entry for streaming");
                Ok(Box::new(Cursor::new(self.read(entry, limit)?)))
            }
        }
    }
}

/// Forward-only reader over an archive's bytes
///
/// Members are decoded from their local headers in archive order, so an
/// archive nested inside another is never buffered whole. Each operation
/// consumes the stream; providers open a fresh one per call.
pub struct StreamedZip {
    source: BufReader<ByteSource>,
    label: String,
    started: bool,
    finished: bool,
}

impl StreamedZip {
    /// Decode `source`, naming it `label` in diagnostics
    pub fn new(source: ByteSource, label: impl Into<String>) -> Self {
        let label = label.into();
        tracing::debug!(archive = %label, "Scanning archive as a stream");
        Self {
            source: BufReader::new(source),
            label,
            started: false,
            finished: false,
        }
    }

    fn entry_of(header: &LocalHeader, size: u64) -> ContainerEntry {
        ContainerEntry::from_archive_name(&header.name, header.is_directory(), size)
    }

    /// Header of the next member, or `None` where the central directory begins
    fn next_header(&mut self) -> Result<Option<LocalHeader>> {
        if self.finished {
            return Ok(None);
        }

        let mut signature = local::read_u32(&mut self.source).map_err(|e| map_read(e, &self.label))?;
        if !self.started {
            self.started = true;
            if signature == SPANNING_MARKER || signature == DESCRIPTOR_SIGNATURE {
                signature = local::read_u32(&mut self.source).map_err(|e| map_read(e, &self.label))?;
            }
        }

        match signature {
            LOCAL_SIGNATURE => {
                let header = LocalHeader::read(&mut self.source).map_err(|e| map_read(e, &self.label))?;
                tracing::trace!(archive = %self.label, member = %header.name, "Local header");
                Ok(Some(header))
            }
            CENTRAL_SIGNATURE | END_SIGNATURE | ZIP64_END_SIGNATURE => {
                self.finished = true;
                Ok(None)
            }
            other => Err(Error::malformed_container(format!(
                "{}: unexpected signature {:#010x}",
                self.label, other
            ))),
        }
    }

    fn descriptor(&mut self, header: &LocalHeader) -> Result<DataDescriptor> {
        DataDescriptor::read(&mut self.source, header.zip64).map_err(|e| map_read(e, &self.label))
    }

    /// Move past a member's data, returning its uncompressed size
    fn skip(&mut self, header: &LocalHeader) -> Result<u64> {
        if !header.has_descriptor() {
            let copied = io::copy(&mut (&mut self.source).take(header.compressed_size), &mut io::sink())
                .map_err(|e| map_read(e, &self.label))?;
            if copied < header.compressed_size {
                return Err(Error::malformed_container(format!(
                    "{}: {} is truncated",
                    self.label, header.name
                )));
            }
            return Ok(header.size);
        }

        // Without sizes up front, the end of the data is only found by decoding it
        match header.method {
            METHOD_DEFLATED if !header.is_encrypted() => {
                let mut decoder = bufread::DeflateDecoder::new(&mut self.source);
                io::copy(&mut decoder, &mut io::sink()).map_err(|e| map_read(e, &self.label))?;
            }
            METHOD_STORED if header.is_directory() => {}
            _ => {
                return Err(Error::unsupported(format!(
                    "{}: cannot step over {} without its sizes",
                    self.label, header.name
                )))
            }
        }
        Ok(self.descriptor(header)?.size)
    }

    /// Advance to the member named `entry`, failing unless it is a file
    fn seek_file(&mut self, entry: &[String], label: &str) -> Result<LocalHeader> {
        if entry.is_empty() {
            return Err(Error::wrong_kind(label.to_string()));
        }
        while let Some(header) = self.next_header()? {
            let member = Self::entry_of(&header, header.size);
            let below = member.segments.len() > entry.len() && member.segments.starts_with(entry);
            if member.segments == entry && !member.is_directory() {
                return Ok(header);
            }
            if member.segments == entry || below {
                return Err(Error::wrong_kind(label.to_string()));
            }
            self.skip(&header)?;
        }
        Err(Error::not_existing(label.to_string()))
    }

    /// Decode the data of the member just located, checking size and CRC
    fn read_data(&mut self, header: &LocalHeader, limit: u64, label: &str) -> Result<Vec<u8>> {
        if header.is_encrypted() {
            return Err(Error::unsupported(format!("{} is encrypted", label)));
        }

        let (data, expected) = match (header.method, header.has_descriptor()) {
            (METHOD_STORED, false) => {
                let mut member = (&mut self.source).take(header.compressed_size);
                (read_limited(&mut member, header.size, limit, label)?, None)
            }
            (METHOD_DEFLATED, false) => {
                let mut decoder = bufread::DeflateDecoder::new((&mut self.source).take(header.compressed_size));
                (read_limited(&mut decoder, header.size, limit, label)?, None)
            }
            (METHOD_DEFLATED, true) => {
                let data = {
                    let mut decoder = bufread::DeflateDecoder::new(&mut self.source);
                    read_limited(&mut decoder, 0, limit, label)?
                };
                (data, Some(self.descriptor(header)?))
            }
            (method, _) => {
                return Err(Error::unsupported(format!(
                    "{}: compression method {} in a stream",
                    label, method
                )))
            }
        };

        let (crc32, size) = match expected {
            Some(descriptor) => (descriptor.crc32, descriptor.size),
            None => (header.crc32, header.size),
        };
        let mut crc = Crc::new();
        crc.update(&data);
        if data.len() as u64 != size || crc.sum() != crc32 {
            return Err(Error::malformed_container(format!(
                "{}: {} bytes decoded, CRC {:08x}, expected {} bytes, CRC {:08x}",
                label,
                data.len(),
                crc.sum(),
                size,
                crc32
            )));
        }
        Ok(data)
    }
}

impl ArchiveReader for StreamedZip {
    fn lookup(&mut self, entry: &[String]) -> Result<Option<EntryKind>> {
        if entry.is_empty() {
            return Ok(Some(EntryKind::Directory));
        }

        while let Some(header) = self.next_header()? {
            let member = Self::entry_of(&header, header.size);
            if member.segments == entry {
                return Ok(Some(member.kind));
            }
            if member.segments.len() > entry.len() && member.segments.starts_with(entry) {
                return Ok(Some(EntryKind::Directory));
            }
            self.skip(&header)?;
        }
        Ok(None)
    }

    fn entries(&mut self) -> Result<Vec<ContainerEntry>> {
        let mut entries = Vec::new();
        while let Some(header) = self.next_header()? {
            let size = self.skip(&header)?;
            entries.push(Self::entry_of(&header, size));
        }
        Ok(entries)
    }

    fn read(&mut self, entry: &[String], limit: u64) -> Result<Vec<u8>> {
        let label = entry_label(&self.label, entry);
        let header = self.seek_file(entry, &label)?;
        self.read_data(&header, limit, &label)
    }

    fn into_stream(mut self: Box<Self>, entry: &[String], _limit: u64) -> Result<ByteSource> {
        let label = entry_label(&self.label, entry);
        let header = self.seek_file(entry, &label)?;
        if header.is_encrypted() {
            return Err(Error::unsupported(format!("{} is encrypted", label)));
        }

        let source = self.source;
        match (header.method, header.has_descriptor()) {
            (METHOD_STORED, false) => {
                tracing::debug!(entry = %label, size = header.size, "Streaming stored member");
                Ok(Box::new(source.take(header.compressed_size)))
            }
            (METHOD_DEFLATED, false) => {
                tracing::debug!(entry = %label, size = header.size, "Streaming deflated member");
                let decoder = bufread::DeflateDecoder::new(source.take(header.compressed_size));
                Ok(Box::new(decoder.take(header.size)))
            }
            (METHOD_DEFLATED, true) => {
                tracing::debug!(entry = %label, "Streaming deflated member of unknown size");
                Ok(Box::new(bufread::DeflateDecoder::new(source)))
            }
            (method, _) => Err(Error::unsupported(format!(
                "{}: compression method {} in a stream",
                label, method
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_descriptor_zip, build_zip, Member};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn path(p: &str) -> Vec<String> {
        p.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect()
    }

    fn sample() -> Vec<u8> {
        build_zip(&[
            Member::dir("docs"),
            Member::stored("docs/readme.txt", b"stored bytes"),
            Member::deflated("docs/big.txt", &b"deflate me ".repeat(200)[..]),
            Member::deflated("deep/x/y.txt", &b"why"[..]),
        ])
    }

    fn on_disk(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn readers(bytes: &[u8], file: &NamedTempFile) -> Vec<Box<dyn ArchiveReader>> {
        vec![
            Box::new(DirectZip::open(file.path(), false).unwrap()),
            Box::new(DirectZip::open(file.path(), true).unwrap()),
            Box::new(StreamedZip::new(Box::new(Cursor::new(bytes.to_vec())), "sample")),
        ]
    }

    #[test]
    fn test_lookup_agrees_across_modes() {
        let bytes = sample();
        let file = on_disk(&bytes);

        for (target, expected) in [
            ("docs", Some(EntryKind::Directory)),
            ("docs/readme.txt", Some(EntryKind::File)),
            ("deep", Some(EntryKind::Directory)),
            ("deep/x", Some(EntryKind::Directory)),
            ("missing.txt", None),
            ("doc", None),
        ] {
            for mut reader in readers(&bytes, &file) {
                assert_eq!(reader.lookup(&path(target)).unwrap(), expected, "{}", target);
            }
        }
    }

    #[test]
    fn test_read_agrees_across_modes() {
        let bytes = sample();
        let file = on_disk(&bytes);

        for mut reader in readers(&bytes, &file) {
            assert_eq!(reader.read(&path("docs/readme.txt"), u64::MAX).unwrap(), b"stored bytes");
        }
        for mut reader in readers(&bytes, &file) {
            assert_eq!(
                reader.read(&path("docs/big.txt"), u64::MAX).unwrap(),
                b"deflate me ".repeat(200)
            );
        }
    }

    #[test]
    fn test_streams_agree_across_modes() {
        let bytes = sample();
        let file = on_disk(&bytes);

        for target in ["docs/readme.txt", "docs/big.txt", "deep/x/y.txt"] {
            let mut outputs = Vec::new();
            for reader in readers(&bytes, &file) {
                let mut stream = reader.into_stream(&path(target), u64::MAX).unwrap();
                let mut data = Vec::new();
                stream.read_to_end(&mut data).unwrap();
                outputs.push(data);
            }
            assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]), "{}", target);
        }
    }

    #[test]
    fn test_read_preconditions() {
        let bytes = sample();
        let file = on_disk(&bytes);

        for mut reader in readers(&bytes, &file) {
            assert!(reader.read(&path("docs"), u64::MAX).unwrap_err().is_wrong_kind());
        }
        for mut reader in readers(&bytes, &file) {
            assert!(reader.read(&path("nope.txt"), u64::MAX).unwrap_err().is_not_existing());
        }
        for mut reader in readers(&bytes, &file) {
            let err = reader.read(&path("docs/big.txt"), 16).unwrap_err();
            assert!(matches!(err, Error::LimitExceeded(_)));
        }
    }

    #[test]
    fn test_entries_in_archive_order() {
        let bytes = sample();
        let file = on_disk(&bytes);

        for mut reader in readers(&bytes, &file) {
            let names: Vec<String> = reader
                .entries()
                .unwrap()
                .iter()
                .map(ContainerEntry::internal_path)
                .collect();
            assert_eq!(names, vec!["docs", "docs/readme.txt", "docs/big.txt", "deep/x/y.txt"]);
        }
    }

    #[test]
    fn test_garbage_is_malformed() {
        let file = on_disk(b"this is not an archive at all");
        assert!(DirectZip::open(file.path(), false).err().unwrap().is_malformed_container());

        let mut streamed = StreamedZip::new(Box::new(Cursor::new(b"garbage!".to_vec())), "g");
        assert!(streamed.entries().unwrap_err().is_malformed_container());

        let mut empty = StreamedZip::new(Box::new(Cursor::new(Vec::new())), "empty");
        assert!(empty.entries().unwrap_err().is_malformed_container());
    }

    fn descriptor_sample() -> Vec<u8> {
        build_descriptor_zip(&[
            ("docs/readme.txt", &b"written by a streaming writer"[..]),
            ("docs/big.txt", &b"deflate me ".repeat(200)[..]),
            ("deep/x/y.txt", &b"why"[..]),
        ])
    }

    #[test]
    fn test_descriptor_members_agree_across_modes() {
        let bytes = descriptor_sample();
        let file = on_disk(&bytes);

        for mut reader in readers(&bytes, &file) {
            let entries = reader.entries().unwrap();
            let names: Vec<String> = entries.iter().map(ContainerEntry::internal_path).collect();
            assert_eq!(names, vec!["docs/readme.txt", "docs/big.txt", "deep/x/y.txt"]);
            assert_eq!(entries[1].size, Some(2200));
        }
        for mut reader in readers(&bytes, &file) {
            assert_eq!(reader.lookup(&path("deep/x")).unwrap(), Some(EntryKind::Directory));
        }
        for mut reader in readers(&bytes, &file) {
            assert_eq!(reader.read(&path("deep/x/y.txt"), u64::MAX).unwrap(), b"why");
        }
        for reader in readers(&bytes, &file) {
            let mut stream = reader.into_stream(&path("docs/big.txt"), u64::MAX).unwrap();
            let mut data = Vec::new();
            stream.read_to_end(&mut data).unwrap();
            assert_eq!(data, b"deflate me ".repeat(200));
        }
    }

    #[test]
    fn test_streamed_stream_ignores_read_limit() {
        let bytes = sample();
        for target in ["docs/big.txt", "docs/readme.txt"] {
            let mut limited = StreamedZip::new(Box::new(Cursor::new(bytes.clone())), "sample");
            assert!(matches!(limited.read(&path(target), 4), Err(Error::LimitExceeded(_))));

            let reader: Box<dyn ArchiveReader> = Box::new(StreamedZip::new(Box::new(Cursor::new(bytes.clone())), "sample"));
            let mut stream = reader.into_stream(&path(target), 4).unwrap();
            let mut data = Vec::new();
            stream.read_to_end(&mut data).unwrap();
            assert!(data.len() > 4, "{}", target);
        }
    }

    #[test]
    fn test_streamed_crc_mismatch_is_malformed() {
        let mut bytes = build_zip(&[Member::stored("a.txt", b"original")]);
        let at = bytes.windows(8).position(|w| w == b"original").unwrap();
        bytes[at] = b'O';

        let mut streamed = StreamedZip::new(Box::new(Cursor::new(bytes)), "corrupt");
        assert!(streamed.read(&path("a.txt"), u64::MAX).unwrap_err().is_malformed_container());
    }

    #[test]
    fn test_streamed_truncated_member() {
        let bytes = build_zip(&[Member::stored("a.txt", b"0123456789"), Member::stored("b.txt", b"b")]);
        let cut = bytes.windows(10).position(|w| w == b"0123456789").unwrap() + 5;

        let mut streamed = StreamedZip::new(Box::new(Cursor::new(bytes[..cut].to_vec())), "cut");
        assert!(streamed.entries().unwrap_err().is_malformed_container());
    }

    #[test]
    fn test_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.zip");
        assert!(DirectZip::open(&missing, false).err().unwrap().is_not_existing());
        assert!(DirectZip::open(&missing, true).err().unwrap().is_not_existing());
    }
}
