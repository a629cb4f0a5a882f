//! Zip container provider

use crate::listing;
use crate::reader::{ArchiveReader, DirectZip, StreamedZip};
use nestfile_core::magic::{self, Classifier};
use nestfile_core::{
    BoundaryProbe, ByteSource, ContainerEntry, ContainerProvider, EntryKind, Error, Result,
    SignatureSet, VirtualFile,
};
use nestfile_pipeline::{AccessMode, ArchiveHandle, EntryStream};

/// Extensions claimed by name when content is not available
pub const ZIP_EXTENSIONS: &[&str] = &["zip", "jar"];

type ReaderHandle = ArchiveHandle<Box<dyn ArchiveReader>>;

/// Provider for the zip family
///
/// Candidates that exist and could be read are claimed by signature, so a
/// misnamed archive is still found and a text file named `.zip` is not.
/// Candidates without readable content are claimed by extension.
#[derive(Debug, Clone)]
pub struct ZipProvider {
    signatures: SignatureSet,
}

impl Default for ZipProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipProvider {
    /// Identifier reported by [`ContainerProvider::identify`]
    pub const IDENTIFY: &'static str = "zip";

    /// Base priority of the zip family
    pub const PRIORITY: i32 = 0;

    /// Provider using the built-in zip signatures
    pub fn new() -> Self {
        let signatures = Classifier::shared()
            .set(magic::ZIP)
            .cloned()
            .unwrap_or_default();
        Self::with_signatures(signatures)
    }

    /// Provider using a custom signature set
    pub fn with_signatures(signatures: SignatureSet) -> Self {
        Self { signatures }
    }

    /// Signatures used for content detection
    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    /// Open `container` directly from its host path, or as a stream when a
    /// source is supplied
    fn open(&self, container: &VirtualFile, source: Option<ByteSource>) -> Result<ReaderHandle> {
        let label = container.path().to_string();

        let Some(source) = source else {
            let path = container.physical_path().ok_or_else(|| {
                Error::unsupported(format!("{} has no host path for direct access", label))
            })?;

            match container.vfs().fs().metadata(&path)? {
                Some(EntryKind::File) => {}
                Some(EntryKind::Directory) => {
                    return Err(Error::wrong_kind(format!("{} is a directory", label)))
                }
                None => return Err(Error::not_existing(label)),
            }

            let reader: Box<dyn ArchiveReader> =
                Box::new(DirectZip::open(&path, container.vfs().config().use_mmap)?);
            return Ok(ArchiveHandle::new(label, AccessMode::Direct, reader));
        };

        let reader: Box<dyn ArchiveReader> = Box::new(StreamedZip::new(source, label.clone()));
        Ok(ArchiveHandle::new(label, AccessMode::Streamed, reader))
    }

    fn describe(container: &VirtualFile, entry: &[String]) -> String {
        let separator = container.separator().to_string();
        format!("{}{}{}", container.path(), separator, entry.join(&separator))
    }
}

impl ContainerProvider for ZipProvider {
    fn identify(&self) -> &str {
        Self::IDENTIFY
    }

    fn claims(&self, probe: &BoundaryProbe<'_>) -> bool {
        if probe.existence.is_directory() {
            return false;
        }
        match probe.head {
            Some(head) if probe.existence.exists() => self.signatures.matches(head),
            _ => probe.has_extension(ZIP_EXTENSIONS),
        }
    }

    fn priority(&self, _parent: Option<&VirtualFile>, _name: &str) -> i32 {
        Self::PRIORITY
    }

    fn signature_span(&self) -> usize {
        self.signatures.max_span()
    }

    fn list_entries(
        &self,
        container: &VirtualFile,
        entry: &[String],
        recursive: bool,
        source: Option<ByteSource>,
    ) -> Result<Vec<ContainerEntry>> {
        self.open(container, source)?.close_and_return(|reader| {
            let all = reader.entries()?;
            match listing::classify(&all, entry) {
                Some(EntryKind::Directory) => Ok(listing::children(&all, entry, recursive)),
                Some(EntryKind::File) => Err(Error::wrong_kind(format!(
                    "{} is not a directory",
                    Self::describe(container, entry)
                ))),
                None => Err(Error::not_existing(Self::describe(container, entry))),
            }
        })
    }

    fn exists(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool> {
        self.open(container, source)?
            .close_and_return(|reader| Ok(reader.lookup(entry)?.is_some()))
    }

    fn is_file(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool> {
        self.open(container, source)?
            .close_and_return(|reader| Ok(reader.lookup(entry)? == Some(EntryKind::File)))
    }

    fn is_directory(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool> {
        self.open(container, source)?
            .close_and_return(|reader| Ok(reader.lookup(entry)? == Some(EntryKind::Directory)))
    }

    fn open_stream(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<ByteSource> {
        let limit = container.vfs().config().max_entry_size;
        let handle = self.open(container, source)?;
        let mode = handle.mode();

        let stream = handle.into_inner()?.into_stream(entry, limit)?;
        Ok(Box::new(EntryStream::new(Self::describe(container, entry), mode, stream)))
    }

    fn read_bytes(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<Vec<u8>> {
        let limit = container.vfs().config().max_entry_size;
        self.open(container, source)?
            .close_and_return(|reader| reader.read(entry, limit))
    }
}
