//! Core traits for virtual files

use crate::error::{Error, Result};
use crate::types::{BoundaryProbe, ContainerEntry};
use crate::VirtualFile;
use std::fmt;
use std::io::{Read, Seek, Write};

/// Owned, readable byte stream handed between containers
pub type ByteSource = Box<dyn Read + Send>;

/// Owned, writable byte stream
pub type ByteSink = Box<dyn Write + Send>;

/// Trait every container format implements
///
/// Every operation receives the container node, the entry's internal path
/// (empty for the container root) and an optional byte source. Without a
/// source the provider opens the container directly from its physical path
/// (direct mode). With a source the container is itself nested and the
/// provider decodes the source sequentially (streamed mode).
pub trait ContainerProvider: Send + Sync + fmt::Debug {
    /// Human-readable identifier, also used to compare boundary chains
    fn identify(&self) -> &str;

    /// Boundary test: does this provider own the candidate as a container?
    fn claims(&self, probe: &BoundaryProbe<'_>) -> bool;

    /// Priority used when several providers claim the same candidate
    fn priority(&self, parent: Option<&VirtualFile>, name: &str) -> i32;

    /// Head bytes this provider needs to evaluate its content signatures
    fn signature_span(&self) -> usize {
        0
    }

    /// Entries below `entry`, collapsed to direct children unless recursive
    fn list_entries(
        &self,
        container: &VirtualFile,
        entry: &[String],
        recursive: bool,
        source: Option<ByteSource>,
    ) -> Result<Vec<ContainerEntry>>;

    /// Does the entry exist (explicitly or as an implied directory)?
    fn exists(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool>;

    /// Is the entry a file?
    fn is_file(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool>;

    /// Is the entry a directory?
    fn is_directory(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool>;

    /// Open a readable stream over the entry's bytes
    fn open_stream(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<ByteSource>;

    /// Read the entry's bytes completely
    fn read_bytes(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<Vec<u8>>;

    /// Whether writes are possible; container-backed entries never are
    fn can_write(&self, _container: &VirtualFile, _entry: &[String]) -> bool {
        false
    }

    /// Open a writable stream (rejected)
    fn create_output_stream(&self, container: &VirtualFile, entry: &[String], _append: bool) -> Result<ByteSink> {
        Err(mutation_rejected("create_output_stream", container, entry))
    }

    /// Replace the entry's bytes (rejected)
    fn write_bytes(&self, container: &VirtualFile, entry: &[String], _data: &[u8]) -> Result<()> {
        Err(mutation_rejected("write_bytes", container, entry))
    }

    /// Create an empty entry (rejected)
    fn create_new_file(&self, container: &VirtualFile, entry: &[String]) -> Result<bool> {
        Err(mutation_rejected("create_new_file", container, entry))
    }

    /// Delete the entry (rejected)
    fn delete(&self, container: &VirtualFile, entry: &[String]) -> Result<bool> {
        Err(mutation_rejected("delete", container, entry))
    }

    /// Create a directory entry (rejected)
    fn mkdir(&self, container: &VirtualFile, entry: &[String]) -> Result<bool> {
        Err(mutation_rejected("mkdir", container, entry))
    }

    /// Create a directory entry and its parents (rejected)
    fn mkdirs(&self, container: &VirtualFile, entry: &[String]) -> Result<bool> {
        Err(mutation_rejected("mkdirs", container, entry))
    }
}

/// Error raised by every mutation on a container-backed entry
pub fn mutation_rejected(operation: &str, container: &VirtualFile, entry: &[String]) -> Error {
    let separator = container.separator().to_string();
    Error::unsupported_mutation(format!(
        "{} on {}{}{}",
        operation,
        container.path(),
        separator,
        entry.join(&separator)
    ))
}

/// Combined trait for Read + Seek
pub trait ReadSeek: Read + Seek + Send {}

/// Blanket implementation for any type that implements Read + Seek
impl<T: Read + Seek + Send> ReadSeek for T {}
