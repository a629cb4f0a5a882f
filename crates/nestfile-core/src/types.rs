//! Core types for virtual files and containers

use crate::VirtualFile;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used inside zip-family archives
pub const ARCHIVE_SEPARATOR: char = '/';

/// Whether something is a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file (or archive member holding bytes)
    File,
    /// Directory, explicit or implied by a deeper entry
    Directory,
}

/// Existence fact consulted by boundary detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// Not checked (nested candidate without content probing)
    Unknown,
    /// Confirmed absent
    Missing,
    /// Confirmed present
    Exists(EntryKind),
}

impl Existence {
    /// True if confirmed present
    pub fn exists(&self) -> bool {
        matches!(self, Existence::Exists(_))
    }

    /// True if confirmed to be a directory
    pub fn is_directory(&self) -> bool {
        matches!(self, Existence::Exists(EntryKind::Directory))
    }
}

/// One item listed inside an opened container
///
/// Entries only live for the enumeration that produced them; callers get
/// them back as [`VirtualFile`] nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerEntry {
    /// Internal path split into atomic segments
    pub segments: Vec<String>,

    /// File or directory
    pub kind: EntryKind,

    /// Uncompressed size in bytes, when known
    pub size: Option<u64>,
}

impl ContainerEntry {
    /// Create a file entry from an internal path
    pub fn file(path: &str, size: u64) -> Self {
        Self {
            segments: split_internal(path),
            kind: EntryKind::File,
            size: Some(size),
        }
    }

    /// Create a directory entry from an internal path
    pub fn directory(path: &str) -> Self {
        Self {
            segments: split_internal(path),
            kind: EntryKind::Directory,
            size: None,
        }
    }

    /// Build an entry from a raw archive member name
    ///
    /// Backslashes are treated as separators and a trailing separator marks
    /// a directory.
    pub fn from_archive_name(name: &str, is_dir: bool, size: u64) -> Self {
        let normalized = normalize_archive_name(name);
        let is_dir = is_dir || normalized.ends_with(ARCHIVE_SEPARATOR);
        if is_dir {
            Self::directory(&normalized)
        } else {
            Self::file(&normalized, size)
        }
    }

    /// Internal path joined with the archive separator
    pub fn internal_path(&self) -> String {
        self.segments.join("/")
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// True for directories
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

impl fmt::Display for ContainerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_char = if self.is_directory() { "d" } else { "f" };
        let size = match (self.kind, self.size) {
            (EntryKind::Directory, _) => "<DIR>".to_string(),
            (EntryKind::File, Some(size)) => format_size(size),
            (EntryKind::File, None) => "?".to_string(),
        };
        write!(f, "{} {:>12} {}", type_char, size, self.internal_path())
    }
}

/// Everything a provider may look at when deciding whether a path segment
/// is the boundary of one of its containers
#[derive(Debug, Clone, Copy)]
pub struct BoundaryProbe<'a> {
    /// Container the candidate lives in, if any
    pub parent: Option<&'a VirtualFile>,

    /// Candidate segment name (last atom of the accumulated prefix)
    pub name: &'a str,

    /// Full path string of the candidate
    pub path: &'a str,

    /// Existence fact for the candidate
    pub existence: Existence,

    /// First bytes of the candidate, when it exists and could be read
    pub head: Option<&'a [u8]>,
}

impl<'a> BoundaryProbe<'a> {
    /// Lower-case extension of the candidate name, without the dot
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }

    /// True if the candidate name carries one of the extensions
    pub fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension()
            .map_or(false, |ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }
}

/// Normalize an archive member name to forward slashes
pub fn normalize_archive_name(name: &str) -> String {
    name.replace('\\', "/")
}

/// Split an internal archive path into non-empty segments
pub fn split_internal(path: &str) -> Vec<String> {
    path.split(ARCHIVE_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Format size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
