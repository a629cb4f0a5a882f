//! # Nestfile Providers
//!
//! Container providers for the nestfile virtual file system.
//!
//! - **ZipProvider**: PKZIP archives, read directly from a host path or as a
//!   stream from an enclosing container
//! - **JarProvider**: Java archives, a zip specialization that also parses
//!   `META-INF/MANIFEST.MF`
//!
//! ## Example
//!
//! ```rust,no_run
//! use nestfile_core::VfsConfig;
//! use nestfile_providers::factory::vfs_with_defaults;
//!
//! let vfs = vfs_with_defaults(VfsConfig::default().with_separator('/'));
//! let readme = vfs.resolve_path("/data/bundle.zip/inner.zip/readme.txt").unwrap();
//!
//! println!("Depth: {}", readme.depth());
//! println!("Bytes: {}", readme.read_bytes().unwrap().len());
//! ```

pub mod archive;
pub mod factory;
pub mod jar;
mod listing;
mod local;
pub mod manifest;
pub mod reader;

#[cfg(test)]
mod testutil;

pub use archive::ZipProvider;
pub use factory::{default_registry, detect_format, supported_formats, vfs_with_defaults, ContainerFormat};
pub use jar::JarProvider;
pub use manifest::{read_manifest, Manifest};
pub use reader::{ArchiveReader, DirectZip, StreamedZip};
