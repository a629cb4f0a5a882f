//! # Nestfile Core
//!
//! Core traits, types, and error handling for addressing files inside
//! nested archives.
//!
//! A path such as `data/bundle.zip/inner.zip/readme.txt` is split into
//! segments and walked left to right. Whenever a registered
//! [`ContainerProvider`] claims a prefix, that prefix becomes a container
//! boundary and the remaining segments are resolved inside it.
//!
//! - **Vfs**: registry, physical filesystem and configuration shared by a
//!   family of nodes
//! - **VirtualFile**: an immutable node with its container chain
//! - **ContainerProvider**: one archive format, operated directly from a
//!   host path or sequentially from a byte stream
//! - **Classifier**: magic-number signatures for content detection
//!
//! ## Example
//!
//! ```rust,no_run
//! use nestfile_core::{ProviderRegistry, Result, Vfs, VfsConfig};
//!
//! fn show(registry: ProviderRegistry) -> Result<()> {
//!     let vfs = Vfs::new(registry, VfsConfig::default().with_separator('/'));
//!     let file = vfs.resolve_path("data/bundle.zip/inner.zip/readme.txt")?;
//!     println!("{} ({} containers deep)", file, file.depth());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod file;
pub mod host;
pub mod magic;
pub mod registry;
pub mod security;
pub mod traits;
pub mod types;
pub mod vfs;


// Re-export commonly used items
pub use config::VfsConfig;
pub use error::{Error, Result};
pub use file::VirtualFile;
pub use host::{HostFs, PhysicalFs};
pub use magic::{Classifier, Signature, SignatureSet};
pub use registry::ProviderRegistry;
pub use security::*;
pub use traits::{mutation_rejected, ByteSink, ByteSource, ContainerProvider, ReadSeek};
pub use types::{BoundaryProbe, ContainerEntry, EntryKind, Existence};
pub use vfs::Vfs;
