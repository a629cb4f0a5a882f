//! # Nestfile Pipeline
//!
//! I/O wrappers used by container providers.
//!
//! - **ArchiveHandle**: single-release ownership of whatever one operation
//!   opened (an archive reader, a decoder and its source)
//! - **EntryStream**: the readable stream returned for an archive entry
//! - **EntryWindow**: bounded view over one member's bytes
//! - **MmapSource**: memory-mapped archive file for direct mode
//!
//! ## Example
//!
//! ```rust,no_run
//! use nestfile_pipeline::{AccessMode, ArchiveHandle, MmapSource};
//! use std::path::Path;
//!
//! let source = MmapSource::open(Path::new("bundle.zip")).unwrap();
//! let handle = ArchiveHandle::new("bundle.zip", AccessMode::Direct, source);
//! let _head = handle
//!     .close_and_return(|source| Ok(source.as_full_slice()[..4].to_vec()))
//!     .unwrap();
//! ```

pub mod handle;
pub mod mmap;
pub mod stream;
pub mod window;

pub use handle::{AccessMode, ArchiveHandle};
pub use mmap::MmapSource;
pub use stream::EntryStream;
pub use window::EntryWindow;
