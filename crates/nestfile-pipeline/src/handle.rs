//! Archive handle - single-release ownership of an opened archive

use nestfile_core::{Error, Result};
use std::fmt;

/// How an archive was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Random-access reader bound to a host path
    Direct,
    /// Forward-only decoder over a byte stream
    Streamed,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Direct => write!(f, "direct"),
            AccessMode::Streamed => write!(f, "streamed"),
        }
    }
}

/// Owns whatever was opened to satisfy one operation and releases it
/// exactly once.
///
/// The wrapped value owns its own inner handles (a decoder owns the byte
/// source it decodes), so dropping it releases the decoder before the
/// source. An explicit second [`close`](Self::close), or any access after
/// close, is reported as [`Error::ResourceMisuse`]. A handle that was never
/// closed is released when dropped.
///
/// # Example
///
/// ```rust
/// use nestfile_pipeline::{AccessMode, ArchiveHandle};
/// use std::io::Cursor;
///
/// let handle = ArchiveHandle::new("bundle.zip", AccessMode::Streamed, Cursor::new(vec![1u8, 2, 3]));
/// let len = handle.close_and_return(|cursor| Ok(cursor.get_ref().len())).unwrap();
/// assert_eq!(len, 3);
/// ```
pub struct ArchiveHandle<T> {
    inner: Option<T>,
    label: String,
    mode: AccessMode,
}

impl<T> ArchiveHandle<T> {
    /// Take ownership of an opened resource
    pub fn new(label: impl Into<String>, mode: AccessMode, inner: T) -> Self {
        let label = label.into();
        tracing::trace!(label = %label, mode = %mode, "Opened archive handle");
        Self {
            inner: Some(inner),
            label,
            mode,
        }
    }

    /// Label used in diagnostics (usually the container path)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Access mode
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// True until closed
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn misuse(&self, action: &str) -> Error {
        Error::resource_misuse(format!("{} on closed handle {}", action, self.label))
    }

    /// Shared access to the open resource
    pub fn get(&self) -> Result<&T> {
        match self.inner.as_ref() {
            Some(inner) => Ok(inner),
            None => Err(self.misuse("access")),
        }
    }

    /// Exclusive access to the open resource
    pub fn get_mut(&mut self) -> Result<&mut T> {
        let label = &self.label;
        self.inner
            .as_mut()
            .ok_or_else(|| Error::resource_misuse(format!("access on closed handle {}", label)))
    }

    /// Release the resource
    ///
    /// # Errors
    ///
    /// `ResourceMisuse` if the handle was already closed.
    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(inner) => {
                drop(inner);
                tracing::trace!(label = %self.label, mode = %self.mode, "Closed archive handle");
                Ok(())
            }
            None => Err(self.misuse("close")),
        }
    }

    /// Run `transform` against the open resource, then release it whether
    /// or not the transform succeeded
    pub fn close_and_return<R, F>(mut self, transform: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let result = match self.inner.as_mut() {
            Some(inner) => transform(inner),
            None => Err(self.misuse("close_and_return")),
        };

        if self.inner.is_some() {
            self.close()?;
        }
        result
    }

    /// Hand the resource over to the caller, who becomes responsible for it
    pub fn into_inner(mut self) -> Result<T> {
        match self.inner.take() {
            Some(inner) => Ok(inner),
            None => Err(self.misuse("into_inner")),
        }
    }
}

impl<T> Drop for ArchiveHandle<T> {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            tracing::trace!(label = %self.label, mode = %self.mode, "Released archive handle on drop");
        }
    }
}

impl<T> fmt::Debug for ArchiveHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveHandle")
            .field("label", &self.label)
            .field("mode", &self.mode)
            .field("open", &self.is_open())
            .finish()
    }
}
