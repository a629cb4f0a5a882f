//! The virtual file node
//!
//! A [`VirtualFile`] names a location that may sit on the host filesystem or
//! inside any depth of nested containers. Nodes are immutable and cheap to
//! clone; each holds a shared reference to its container chain.

use crate::error::Result;
use crate::magic::{self, Classifier};
use crate::traits::{ByteSink, ByteSource, ContainerProvider};
use crate::types::EntryKind;
use crate::vfs::Vfs;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// A location on the host filesystem or inside nested containers
#[derive(Clone)]
pub struct VirtualFile {
    segments: Vec<String>,
    parent: Option<Arc<VirtualFile>>,
    provider: Option<Arc<dyn ContainerProvider>>,
    format: Option<Arc<dyn ContainerProvider>>,
    vfs: Vfs,
    path: OnceLock<String>,
}

impl VirtualFile {
    pub(crate) fn node(
        vfs: Vfs,
        segments: Vec<String>,
        parent: Option<Arc<VirtualFile>>,
        provider: Option<Arc<dyn ContainerProvider>>,
        format: Option<Arc<dyn ContainerProvider>>,
    ) -> Self {
        Self {
            segments,
            parent,
            provider,
            format,
            vfs,
            path: OnceLock::new(),
        }
    }

    pub(crate) fn with_format(mut self, format: Arc<dyn ContainerProvider>) -> Self {
        self.format = Some(format);
        self
    }

    /// Segments relative to the parent container (or the host root)
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, empty for the root
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Container this node lives in
    pub fn parent(&self) -> Option<&Arc<VirtualFile>> {
        self.parent.as_ref()
    }

    /// Provider serving this node's operations (present with a parent)
    pub fn provider(&self) -> Option<&Arc<dyn ContainerProvider>> {
        self.provider.as_ref()
    }

    /// Provider that claimed this node as a container
    pub fn container_provider(&self) -> Option<&Arc<dyn ContainerProvider>> {
        self.format.as_ref()
    }

    /// True if this node is itself a container boundary
    pub fn is_container(&self) -> bool {
        self.format.is_some()
    }

    /// Number of container ancestors
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent.as_deref();
        while let Some(node) = current {
            depth += 1;
            current = node.parent.as_deref();
        }
        depth
    }

    /// Container ancestors, outermost first
    pub fn containers(&self) -> Vec<&VirtualFile> {
        let mut chain = Vec::new();
        let mut current = self.parent.as_deref();
        while let Some(node) = current {
            chain.push(node);
            current = node.parent.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Outermost ancestor, or this node when it has no container
    pub fn root(&self) -> &VirtualFile {
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            current = parent;
        }
        current
    }

    /// The family this node was resolved through
    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// Separator used for path strings
    pub fn separator(&self) -> char {
        self.vfs.config().separator
    }

    /// Full path string
    ///
    /// The parent's path, the separator, then this node's segments joined by
    /// the separator. Computed once and cached.
    pub fn path(&self) -> &str {
        self.path.get_or_init(|| {
            let sep = self.separator().to_string();
            let own = if self.segments.len() == 1 && self.segments[0].is_empty() {
                sep.clone()
            } else {
                self.segments.join(&sep)
            };
            match &self.parent {
                Some(parent) => format!("{}{}{}", parent.path(), sep, own),
                None => own,
            }
        })
    }

    /// Host path, for nodes outside every container
    pub fn physical_path(&self) -> Option<PathBuf> {
        match self.parent {
            None => Some(PathBuf::from(self.path())),
            Some(_) => None,
        }
    }

    fn host_path(&self) -> PathBuf {
        PathBuf::from(self.path())
    }

    fn boundary(&self) -> Option<(&Arc<VirtualFile>, &Arc<dyn ContainerProvider>)> {
        match (&self.parent, &self.provider) {
            (Some(parent), Some(provider)) => Some((parent, provider)),
            _ => None,
        }
    }

    /// Byte source for operating on this node as a container: none when the
    /// provider can open it from the host path, a stream otherwise
    pub(crate) fn container_source(&self) -> Result<Option<ByteSource>> {
        if self.parent.is_some() {
            Ok(Some(self.open_stream()?))
        } else {
            Ok(None)
        }
    }

    /// Does anything exist here?
    pub fn exists(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => {
                provider.exists(container, &self.segments, container.container_source()?)
            }
            None => Ok(self.vfs.fs().metadata(&self.host_path())?.is_some()),
        }
    }

    /// Is this a file (including container files)?
    pub fn is_file(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => {
                provider.is_file(container, &self.segments, container.container_source()?)
            }
            None => Ok(self.vfs.fs().metadata(&self.host_path())? == Some(EntryKind::File)),
        }
    }

    /// Is this a directory?
    pub fn is_directory(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => {
                provider.is_directory(container, &self.segments, container.container_source()?)
            }
            None => Ok(self.vfs.fs().metadata(&self.host_path())? == Some(EntryKind::Directory)),
        }
    }

    /// Open a readable stream over this file's bytes
    pub fn open_stream(&self) -> Result<ByteSource> {
        match self.boundary() {
            Some((container, provider)) => {
                provider.open_stream(container, &self.segments, container.container_source()?)
            }
            None => self.vfs.fs().open(&self.host_path()),
        }
    }

    /// Read this file completely
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self.boundary() {
            Some((container, provider)) => {
                provider.read_bytes(container, &self.segments, container.container_source()?)
            }
            None => self.vfs.fs().read(&self.host_path()),
        }
    }

    /// First `len` bytes of this file
    pub fn read_head(&self, len: usize) -> Result<Vec<u8>> {
        match self.boundary() {
            Some(_) => {
                let mut stream = self.open_stream()?;
                Ok(magic::read_head(&mut stream, len)?)
            }
            None => self.vfs.fs().read_head(&self.host_path(), len),
        }
    }

    /// Format tags whose signatures match this file's head bytes
    pub fn identify(&self) -> Result<Vec<String>> {
        let classifier = Classifier::shared();
        let head = self.read_head(classifier.max_span())?;
        Ok(classifier.identify(&head).into_iter().map(str::to_string).collect())
    }

    /// Could [`list_files`](Self::list_files) succeed here?
    pub fn may_list_files(&self) -> Result<bool> {
        if self.is_container() {
            return Ok(true);
        }
        self.is_directory()
    }

    /// Children of a directory or container
    ///
    /// A container lists its root entries. Inside containers non-recursive
    /// listing returns direct children only; recursive listing returns every
    /// descendant including implied directories.
    pub fn list_files(&self, recursive: bool) -> Result<Vec<VirtualFile>> {
        self.list_files_filtered(recursive, |_| true)
    }

    /// [`list_files`](Self::list_files) restricted to nodes passing `filter`
    pub fn list_files_filtered<F>(&self, recursive: bool, filter: F) -> Result<Vec<VirtualFile>>
    where
        F: Fn(&VirtualFile) -> bool,
    {
        let children = if let Some(format) = &self.format {
            let container = Arc::new(self.clone());
            let entries = format.list_entries(&container, &[], recursive, self.container_source()?)?;
            self.vfs.entries_to_files(&container, format, entries)
        } else if let Some((container, provider)) = self.boundary() {
            let entries = provider.list_entries(
                container,
                &self.segments,
                recursive,
                container.container_source()?,
            )?;
            self.vfs.entries_to_files(container, provider, entries)
        } else {
            self.list_host(recursive)?
        };

        Ok(children.into_iter().filter(|f| filter(f)).collect())
    }

    fn list_host(&self, recursive: bool) -> Result<Vec<VirtualFile>> {
        let names = self.vfs.fs().list_dir(&self.host_path())?;
        let mut files = Vec::with_capacity(names.len());

        for name in names {
            let child = self.child(&[name])?;
            let descend = recursive && !child.is_container() && child.is_directory()?;
            let nested = if descend { child.list_host(true)? } else { Vec::new() };
            files.push(child);
            files.extend(nested);
        }

        Ok(files)
    }

    /// Node for a path below this one
    pub fn child<S: AsRef<str>>(&self, segments: &[S]) -> Result<VirtualFile> {
        let atoms = self.vfs.split(segments, false)?;
        if let Some(format) = &self.format {
            self.vfs.walk(
                Some(Arc::new(self.clone())),
                Some(Arc::clone(format)),
                Vec::new(),
                atoms,
            )
        } else {
            self.vfs.walk(
                self.parent.clone(),
                self.provider.clone(),
                self.segments.clone(),
                atoms,
            )
        }
    }

    /// Whether this node could be written
    pub fn can_write(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => Ok(provider.can_write(container, &self.segments)),
            None => self.vfs.fs().can_write(&self.host_path()),
        }
    }

    /// Open a writable stream
    pub fn create_output_stream(&self, append: bool) -> Result<ByteSink> {
        match self.boundary() {
            Some((container, provider)) => {
                provider.create_output_stream(container, &self.segments, append)
            }
            None => self.vfs.fs().create_output_stream(&self.host_path(), append),
        }
    }

    /// Replace this file's bytes
    pub fn write_bytes(&self, data: &[u8]) -> Result<()> {
        match self.boundary() {
            Some((container, provider)) => provider.write_bytes(container, &self.segments, data),
            None => self.vfs.fs().write_bytes(&self.host_path(), data),
        }
    }

    /// Create an empty file
    pub fn create_new_file(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => provider.create_new_file(container, &self.segments),
            None => self.vfs.fs().create_new_file(&self.host_path()),
        }
    }

    /// Delete this file or empty directory
    pub fn delete(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => provider.delete(container, &self.segments),
            None => self.vfs.fs().delete(&self.host_path()),
        }
    }

    /// Create this directory
    pub fn mkdir(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => provider.mkdir(container, &self.segments),
            None => self.vfs.fs().mkdir(&self.host_path()),
        }
    }

    /// Create this directory and its missing parents
    pub fn mkdirs(&self) -> Result<bool> {
        match self.boundary() {
            Some((container, provider)) => provider.mkdirs(container, &self.segments),
            None => self.vfs.fs().mkdirs(&self.host_path()),
        }
    }

    /// Provider ids of every boundary on the chain, outermost first, followed
    /// by this node's own container provider
    fn boundary_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current {
            if let Some(provider) = &node.provider {
                ids.push(provider.identify());
            }
            current = node.parent.as_deref();
        }
        ids.reverse();
        if let Some(format) = &self.format {
            ids.push(format.identify());
        }
        ids
    }

    pub(crate) fn ensure_depth(&self) -> Result<()> {
        crate::security::validate_depth(self.depth(), self.vfs.config().max_depth)
    }
}

impl PartialEq for VirtualFile {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path() && self.boundary_ids() == other.boundary_ids()
    }
}

impl Eq for VirtualFile {}

impl Hash for VirtualFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path().hash(state);
        self.boundary_ids().hash(state);
    }
}

impl fmt::Display for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl fmt::Debug for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFile")
            .field("path", &self.path())
            .field("depth", &self.depth())
            .field("provider", &self.provider.as_ref().map(|p| p.identify()))
            .field("container", &self.format.as_ref().map(|p| p.identify()))
            .finish()
    }
}
