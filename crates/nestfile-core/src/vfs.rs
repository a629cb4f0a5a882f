//! Path resolution
//!
//! A [`Vfs`] ties together the provider registry, the physical filesystem
//! adapter and the configuration shared by every node it resolves. Resolution
//! walks the input segments left to right, asking the registry at every
//! prefix whether a provider claims it as a container boundary.

use crate::config::VfsConfig;
use crate::error::Result;
use crate::file::VirtualFile;
use crate::host::{HostFs, PhysicalFs};
use crate::registry::ProviderRegistry;
use crate::security::{validate_depth, validate_segment};
use crate::traits::ContainerProvider;
use crate::types::{BoundaryProbe, ContainerEntry, EntryKind, Existence};
use std::fmt;
use std::sync::Arc;

struct VfsInner {
    registry: ProviderRegistry,
    fs: Arc<dyn PhysicalFs>,
    config: VfsConfig,
}

/// Shared context for a family of virtual files
#[derive(Clone)]
pub struct Vfs {
    inner: Arc<VfsInner>,
}

impl fmt::Debug for Vfs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vfs")
            .field("providers", &self.inner.registry.len())
            .field("fs", &self.inner.fs)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Vfs {
    /// Create a family on the host filesystem
    pub fn new(registry: ProviderRegistry, config: VfsConfig) -> Self {
        Self::with_fs(registry, Arc::new(HostFs), config)
    }

    /// Create a family on a custom physical filesystem
    pub fn with_fs(registry: ProviderRegistry, fs: Arc<dyn PhysicalFs>, config: VfsConfig) -> Self {
        Self {
            inner: Arc::new(VfsInner { registry, fs, config }),
        }
    }

    /// Registered providers
    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// Physical filesystem adapter
    pub fn fs(&self) -> &dyn PhysicalFs {
        self.inner.fs.as_ref()
    }

    /// Configuration
    pub fn config(&self) -> &VfsConfig {
        &self.inner.config
    }

    /// Resolve a sequence of path segments into a node
    ///
    /// Each input segment is split further on the configured separator. A
    /// leading separator on the first segment marks an absolute path; other
    /// empty atoms are ignored.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<VirtualFile> {
        let atoms = self.split(segments, true)?;
        self.walk(None, None, Vec::new(), atoms)
    }

    /// Resolve a single path string
    pub fn resolve_path(&self, path: &str) -> Result<VirtualFile> {
        self.resolve(&[path])
    }

    pub(crate) fn split<S: AsRef<str>>(&self, segments: &[S], rooted: bool) -> Result<Vec<String>> {
        let separator = self.config().separator;
        let mut atoms = Vec::new();

        for (i, raw) in segments.iter().enumerate() {
            let raw = raw.as_ref();
            for (j, part) in raw.split(separator).enumerate() {
                if part.is_empty() {
                    if rooted && i == 0 && j == 0 && !raw.is_empty() {
                        atoms.push(String::new());
                    }
                    continue;
                }
                validate_segment(part)?;
                atoms.push(part.to_string());
            }
        }

        Ok(atoms)
    }

    /// Walk `atoms` starting below `parent`, with `prefix` holding segments
    /// already accumulated (and already known not to be boundaries)
    pub(crate) fn walk(
        &self,
        mut parent: Option<Arc<VirtualFile>>,
        mut provider: Option<Arc<dyn ContainerProvider>>,
        prefix: Vec<String>,
        atoms: Vec<String>,
    ) -> Result<VirtualFile> {
        let mut acc = prefix;

        for atom in atoms {
            acc.push(atom);
            let candidate =
                VirtualFile::node(self.clone(), acc.clone(), parent.clone(), provider.clone(), None);

            let Some(claimed) = self.detect(&candidate, None)? else {
                continue;
            };

            let container = candidate.with_format(Arc::clone(&claimed));
            validate_depth(container.depth() + 1, self.config().max_depth)?;
            tracing::debug!(
                container = container.path(),
                provider = claimed.identify(),
                depth = container.depth(),
                "Entered container"
            );

            parent = Some(Arc::new(container));
            provider = Some(claimed);
            acc = Vec::new();
        }

        if acc.is_empty() {
            if let Some(container) = parent {
                return Ok(Arc::try_unwrap(container).unwrap_or_else(|shared| (*shared).clone()));
            }
        }

        let node = VirtualFile::node(self.clone(), acc, parent, provider, None);
        node.ensure_depth()?;
        Ok(node)
    }

    /// Nodes for the entries a provider listed below `container`
    pub(crate) fn entries_to_files(
        &self,
        container: &Arc<VirtualFile>,
        provider: &Arc<dyn ContainerProvider>,
        entries: Vec<ContainerEntry>,
    ) -> Vec<VirtualFile> {
        let mut files = Vec::with_capacity(entries.len());

        for entry in entries {
            let node = VirtualFile::node(
                self.clone(),
                entry.segments,
                Some(Arc::clone(container)),
                Some(Arc::clone(provider)),
                None,
            );

            if entry.kind == EntryKind::Directory {
                files.push(node);
                continue;
            }

            let claimed = match self.detect(&node, Some(EntryKind::File)) {
                Ok(claimed) => claimed,
                Err(e) => {
                    tracing::warn!(entry = node.path(), error = %e, "Boundary detection failed");
                    None
                }
            };

            match claimed {
                Some(claimed) if node.depth() + 1 <= self.config().max_depth => {
                    files.push(node.with_format(claimed));
                }
                Some(claimed) => {
                    tracing::warn!(
                        entry = node.path(),
                        provider = claimed.identify(),
                        limit = self.config().max_depth,
                        "Container nested too deep, listed as plain file"
                    );
                    files.push(node);
                }
                None => files.push(node),
            }
        }

        files
    }

    /// Ask the registry whether a provider claims `candidate`
    ///
    /// `known` carries a kind already established by the caller (a listing
    /// entry), which spares the existence lookup.
    fn detect(
        &self,
        candidate: &VirtualFile,
        known: Option<EntryKind>,
    ) -> Result<Option<Arc<dyn ContainerProvider>>> {
        let name = candidate.name();
        if name.is_empty() || self.registry().is_empty() {
            return Ok(None);
        }

        let (existence, head) = self.facts(candidate, known);
        if existence.is_directory() {
            return Ok(None);
        }

        let probe = BoundaryProbe {
            parent: candidate.parent().map(|p| p.as_ref()),
            name,
            path: candidate.path(),
            existence,
            head: head.as_deref(),
        };

        Ok(self.registry().resolve(&probe))
    }

    /// Existence and head bytes for a candidate
    ///
    /// Root-level candidates ask the physical filesystem. Nested candidates
    /// are examined through their container chain unless content probing is
    /// switched off, in which case only a kind known from a listing is used.
    fn facts(&self, candidate: &VirtualFile, known: Option<EntryKind>) -> (Existence, Option<Vec<u8>>) {
        let span = self.registry().signature_span();

        if candidate.parent().is_none() {
            let Some(path) = candidate.physical_path() else {
                return (Existence::Unknown, None);
            };
            return match self.fs().metadata(&path) {
                Ok(None) => (Existence::Missing, None),
                Ok(Some(EntryKind::Directory)) => (Existence::Exists(EntryKind::Directory), None),
                Ok(Some(EntryKind::File)) => {
                    let head = if span > 0 {
                        match self.fs().read_head(&path, span) {
                            Ok(head) => Some(head),
                            Err(e) => {
                                tracing::warn!(path = %path.display(), error = %e, "Could not read head bytes");
                                None
                            }
                        }
                    } else {
                        None
                    };
                    (Existence::Exists(EntryKind::File), head)
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Metadata lookup failed");
                    (Existence::Missing, None)
                }
            };
        }

        if !self.config().probe_nested_content {
            return (known.map_or(Existence::Unknown, Existence::Exists), None);
        }

        let kind = match known {
            Some(kind) => Some(kind),
            None => match nested_kind(candidate) {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::debug!(candidate = candidate.path(), error = %e, "Nested probe failed");
                    return (Existence::Unknown, None);
                }
            },
        };

        match kind {
            None => (Existence::Missing, None),
            Some(EntryKind::Directory) => (Existence::Exists(EntryKind::Directory), None),
            Some(EntryKind::File) => {
                let head = if span > 0 {
                    match candidate.read_head(span) {
                        Ok(head) => Some(head),
                        Err(e) => {
                            tracing::debug!(candidate = candidate.path(), error = %e, "Nested head read failed");
                            None
                        }
                    }
                } else {
                    None
                };
                (Existence::Exists(EntryKind::File), head)
            }
        }
    }
}

fn nested_kind(candidate: &VirtualFile) -> Result<Option<EntryKind>> {
    if !candidate.exists()? {
        return Ok(None);
    }
    if candidate.is_directory()? {
        Ok(Some(EntryKind::Directory))
    } else {
        Ok(Some(EntryKind::File))
    }
}
