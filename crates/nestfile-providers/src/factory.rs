//! Provider factory
//!
//! Builds the default provider registry and offers one-shot format detection
//! for host files.

use crate::archive::ZipProvider;
use crate::jar::JarProvider;
use nestfile_core::{BoundaryProbe, Existence, EntryKind, ProviderRegistry, Result, Vfs, VfsConfig};
use std::path::Path;
use std::sync::Arc;

/// Container format of a host file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// PKZIP archive
    Zip,
    /// Java archive
    Jar,
    /// Not a container
    Unknown,
}

impl ContainerFormat {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Zip => "ZIP Archive",
            ContainerFormat::Jar => "Java Archive",
            ContainerFormat::Unknown => "Unknown",
        }
    }

    fn from_identify(identify: &str) -> Self {
        match identify {
            ZipProvider::IDENTIFY => ContainerFormat::Zip,
            JarProvider::IDENTIFY => ContainerFormat::Jar,
            _ => ContainerFormat::Unknown,
        }
    }
}

/// Registry holding every built-in provider
pub fn default_registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with(Arc::new(ZipProvider::new()))
        .with(Arc::new(JarProvider::new()))
}

/// File system family over the host with the built-in providers
pub fn vfs_with_defaults(config: VfsConfig) -> Vfs {
    Vfs::new(default_registry(), config)
}

/// Detect the container format of a host file
///
/// Uses the same rule as path resolution: signatures when the head can be
/// read, the file extension otherwise.
pub fn detect_format(path: &Path) -> Result<ContainerFormat> {
    let registry = default_registry();

    let (existence, head) = match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(ContainerFormat::Unknown),
        Ok(_) => {
            let mut file = std::fs::File::open(path)?;
            let head = nestfile_core::magic::read_head(&mut file, registry.signature_span())?;
            (Existence::Exists(EntryKind::File), Some(head))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Existence::Missing, None),
        Err(e) => return Err(e.into()),
    };

    let display = path.display().to_string();
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let probe = BoundaryProbe {
        parent: None,
        name,
        path: &display,
        existence,
        head: head.as_deref(),
    };

    Ok(registry
        .resolve(&probe)
        .map(|provider| ContainerFormat::from_identify(provider.identify()))
        .unwrap_or(ContainerFormat::Unknown))
}

/// Supported container formats and their extensions
pub fn supported_formats() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        (ContainerFormat::Zip.name(), crate::archive::ZIP_EXTENSIONS),
        (ContainerFormat::Jar.name(), crate::jar::JAR_EXTENSIONS),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_zip, Member};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_zip_by_magic() {
        let mut temp = NamedTempFile::with_suffix(".dat").unwrap();
        temp.write_all(&build_zip(&[Member::stored("a.txt", b"a")])).unwrap();
        temp.flush().unwrap();

        assert_eq!(detect_format(temp.path()).unwrap(), ContainerFormat::Zip);
    }

    #[test]
    fn test_detect_jar_by_magic_and_extension() {
        let mut temp = NamedTempFile::with_suffix(".jar").unwrap();
        temp.write_all(&build_zip(&[Member::stored("a.txt", b"a")])).unwrap();
        temp.flush().unwrap();

        assert_eq!(detect_format(temp.path()).unwrap(), ContainerFormat::Jar);
    }

    #[test]
    fn test_content_overrides_extension() {
        let mut temp = NamedTempFile::with_suffix(".zip").unwrap();
        temp.write_all(b"not really").unwrap();
        temp.flush().unwrap();

        assert_eq!(detect_format(temp.path()).unwrap(), ContainerFormat::Unknown);
    }

    #[test]
    fn test_missing_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_format(&dir.path().join("x.jar")).unwrap(), ContainerFormat::Jar);
        assert_eq!(detect_format(&dir.path().join("x.zip")).unwrap(), ContainerFormat::Zip);
        assert_eq!(detect_format(&dir.path().join("x.txt")).unwrap(), ContainerFormat::Unknown);
        assert_eq!(detect_format(dir.path()).unwrap(), ContainerFormat::Unknown);
    }

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry();
        let ids: Vec<&str> = registry.providers().iter().map(|p| p.identify()).collect();
        assert_eq!(ids, vec![ZipProvider::IDENTIFY, JarProvider::IDENTIFY]);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(ContainerFormat::Zip.name(), "ZIP Archive");
        assert_eq!(ContainerFormat::Jar.name(), "Java Archive");
        assert_eq!(supported_formats().len(), 2);
    }
}
