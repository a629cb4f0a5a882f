//! Java archive provider
//!
//! A jar is a zip archive. [`JarProvider`] reads it exactly like
//! [`ZipProvider`] but outranks it for `.jar` candidates, so jar nodes carry
//! their own identity and expose the manifest.

use crate::archive::ZipProvider;
use crate::manifest::{read_manifest, Manifest};
use nestfile_core::magic::{self, Classifier};
use nestfile_core::{
    BoundaryProbe, ByteSource, ContainerEntry, ContainerProvider, Result, SignatureSet,
    VirtualFile,
};

/// Extensions a jar candidate must carry
pub const JAR_EXTENSIONS: &[&str] = &["jar"];

#[derive(Debug, Clone)]
pub struct JarProvider {
    zip: ZipProvider,
    signatures: SignatureSet,
}

impl Default for JarProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl JarProvider {
    pub const IDENTIFY: &'static str = "jar";

    /// One above the zip family so `.jar` candidates land here
    pub const PRIORITY: i32 = ZipProvider::PRIORITY + 1;

    pub fn new() -> Self {
        let signatures = Classifier::shared()
            .set(magic::JAR)
            .cloned()
            .unwrap_or_default();
        Self {
            zip: ZipProvider::new(),
            signatures,
        }
    }

    /// Parsed `META-INF/MANIFEST.MF` of `jar`, if it has one
    pub fn manifest(&self, jar: &VirtualFile) -> Result<Option<Manifest>> {
        read_manifest(jar)
    }
}

impl ContainerProvider for JarProvider {
    fn identify(&self) -> &str {
        Self::IDENTIFY
    }

    fn claims(&self, probe: &BoundaryProbe<'_>) -> bool {
        if probe.existence.is_directory() || !probe.has_extension(JAR_EXTENSIONS) {
            return false;
        }
        match probe.head {
            Some(head) if probe.existence.exists() => self.signatures.matches(head),
            _ => true,
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
        self.zip.list_entries(container, entry, recursive, source)
    }

    fn exists(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool> {
        self.zip.exists(container, entry, source)
    }

    fn is_file(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool> {
        self.zip.is_file(container, entry, source)
    }

    fn is_directory(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<bool> {
        self.zip.is_directory(container, entry, source)
    }

    fn open_stream(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<ByteSource> {
        self.zip.open_stream(container, entry, source)
    }

    fn read_bytes(&self, container: &VirtualFile, entry: &[String], source: Option<ByteSource>) -> Result<Vec<u8>> {
        self.zip.read_bytes(container, entry, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::vfs_with_defaults;
    use crate::testutil::{build_zip, write_zip, Member};
    use nestfile_core::{ProviderRegistry, Vfs, VfsConfig};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    const MANIFEST: &[u8] = b"Manifest-Version: 1.0\r\nMain-Class: demo.Main\r\n\r\n";

    fn vfs() -> Vfs {
        vfs_with_defaults(VfsConfig::default().with_separator('/'))
    }

    fn at(dir: &Path, rest: &str) -> String {
        format!("{}/{}", dir.display(), rest)
    }

    fn jar_members() -> Vec<Member<'static>> {
        vec![
            Member::dir("META-INF"),
            Member::deflated("META-INF/MANIFEST.MF", MANIFEST),
            Member::deflated("demo/Main.class", b"\xca\xfe\xba\xbe"),
        ]
    }

    fn identify_of(file: &VirtualFile) -> Option<String> {
        file.container_provider().map(|p| p.identify().to_string())
    }

    #[test]
    fn test_jar_outranks_zip_by_name() {
        let dir = tempdir().unwrap();
        write_zip(dir.path(), "lib.jar", &jar_members());
        write_zip(dir.path(), "lib.zip", &jar_members());
        let vfs = vfs();

        let jar = vfs.resolve_path(&at(dir.path(), "lib.jar")).unwrap();
        assert_eq!(identify_of(&jar).as_deref(), Some(JarProvider::IDENTIFY));

        let zip = vfs.resolve_path(&at(dir.path(), "lib.zip")).unwrap();
        assert_eq!(identify_of(&zip).as_deref(), Some(ZipProvider::IDENTIFY));

        let class = vfs.resolve_path(&at(dir.path(), "lib.jar/demo/Main.class")).unwrap();
        assert_eq!(class.provider().unwrap().identify(), JarProvider::IDENTIFY);
        assert_eq!(class.read_bytes().unwrap(), b"\xca\xfe\xba\xbe");
    }

    #[test]
    fn test_equality_tracks_boundary_providers() {
        let dir = tempdir().unwrap();
        write_zip(dir.path(), "lib.jar", &jar_members());
        let path = at(dir.path(), "lib.jar/demo/Main.class");

        let zip_only = Vfs::new(
            ProviderRegistry::new().with(Arc::new(ZipProvider::new())),
            VfsConfig::default().with_separator('/'),
        );
        let via_zip = zip_only.resolve_path(&path).unwrap();
        let via_jar = vfs().resolve_path(&path).unwrap();

        assert_eq!(via_zip.path(), via_jar.path());
        assert_ne!(via_zip, via_jar);
        assert_eq!(via_zip.read_bytes().unwrap(), via_jar.read_bytes().unwrap());
    }

    #[test]
    fn test_text_named_jar_is_not_claimed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.jar"), b"just some notes").unwrap();

        let notes = vfs().resolve_path(&at(dir.path(), "notes.jar")).unwrap();
        assert!(!notes.is_container());
        assert_eq!(notes.read_bytes().unwrap(), b"just some notes");
    }

    #[test]
    fn test_empty_jar_falls_back_to_zip() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.jar"), build_zip(&[])).unwrap();

        let empty = vfs().resolve_path(&at(dir.path(), "empty.jar")).unwrap();
        assert_eq!(identify_of(&empty).as_deref(), Some(ZipProvider::IDENTIFY));
    }

    #[test]
    fn test_manifest_direct_and_nested() {
        let dir = tempdir().unwrap();
        let jar_bytes = build_zip(&jar_members());
        fs::write(dir.path().join("app.jar"), &jar_bytes).unwrap();
        write_zip(dir.path(), "dist.zip", &[Member::stored("lib/app.jar", &jar_bytes)]);
        let vfs = vfs();
        let provider = JarProvider::new();

        for path in ["app.jar", "dist.zip/lib/app.jar"] {
            let jar = vfs.resolve_path(&at(dir.path(), path)).unwrap();
            assert_eq!(identify_of(&jar).as_deref(), Some(JarProvider::IDENTIFY), "{}", path);

            let manifest = provider.manifest(&jar).unwrap().unwrap();
            assert_eq!(manifest.main_class(), Some("demo.Main"), "{}", path);
        }
    }

    #[test]
    fn test_manifest_absent_or_not_a_jar() {
        let dir = tempdir().unwrap();
        write_zip(dir.path(), "bare.jar", &[Member::stored("x.txt", b"x")]);
        fs::write(dir.path().join("plain.txt"), b"plain").unwrap();
        let vfs = vfs();
        let provider = JarProvider::new();

        let bare = vfs.resolve_path(&at(dir.path(), "bare.jar")).unwrap();
        assert_eq!(provider.manifest(&bare).unwrap(), None);

        let plain = vfs.resolve_path(&at(dir.path(), "plain.txt")).unwrap();
        assert!(provider.manifest(&plain).unwrap_err().is_wrong_kind());

        let missing = vfs.resolve_path(&at(dir.path(), "missing.jar")).unwrap();
        assert_eq!(identify_of(&missing).as_deref(), Some(JarProvider::IDENTIFY));
        assert!(provider.manifest(&missing).unwrap_err().is_not_existing());
    }
}
