//! Content classifier - binary signature ("magic number") matching
//!
//! A signature is a byte pattern at a fixed offset. Signatures are grouped
//! per format tag; inserting a signature that is byte-identical (same bytes,
//! same offset) to one already present merges their extension sets instead
//! of duplicating the entry.

use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::io::{self, Read};
use std::sync::OnceLock;

/// Format tag for zip archives
pub const ZIP: &str = "zip";
/// Format tag for Java archives
pub const JAR: &str = "jar";
/// Format tag for tape archives
pub const TAR: &str = "tar";
/// Format tag for PNG images
pub const PNG: &str = "png";

/// A byte pattern at a fixed offset
#[derive(Debug, Clone)]
pub struct Signature {
    bytes: Vec<u8>,
    offset: u64,
    extensions: BTreeSet<String>,
}

impl Signature {
    /// Create a signature from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>, offset: u64) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::invalid_signature("Signature may not be empty"));
        }
        Ok(Self {
            bytes,
            offset,
            extensions: BTreeSet::new(),
        })
    }

    /// Create a signature from a hex string such as `"50 4B 03 04"`
    ///
    /// Whitespace is ignored.
    pub fn from_hex(hex_str: &str, offset: u64) -> Result<Self> {
        let compact: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&compact)
            .map_err(|e| Error::invalid_signature(format!("{:?}: {}", hex_str, e)))?;
        Self::new(bytes, offset)
    }

    /// Create a signature from ASCII text such as `"ustar"`
    pub fn from_text(text: &str, offset: u64) -> Result<Self> {
        Self::new(text.as_bytes().to_vec(), offset)
    }

    /// Associate file extensions with this signature (stored upper case)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions
            .extend(extensions.into_iter().map(|e| e.as_ref().to_uppercase()));
        self
    }

    /// Pattern bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte offset of the pattern
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Pattern length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; signatures are never empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Known file extensions (upper case)
    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    /// Case-insensitive extension check
    pub fn has_extension(&self, extension: &str) -> bool {
        !extension.is_empty() && self.extensions.contains(&extension.to_uppercase())
    }

    /// Number of head bytes needed to evaluate this signature
    pub fn span(&self) -> usize {
        self.offset as usize + self.bytes.len()
    }

    /// Match against already-read head bytes
    pub fn matches(&self, head: &[u8]) -> bool {
        let start = self.offset as usize;
        head.get(start..start + self.bytes.len()) == Some(self.bytes.as_slice())
    }

    /// Skip `offset` bytes of `source`, read `len` bytes and compare
    ///
    /// A source too short to hold the pattern does not match.
    pub fn test<R: Read + ?Sized>(&self, source: &mut R) -> Result<bool> {
        let skipped = io::copy(&mut (&mut *source).take(self.offset), &mut io::sink())?;
        if skipped != self.offset {
            return Ok(false);
        }
        let head = read_head(source, self.bytes.len())?;
        Ok(head == self.bytes)
    }

    fn merge_extensions(&mut self, other: &Signature) {
        self.extensions.extend(other.extensions.iter().cloned());
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.bytes == other.bytes
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.offset.hash(state);
        self.bytes.hash(state);
    }
}

/// A merging set of signatures
#[derive(Debug, Clone, Default)]
pub struct SignatureSet {
    entries: Vec<Signature>,
}

impl SignatureSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a signature, merging extensions into an identical one
    ///
    /// Returns true if the signature was new.
    pub fn insert(&mut self, signature: Signature) -> bool {
        match self.entries.iter_mut().find(|s| **s == signature) {
            Some(existing) => {
                existing.merge_extensions(&signature);
                false
            }
            None => {
                self.entries.push(signature);
                true
            }
        }
    }

    /// Insert every signature of another set
    pub fn merge(&mut self, other: &SignatureSet) {
        for signature in &other.entries {
            self.insert(signature.clone());
        }
    }

    /// Iterate the signatures in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.entries.iter()
    }

    /// Number of distinct signatures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the set holds no signature
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry identical to `signature`
    pub fn get(&self, signature: &Signature) -> Option<&Signature> {
        self.entries.iter().find(|s| *s == signature)
    }

    /// True if any signature matches the head bytes
    pub fn matches(&self, head: &[u8]) -> bool {
        self.entries.iter().any(|s| s.matches(head))
    }

    /// Read enough of `source` and test every signature against it
    pub fn test<R: Read + ?Sized>(&self, source: &mut R) -> Result<bool> {
        let head = read_head(source, self.max_span())?;
        Ok(self.matches(&head))
    }

    /// Head length needed to evaluate every signature
    pub fn max_span(&self) -> usize {
        self.entries.iter().map(Signature::span).max().unwrap_or(0)
    }

    /// Union of all extensions in the set
    pub fn extensions(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|s| s.extensions.iter().cloned())
            .collect()
    }
}

/// Registry of signature sets keyed by format tag
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    formats: BTreeMap<String, SignatureSet>,
}

impl Classifier {
    /// Create an empty classifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with the built-in archive and image signatures
    pub fn builtin() -> Self {
        let mut classifier = Self::new();

        // Java archives
        classifier.register_hex(JAR, "50 4B 03 04", 0, &["JAR"]);
        classifier.register_hex(JAR, "5F 27 A8 89", 0, &["JAR"]);
        classifier.register_hex(JAR, "4A 41 52 43 53 00", 0, &["JAR"]);
        classifier.register_hex(JAR, "50 4B 03 04 14 00 08 00", 0, &["JAR"]);

        // Images
        classifier.register_hex(PNG, "89 50 4E 47 0D 0A 1A 0A", 0, &["PNG"]);

        // Tape archives and their compressed forms
        classifier.register_text(TAR, "ustar", 257, &["TAR"]);
        classifier.register_text(TAR, "BZh", 0, &["TAR"]);
        classifier.register_hex(TAR, "1F 9D 90", 0, &["TAR"]);
        classifier.register_hex(TAR, "1F A0", 0, &["TAR"]);

        // Zip family
        classifier.register_hex(ZIP, "50 4B 03 04", 0, &["ZIP"]);
        classifier.register_hex(ZIP, "50 4B 4C 49 54 45", 0, &["ZIP"]);
        classifier.register_hex(ZIP, "50 4B 53 70 58", 0, &["ZIP"]);
        classifier.register_hex(ZIP, "50 4B 05 06", 0, &["ZIP"]);
        classifier.register_hex(ZIP, "50 4B 07 08", 0, &["ZIP"]);
        classifier.register_hex(ZIP, "57 69 6E 5A 69 70", 0, &["ZIP"]);
        classifier.register_hex(ZIP, "50 4B 03 04 14 00 01 00", 0, &["ZIP"]);

        classifier
    }

    /// Process-wide built-in classifier
    pub fn shared() -> &'static Classifier {
        static SHARED: OnceLock<Classifier> = OnceLock::new();
        SHARED.get_or_init(Classifier::builtin)
    }

    fn register_hex(&mut self, tag: &str, hex_str: &str, offset: u64, extensions: &[&str]) {
        // Built-in patterns are valid literals
        if let Ok(signature) = Signature::from_hex(hex_str, offset) {
            self.register(tag, signature.with_extensions(extensions));
        }
    }

    fn register_text(&mut self, tag: &str, text: &str, offset: u64, extensions: &[&str]) {
        if let Ok(signature) = Signature::from_text(text, offset) {
            self.register(tag, signature.with_extensions(extensions));
        }
    }

    /// Add a signature to a format's set
    ///
    /// Returns true if the signature was new for that format.
    pub fn register(&mut self, tag: &str, signature: Signature) -> bool {
        self.formats
            .entry(tag.to_lowercase())
            .or_default()
            .insert(signature)
    }

    /// Signature set of a format
    pub fn set(&self, tag: &str) -> Option<&SignatureSet> {
        self.formats.get(&tag.to_lowercase())
    }

    /// Registered format tags
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    /// All signatures of every format, byte-identical ones merged
    pub fn all(&self) -> SignatureSet {
        let mut all = SignatureSet::new();
        for set in self.formats.values() {
            all.merge(set);
        }
        all
    }

    /// True if the head bytes match a signature of `tag`
    pub fn matches(&self, tag: &str, head: &[u8]) -> bool {
        self.set(tag).map_or(false, |set| set.matches(head))
    }

    /// Format tags whose signatures match the head bytes
    pub fn identify(&self, head: &[u8]) -> Vec<&str> {
        self.formats
            .iter()
            .filter(|(_, set)| set.matches(head))
            .map(|(tag, _)| tag.as_str())
            .collect()
    }

    /// Read enough of `source` and test it against the signatures of `tag`
    pub fn test<R: Read + ?Sized>(&self, tag: &str, source: &mut R) -> Result<bool> {
        match self.set(tag) {
            Some(set) => set.test(source),
            None => Ok(false),
        }
    }

    /// Head length needed to evaluate every registered signature
    pub fn max_span(&self) -> usize {
        self.formats
            .values()
            .map(SignatureSet::max_span)
            .max()
            .unwrap_or(0)
    }
}

/// Read up to `len` bytes; a shorter result means the source ended early
pub fn read_head<R: Read + ?Sized>(source: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(len);
    (&mut *source).take(len as u64).read_to_end(&mut head)?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_hex_ignores_spaces() {
        let sig = Signature::from_hex("50 4b 03 04", 0).unwrap();
        assert_eq!(sig.bytes(), &[0x50, 0x4B, 0x03, 0x04]);
        assert_eq!(sig.span(), 4);
    }

    #[test]
    fn test_invalid_signatures() {
        assert!(Signature::from_hex("5G", 0).is_err());
        assert!(Signature::from_hex("", 0).is_err());
        assert!(Signature::new(Vec::new(), 3).is_err());
    }

    #[test]
    fn test_matches_at_offset() {
        let sig = Signature::from_text("ustar", 257).unwrap();
        let mut head = vec![0u8; 300];
        head[257..262].copy_from_slice(b"ustar");
        assert!(sig.matches(&head));
        assert!(!sig.matches(&head[..260]));
    }

    #[test]
    fn test_stream_test_skips_offset() {
        let sig = Signature::from_hex("AA BB", 2).unwrap();
        assert!(sig.test(&mut Cursor::new(vec![0, 0, 0xAA, 0xBB, 1])).unwrap());
        assert!(!sig.test(&mut Cursor::new(vec![0xAA, 0xBB])).unwrap());
        assert!(!sig.test(&mut Cursor::new(vec![0, 0, 0xAA])).unwrap());
    }

    #[test]
    fn test_merging_unions_extensions() {
        let mut set = SignatureSet::new();
        assert!(set.insert(Signature::from_hex("50 4B 03 04", 0).unwrap().with_extensions(["zip"])));
        assert!(!set.insert(Signature::from_hex("50 4B 03 04", 0).unwrap().with_extensions(["jar"])));
        assert_eq!(set.len(), 1);

        let merged = set.iter().next().unwrap();
        assert!(merged.has_extension("zip"));
        assert!(merged.has_extension("JAR"));
    }

    #[test]
    fn test_different_offset_is_distinct() {
        let mut set = SignatureSet::new();
        set.insert(Signature::from_hex("50 4B", 0).unwrap());
        set.insert(Signature::from_hex("50 4B", 1).unwrap());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_all_merges_across_formats() {
        let classifier = Classifier::builtin();
        let all = classifier.all();
        let pk = Signature::from_hex("50 4B 03 04", 0).unwrap();
        let merged = all.get(&pk).unwrap();
        assert!(merged.has_extension("zip"));
        assert!(merged.has_extension("jar"));

        let zip_only = classifier.set(ZIP).unwrap().get(&pk).unwrap();
        assert!(!zip_only.has_extension("jar"));
    }

    #[test]
    fn test_identify_zip_header() {
        let classifier = Classifier::builtin();
        let tags = classifier.identify(&[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00]);
        assert_eq!(tags, vec![JAR, ZIP]);
        assert!(classifier.identify(b"plain text").is_empty());
    }

    #[test]
    fn test_identify_png_and_tar() {
        let classifier = Classifier::builtin();
        assert_eq!(classifier.identify(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]), vec![PNG]);

        let mut head = vec![0u8; classifier.max_span()];
        head[257..262].copy_from_slice(b"ustar");
        assert_eq!(classifier.identify(&head), vec![TAR]);
    }

    #[test]
    fn test_classifier_test_reads_source() {
        let classifier = Classifier::shared();
        assert!(classifier.test(ZIP, &mut Cursor::new(b"PK\x05\x06rest".to_vec())).unwrap());
        assert!(!classifier.test(ZIP, &mut Cursor::new(b"PK".to_vec())).unwrap());
        assert!(!classifier.test("unknown", &mut Cursor::new(b"PK\x03\x04".to_vec())).unwrap());
    }

    #[test]
    fn test_max_span_covers_tar() {
        assert_eq!(Classifier::builtin().max_span(), 262);
    }
}
