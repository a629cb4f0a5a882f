//! JAR manifest parsing
//!
//! `META-INF/MANIFEST.MF` is a sequence of `Name: value` lines. Lines longer
//! than 72 bytes continue on the next line, which starts with a single space.
//! A blank line ends a section; the first section holds the main attributes
//! and every later one is keyed by its `Name` attribute.

use nestfile_core::{Error, Result, VirtualFile};
use serde::Serialize;
use std::collections::BTreeMap;

/// Location of the manifest inside a jar
pub const MANIFEST_PATH: [&str; 2] = ["META-INF", "MANIFEST.MF"];

/// Attribute name to value
pub type Attributes = BTreeMap<String, String>;

/// A parsed manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    /// Attributes of the main section
    pub main: Attributes,
    /// Per-entry sections keyed by their `Name`
    pub sections: BTreeMap<String, Attributes>,
}

impl Manifest {
    /// Parse manifest bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::malformed_container(format!("manifest is not UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut manifest = Manifest::default();
        let mut in_main = true;

        for block in blocks(text)? {
            if in_main {
                manifest.main = block;
                in_main = false;
                continue;
            }

            let name = block.get("Name").cloned().ok_or_else(|| {
                Error::malformed_container("manifest section without a Name attribute")
            })?;
            manifest.sections.insert(name, block);
        }

        Ok(manifest)
    }

    /// Main attribute by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.main.get(name).map(String::as_str)
    }

    /// `Manifest-Version`
    pub fn version(&self) -> Option<&str> {
        self.get("Manifest-Version")
    }

    /// `Main-Class`
    pub fn main_class(&self) -> Option<&str> {
        self.get("Main-Class")
    }

    /// Attributes of the section for `name`
    pub fn section(&self, name: &str) -> Option<&Attributes> {
        self.sections.get(name)
    }
}

/// Split manifest text into attribute blocks, joining continuation lines
fn blocks(text: &str) -> Result<Vec<Attributes>> {
    let mut blocks = Vec::new();
    let mut logical: Vec<String> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if let Some(rest) = line.strip_prefix(' ') {
            let Some(last) = logical.last_mut() else {
                return Err(Error::malformed_container(format!(
                    "manifest line {} continues nothing",
                    number + 1
                )));
            };
            last.push_str(rest);
            continue;
        }

        if line.is_empty() {
            if !logical.is_empty() {
                blocks.push(attributes(&logical)?);
                logical.clear();
            }
            continue;
        }

        logical.push(line.to_string());
    }

    if !logical.is_empty() {
        blocks.push(attributes(&logical)?);
    }
    Ok(blocks)
}

fn attributes(lines: &[String]) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            Error::malformed_container(format!("manifest line without a colon: {}", line))
        })?;
        if name.is_empty() || name.contains(' ') {
            return Err(Error::malformed_container(format!(
                "invalid manifest attribute name: {:?}",
                name
            )));
        }
        let value = value.strip_prefix(' ').unwrap_or(value);
        attributes.insert(name.to_string(), value.to_string());
    }
    Ok(attributes)
}

/// Read and parse the manifest of a jar node
///
/// Returns `None` when the jar has no manifest. The node must be a container.
pub fn read_manifest(jar: &VirtualFile) -> Result<Option<Manifest>> {
    if !jar.is_container() {
        return Err(Error::wrong_kind(format!("{} is not a container", jar)));
    }
    if !jar.exists()? {
        return Err(Error::not_existing(jar.path().to_string()));
    }

    let entry = jar.child(&MANIFEST_PATH)?;
    match entry.read_bytes() {
        Ok(bytes) => {
            tracing::debug!(jar = jar.path(), size = bytes.len(), "Read manifest");
            Manifest::parse(&bytes).map(Some)
        }
        Err(e) if e.is_not_existing() => Ok(None),
        Err(e) => Err(e),
    }
}
