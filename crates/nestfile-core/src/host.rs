//! Physical filesystem adapter
//!
//! Nodes without a container ancestor operate on the host filesystem through
//! [`PhysicalFs`]. The default [`HostFs`] uses `std::fs`; tests plug in
//! in-memory fakes.

use crate::error::{Error, Result};
use crate::magic;
use crate::traits::{ByteSink, ByteSource};
use crate::types::EntryKind;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::path::Path;

/// Host filesystem operations used by root-level nodes
pub trait PhysicalFs: Send + Sync + fmt::Debug {
    /// Kind of the object at `path`, or `None` if nothing is there
    fn metadata(&self, path: &Path) -> Result<Option<EntryKind>>;

    /// First `len` bytes of a file (fewer if the file is shorter)
    fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>>;

    /// Open a file for reading
    fn open(&self, path: &Path) -> Result<ByteSource>;

    /// Read a file completely
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Names of the direct children of a directory
    fn list_dir(&self, path: &Path) -> Result<Vec<String>>;

    /// Whether the object at `path` could be written
    fn can_write(&self, path: &Path) -> Result<bool>;

    /// Open a file for writing, creating it when absent
    fn create_output_stream(&self, path: &Path, append: bool) -> Result<ByteSink>;

    /// Replace a file's bytes
    fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Create an empty file; false if something already exists there
    fn create_new_file(&self, path: &Path) -> Result<bool>;

    /// Delete a file or an empty directory; false if nothing was there
    fn delete(&self, path: &Path) -> Result<bool>;

    /// Create a directory; false if it already exists
    fn mkdir(&self, path: &Path) -> Result<bool>;

    /// Create a directory and its missing parents; false if it already exists
    fn mkdirs(&self, path: &Path) -> Result<bool>;
}

/// [`PhysicalFs`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl HostFs {
    fn require_file(&self, path: &Path) -> Result<()> {
        match self.metadata(path)? {
            Some(EntryKind::File) => Ok(()),
            Some(EntryKind::Directory) => Err(Error::wrong_kind(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(Error::not_existing(path.display().to_string())),
        }
    }

    fn reject_directory(&self, path: &Path) -> Result<()> {
        if self.metadata(path)? == Some(EntryKind::Directory) {
            return Err(Error::wrong_kind(format!("{} is a directory", path.display())));
        }
        Ok(())
    }
}

fn map_io(e: io::Error, path: &Path) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::not_existing(path.display().to_string())
    } else {
        Error::Io(e)
    }
}

impl PhysicalFs for HostFs {
    fn metadata(&self, path: &Path) -> Result<Option<EntryKind>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        let mut file = File::open(path).map_err(|e| map_io(e, path))?;
        Ok(magic::read_head(&mut file, len)?)
    }

    fn open(&self, path: &Path) -> Result<ByteSource> {
        self.require_file(path)?;
        let file = File::open(path).map_err(|e| map_io(e, path))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.require_file(path)?;
        fs::read(path).map_err(|e| map_io(e, path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        match self.metadata(path)? {
            Some(EntryKind::Directory) => {}
            Some(EntryKind::File) => {
                return Err(Error::wrong_kind(format!("{} is not a directory", path.display())))
            }
            None => return Err(Error::not_existing(path.display().to_string())),
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| map_io(e, path))? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn can_write(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(meta) => Ok(!meta.permissions().readonly()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path
                .parent()
                .map_or(false, |parent| parent.as_os_str().is_empty() || parent.is_dir())),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn create_output_stream(&self, path: &Path, append: bool) -> Result<ByteSink> {
        self.reject_directory(path)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|e| map_io(e, path))?;
        Ok(Box::new(file))
    }

    fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.reject_directory(path)?;
        fs::write(path, data).map_err(|e| map_io(e, path))
    }

    fn create_new_file(&self, path: &Path) -> Result<bool> {
        self.reject_directory(path)?;
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(map_io(e, path)),
        }
    }

    fn delete(&self, path: &Path) -> Result<bool> {
        match self.metadata(path)? {
            None => Ok(false),
            Some(EntryKind::Directory) => {
                fs::remove_dir(path)?;
                Ok(true)
            }
            Some(EntryKind::File) => {
                fs::remove_file(path)?;
                Ok(true)
            }
        }
    }

    fn mkdir(&self, path: &Path) -> Result<bool> {
        match self.metadata(path)? {
            Some(EntryKind::Directory) => Ok(false),
            Some(EntryKind::File) => Err(Error::wrong_kind(format!("{} is a file", path.display()))),
            None => {
                fs::create_dir(path).map_err(|e| map_io(e, path))?;
                Ok(true)
            }
        }
    }

    fn mkdirs(&self, path: &Path) -> Result<bool> {
        match self.metadata(path)? {
            Some(EntryKind::Directory) => Ok(false),
            Some(EntryKind::File) => Err(Error::wrong_kind(format!("{} is a file", path.display()))),
            None => {
                fs::create_dir_all(path)?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_metadata() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let host = HostFs;
        assert_eq!(host.metadata(dir.path()).unwrap(), Some(EntryKind::Directory));
        assert_eq!(host.metadata(&file).unwrap(), Some(EntryKind::File));
        assert_eq!(host.metadata(&dir.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_read_head_short_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"PK").unwrap();
        file.flush().unwrap();

        assert_eq!(HostFs.read_head(file.path(), 64).unwrap(), b"PK");
    }

    #[test]
    fn test_open_and_read() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"payload").unwrap();
        file.flush().unwrap();

        let mut stream = HostFs.open(file.path()).unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "payload");
        assert_eq!(HostFs.read(file.path()).unwrap(), b"payload");
    }

    #[test]
    fn test_read_directory_is_wrong_kind() {
        let dir = tempdir().unwrap();
        assert!(HostFs.read(dir.path()).unwrap_err().is_wrong_kind());
        assert!(HostFs.open(dir.path()).err().unwrap().is_wrong_kind());
    }

    #[test]
    fn test_missing_is_not_existing() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(HostFs.read(&missing).unwrap_err().is_not_existing());
        assert!(HostFs.list_dir(&missing).unwrap_err().is_not_existing());
    }

    #[test]
    fn test_list_dir_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b"), b"").unwrap();
        fs::write(dir.path().join("a"), b"").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        assert_eq!(HostFs.list_dir(dir.path()).unwrap(), vec!["a", "b", "c"]);
        assert!(HostFs.list_dir(&dir.path().join("a")).unwrap_err().is_wrong_kind());
    }

    #[test]
    fn test_mutations() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("new.txt");

        assert!(HostFs.can_write(&file).unwrap());
        assert!(HostFs.create_new_file(&file).unwrap());
        assert!(!HostFs.create_new_file(&file).unwrap());

        HostFs.write_bytes(&file, b"one").unwrap();
        {
            let mut out = HostFs.create_output_stream(&file, true).unwrap();
            out.write_all(b"two").unwrap();
        }
        assert_eq!(fs::read(&file).unwrap(), b"onetwo");

        let nested = dir.path().join("x").join("y");
        assert!(HostFs.mkdir(&nested).is_err());
        assert!(HostFs.mkdirs(&nested).unwrap());
        assert!(!HostFs.mkdirs(&nested).unwrap());
        assert!(HostFs.create_new_file(&nested).unwrap_err().is_wrong_kind());

        assert!(HostFs.delete(&file).unwrap());
        assert!(!HostFs.delete(&file).unwrap());
        assert!(HostFs.delete(&nested).unwrap());
    }
}
