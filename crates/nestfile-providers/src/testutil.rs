//! Zip fixtures for tests

use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One member of a fixture archive
pub(crate) enum Member<'a> {
    Dir(&'a str),
    File {
        name: &'a str,
        data: &'a [u8],
        method: CompressionMethod,
    },
}

impl<'a> Member<'a> {
    pub(crate) fn dir(name: &'a str) -> Self {
        Member::Dir(name)
    }

    pub(crate) fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Member::File {
            name,
            data,
            method: CompressionMethod::Stored,
        }
    }

    pub(crate) fn deflated(name: &'a str, data: &'a [u8]) -> Self {
        Member::File {
            name,
            data,
            method: CompressionMethod::Deflated,
        }
    }
}

/// Build a zip archive in memory
pub(crate) fn build_zip(members: &[Member<'_>]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for member in members {
        match member {
            Member::Dir(name) => {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            }
            Member::File { name, data, method } => {
                let options = SimpleFileOptions::default().compression_method(*method);
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Write a zip archive to `dir/name`
pub(crate) fn write_zip(dir: &Path, name: &str, members: &[Member<'_>]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_zip(members)).unwrap();
    path
}

/// Build a zip the way streaming writers do: deflated members with zeroed
/// local sizes (flag bit 3) and a signed data descriptor after each one
pub(crate) fn build_descriptor_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    const FLAGS: u16 = 0x0008;
    const METHOD: u16 = 8;
    const DOS_DATE: u16 = 20513;

    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data) in members {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();
        let mut crc = Crc::new();
        crc.update(data);
        let offset = out.len() as u32;

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&FLAGS.to_le_bytes());
        out.extend_from_slice(&METHOD.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&DOS_DATE.to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&compressed);

        out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
        out.extend_from_slice(&crc.sum().to_le_bytes());
        out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&FLAGS.to_le_bytes());
        central.extend_from_slice(&METHOD.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&DOS_DATE.to_le_bytes());
        central.extend_from_slice(&crc.sum().to_le_bytes());
        central.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0u8; 12]);
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let central_offset = out.len() as u32;
    out.extend_from_slice(&central);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&(members.len() as u16).to_le_bytes());
    out.extend_from_slice(&(members.len() as u16).to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}
