//! Zip local file headers and data descriptors
//!
//! Forward-only decoding never sees the central directory, so member names,
//! sizes and flags come from the local header in front of each member. Writers
//! that stream their output (`ZipOutputStream`, `zip -` ...) set bit 3 and put
//! the real sizes in a data descriptor after the data.
//!
//! Layouts follow PKWARE APPNOTE sections 4.3.7 and 4.3.9.

use std::io::{self, Read};

/// Local file header signature ("PK\x03\x04")
pub const LOCAL_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory header signature
pub const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory signature
pub const END_SIGNATURE: u32 = 0x0605_4b50;

/// Zip64 end of central directory signature
pub const ZIP64_END_SIGNATURE: u32 = 0x0606_4b50;

/// Optional data descriptor signature
pub const DESCRIPTOR_SIGNATURE: u32 = 0x0807_4b50;

/// Leading marker of single-segment "spanned" archives
pub const SPANNING_MARKER: u32 = 0x3030_4b50;

/// General purpose flag bits
pub const FLAG_ENCRYPTED: u16 = 0x0001;
pub const FLAG_DESCRIPTOR: u16 = 0x0008;
pub const FLAG_UTF8: u16 = 0x0800;

/// Compression methods decoded in streamed mode
pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATED: u16 = 8;

const ZIP64_EXTRA_ID: u16 = 0x0001;
const ZIP64_MARKER: u32 = 0xFFFF_FFFF;

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Read one little-endian `u32`
pub fn read_u32<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read + ?Sized>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Local file header of one member (signature already consumed)
#[derive(Debug, Clone)]
pub struct LocalHeader {
    /// General purpose bit flags
    pub flags: u16,
    /// Compression method
    pub method: u16,
    /// CRC-32 of the uncompressed data (zero when deferred to a descriptor)
    pub crc32: u32,
    /// Size of the stored data
    pub compressed_size: u64,
    /// Size after decompression
    pub size: u64,
    /// Member name, decoded
    pub name: String,
    /// Sizes are 64-bit (a Zip64 extra field was present)
    pub zip64: bool,
}

impl LocalHeader {
    /// Size of the fixed part following the signature
    pub const SIZE: usize = 26;

    /// Parse the fixed part, the name and the extra field
    pub fn parse(fixed: &[u8], name: &[u8], extra: &[u8]) -> io::Result<Self> {
        if fixed.len() < Self::SIZE {
            return Err(invalid("Local header too short"));
        }

        let flags = u16::from_le_bytes([fixed[2], fixed[3]]);
        let method = u16::from_le_bytes([fixed[4], fixed[5]]);
        let crc32 = u32::from_le_bytes([fixed[10], fixed[11], fixed[12], fixed[13]]);
        let compressed = u32::from_le_bytes([fixed[14], fixed[15], fixed[16], fixed[17]]);
        let size = u32::from_le_bytes([fixed[18], fixed[19], fixed[20], fixed[21]]);

        let name = if flags & FLAG_UTF8 != 0 {
            String::from_utf8_lossy(name).into_owned()
        } else {
            decode_cp437(name)
        };

        let mut header = Self {
            flags,
            method,
            crc32,
            compressed_size: compressed as u64,
            size: size as u64,
            name,
            zip64: false,
        };
        header.apply_extra(extra, size == ZIP64_MARKER, compressed == ZIP64_MARKER)?;
        Ok(header)
    }

    /// Read a header from `reader`, which sits just past the signature
    pub fn read<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut fixed = [0u8; Self::SIZE];
        reader.read_exact(&mut fixed)?;

        let name_len = u16::from_le_bytes([fixed[22], fixed[23]]) as usize;
        let extra_len = u16::from_le_bytes([fixed[24], fixed[25]]) as usize;

        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name)?;
        let mut extra = vec![0u8; extra_len];
        reader.read_exact(&mut extra)?;

        Self::parse(&fixed, &name, &extra)
    }

    /// Pick 64-bit sizes out of a Zip64 extended information field
    fn apply_extra(&mut self, mut extra: &[u8], wide_size: bool, wide_compressed: bool) -> io::Result<()> {
        while extra.len() >= 4 {
            let id = u16::from_le_bytes([extra[0], extra[1]]);
            let len = u16::from_le_bytes([extra[2], extra[3]]) as usize;
            let Some(body) = extra.get(4..4 + len) else {
                return Err(invalid(format!("Extra field of {} overruns header", self.name)));
            };

            if id == ZIP64_EXTRA_ID {
                self.zip64 = true;
                let mut body = body;
                if wide_size {
                    self.size = read_u64(&mut body).map_err(|_| invalid("Zip64 field too short"))?;
                }
                if wide_compressed {
                    self.compressed_size =
                        read_u64(&mut body).map_err(|_| invalid("Zip64 field too short"))?;
                }
            }
            extra = &extra[4 + len..];
        }
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Sizes and CRC follow the data instead of this header
    pub fn has_descriptor(&self) -> bool {
        self.flags & FLAG_DESCRIPTOR != 0
    }

    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/') || self.name.ends_with('\\')
    }
}

/// Trailer written after the data of a bit-3 member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub size: u64,
}

impl DataDescriptor {
    /// Read a descriptor; its signature is optional
    pub fn read<R: Read + ?Sized>(reader: &mut R, zip64: bool) -> io::Result<Self> {
        let first = read_u32(reader)?;
        let crc32 = if first == DESCRIPTOR_SIGNATURE { read_u32(reader)? } else { first };

        let (compressed_size, size) = if zip64 {
            (read_u64(reader)?, read_u64(reader)?)
        } else {
            (read_u32(reader)? as u64, read_u32(reader)? as u64)
        };

        Ok(Self {
            crc32,
            compressed_size,
            size,
        })
    }
}

/// Upper half of code page 437, the default zip name encoding
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

fn decode_cp437(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b < 0x80 { b as char } else { CP437_HIGH[(b - 0x80) as usize] })
        .collect()
}
