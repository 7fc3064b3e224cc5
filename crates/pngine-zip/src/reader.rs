use std::io::Read;

use crc32fast::Hasher;
use flate2::read::DeflateDecoder;
use tracing::debug_span;

use crate::errors::ZipError;
use crate::format::{
    self, parse_central_dir_entry, read_u16, read_u32, CentralDirEntry, END_OF_CENTRAL_DIR_SIG, EOCD_FIXED_LEN,
    MAX_EOCD_COMMENT_LEN, METHOD_DEFLATE, METHOD_STORE,
};

/// A parsed ZIP entry's central-directory metadata, without its bytes.
pub struct ZipEntry {
    pub name: String,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    local_header_offset: u32,
}

/// A read-only view over a ZIP archive's bytes (spec §4.10).
///
/// Built by locating the End-of-Central-Directory record (scanning back up
/// to 64 KB from EOF) and walking every Central Directory File Header it
/// points to; entry bytes are only decompressed on demand, in
/// [`ZipArchive::extract`].
pub struct ZipArchive<'a> {
    bytes: &'a [u8],
    entries: Vec<ZipEntry>,
}

impl<'a> ZipArchive<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ZipError> {
        let _span = debug_span!("zip_parse").entered();
        let eocd_offset = find_eocd(bytes)?;
        let total_entries = read_u16(bytes, eocd_offset + 10)? as usize;
        let cd_offset = read_u32(bytes, eocd_offset + 16)? as usize;

        let mut entries = Vec::with_capacity(total_entries);
        let mut pos = cd_offset;
        for _ in 0..total_entries {
            let (entry, next) = parse_central_dir_entry(bytes, pos)?;
            entries.push(to_entry(entry));
            pos = next;
        }

        Ok(Self { bytes, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Decompresses `name`'s bytes and verifies its CRC-32, per spec §8
    /// scenario 6 (single-byte corruption must surface as `invalid_crc`).
    pub fn extract(&self, name: &str) -> Result<Vec<u8>, ZipError> {
        let entry = self.find_by_name(name).ok_or_else(|| ZipError::FileNotFound(name.to_string()))?;
        let data_start = format::local_file_data_offset(self.bytes, entry.local_header_offset as usize)?;
        let data_end = data_start + entry.compressed_size as usize;
        let compressed = self.bytes.get(data_start..data_end).ok_or(ZipError::Truncated)?;

        let decompressed = match entry.method {
            METHOD_STORE => compressed.to_vec(),
            METHOD_DEFLATE => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(compressed).read_to_end(&mut out).map_err(|_| ZipError::Truncated)?;
                out
            }
            other => return Err(ZipError::UnsupportedMethod(other, name.to_string())),
        };

        let mut hasher = Hasher::new();
        hasher.update(&decompressed);
        if hasher.finalize() != entry.crc32 {
            return Err(ZipError::InvalidCrc { name: name.to_string() });
        }
        Ok(decompressed)
    }
}

fn to_entry(cd: CentralDirEntry) -> ZipEntry {
    ZipEntry {
        name: cd.name,
        method: cd.method,
        crc32: cd.crc32,
        compressed_size: cd.compressed_size,
        uncompressed_size: cd.uncompressed_size,
        local_header_offset: cd.local_header_offset,
    }
}

fn find_eocd(bytes: &[u8]) -> Result<usize, ZipError> {
    if bytes.len() < EOCD_FIXED_LEN {
        return Err(ZipError::InvalidZip);
    }
    let window_start = bytes.len().saturating_sub(EOCD_FIXED_LEN + MAX_EOCD_COMMENT_LEN);
    let mut i = bytes.len() - EOCD_FIXED_LEN;
    loop {
        if read_u32(bytes, i)? == END_OF_CENTRAL_DIR_SIG {
            return Ok(i);
        }
        if i == window_start {
            return Err(ZipError::InvalidZip);
        }
        i -= 1;
    }
}
