use std::io::Write;

use crc32fast::Hasher;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use tracing::debug_span;

use crate::errors::ZipError;
use crate::format::{CENTRAL_DIR_HEADER_SIG, END_OF_CENTRAL_DIR_SIG, LOCAL_FILE_HEADER_SIG, METHOD_DEFLATE, METHOD_STORE};

/// Compression method for a written entry (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Store,
    Deflate,
}

impl Method {
    fn code(self) -> u16 {
        match self {
            Method::Store => METHOD_STORE,
            Method::Deflate => METHOD_DEFLATE,
        }
    }
}

struct PendingEntry {
    name: String,
    method: Method,
    data: Vec<u8>,
}

/// Accumulates entries and emits a complete ZIP archive on [`ZipWriter::finish`]
/// (spec §4.10): local headers inline, then the central directory, then the
/// EOCD record.
#[derive(Default)]
pub struct ZipWriter {
    entries: Vec<PendingEntry>,
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, name: &str, method: Method, data: &[u8]) -> Result<(), ZipError> {
        if name.is_empty() || name.bytes().any(|b| b == 0) {
            return Err(ZipError::InvalidFilename);
        }
        self.entries.push(PendingEntry { name: name.to_string(), method, data: data.to_vec() });
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        let _span = debug_span!("zip_finish").entered();
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let local_header_offset = out.len() as u32;
            let mut hasher = Hasher::new();
            hasher.update(&entry.data);
            let crc32 = hasher.finalize();

            let compressed = match entry.method {
                Method::Store => entry.data.clone(),
                Method::Deflate => {
                    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(&entry.data).expect("writing to an in-memory buffer never fails");
                    encoder.finish().expect("writing to an in-memory buffer never fails")
                }
            };

            write_local_header(&mut out, entry, crc32, compressed.len() as u32);
            out.extend_from_slice(&compressed);

            write_central_dir_entry(&mut central, entry, crc32, compressed.len() as u32, local_header_offset);
        }

        let cd_offset = out.len() as u32;
        let cd_len = central.len() as u32;
        out.extend_from_slice(&central);

        write_eocd(&mut out, self.entries.len() as u16, cd_len, cd_offset);
        out
    }
}

fn write_local_header(out: &mut Vec<u8>, entry: &PendingEntry, crc32: u32, compressed_len: u32) {
    out.extend_from_slice(&LOCAL_FILE_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&entry.method.code().to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&crc32.to_le_bytes());
    out.extend_from_slice(&compressed_len.to_le_bytes());
    out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra length
    out.extend_from_slice(entry.name.as_bytes());
}

fn write_central_dir_entry(out: &mut Vec<u8>, entry: &PendingEntry, crc32: u32, compressed_len: u32, local_header_offset: u32) {
    out.extend_from_slice(&CENTRAL_DIR_HEADER_SIG.to_le_bytes());
    out.extend_from_slice(&20u16.to_le_bytes()); // version made by
    out.extend_from_slice(&20u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&entry.method.code().to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // mod time
    out.extend_from_slice(&0u16.to_le_bytes()); // mod date
    out.extend_from_slice(&crc32.to_le_bytes());
    out.extend_from_slice(&compressed_len.to_le_bytes());
    out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // extra length
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
    out.extend_from_slice(&local_header_offset.to_le_bytes());
    out.extend_from_slice(entry.name.as_bytes());
}

fn write_eocd(out: &mut Vec<u8>, entry_count: u16, cd_len: u32, cd_offset: u32) {
    out.extend_from_slice(&END_OF_CENTRAL_DIR_SIG.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // disk with central dir
    out.extend_from_slice(&entry_count.to_le_bytes());
    out.extend_from_slice(&entry_count.to_le_bytes());
    out.extend_from_slice(&cd_len.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
}
