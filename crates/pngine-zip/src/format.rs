//! Raw record shapes for the STORE/DEFLATE subset of the ZIP format (spec
//! §4.10). All multi-byte fields are little-endian, as in the ZIP spec
//! itself (and the rest of this workspace's binary formats).

use crate::errors::ZipError;

pub const LOCAL_FILE_HEADER_SIG: u32 = 0x0403_4b50;
pub const CENTRAL_DIR_HEADER_SIG: u32 = 0x0201_4b50;
pub const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;

pub const METHOD_STORE: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

/// The largest a ZIP comment field can be, bounding how far back from EOF
/// the EOCD scan has to look (spec §4.10 "locate EOCD by scanning back up
/// to 64 KB").
pub const MAX_EOCD_COMMENT_LEN: usize = 65535;
pub const EOCD_FIXED_LEN: usize = 22;

pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, ZipError> {
    let slice = bytes.get(offset..offset + 2).ok_or(ZipError::Truncated)?;
    Ok(u16::from_le_bytes([slice[0], slice[1]]))
}

pub fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ZipError> {
    let slice = bytes.get(offset..offset + 4).ok_or(ZipError::Truncated)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

pub struct CentralDirEntry {
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub local_header_offset: u32,
    pub name: String,
}

/// Parses one Central Directory File Header starting at `offset`, returning
/// the entry plus the offset of the byte following it.
pub fn parse_central_dir_entry(bytes: &[u8], offset: usize) -> Result<(CentralDirEntry, usize), ZipError> {
    if read_u32(bytes, offset)? != CENTRAL_DIR_HEADER_SIG {
        return Err(ZipError::InvalidZip);
    }
    let method = read_u16(bytes, offset + 10)?;
    let crc32 = read_u32(bytes, offset + 16)?;
    let compressed_size = read_u32(bytes, offset + 20)?;
    let uncompressed_size = read_u32(bytes, offset + 24)?;
    let name_len = read_u16(bytes, offset + 28)? as usize;
    let extra_len = read_u16(bytes, offset + 30)? as usize;
    let comment_len = read_u16(bytes, offset + 32)? as usize;
    let local_header_offset = read_u32(bytes, offset + 42)?;
    let name_start = offset + 46;
    let name_bytes = bytes.get(name_start..name_start + name_len).ok_or(ZipError::Truncated)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    let next = name_start + name_len + extra_len + comment_len;
    Ok((
        CentralDirEntry {
            method,
            crc32,
            compressed_size,
            uncompressed_size,
            local_header_offset,
            name,
        },
        next,
    ))
}

/// Returns the byte offset of the data immediately following a Local File
/// Header's filename/extra fields, i.e. where an entry's compressed bytes
/// begin.
pub fn local_file_data_offset(bytes: &[u8], local_header_offset: usize) -> Result<usize, ZipError> {
    if read_u32(bytes, local_header_offset)? != LOCAL_FILE_HEADER_SIG {
        return Err(ZipError::InvalidZip);
    }
    let name_len = read_u16(bytes, local_header_offset + 26)? as usize;
    let extra_len = read_u16(bytes, local_header_offset + 28)? as usize;
    Ok(local_header_offset + 30 + name_len + extra_len)
}
