use crate::errors::FormatError;

pub const MAGIC: [u8; 4] = *b"PNGB";
pub const VERSION_4: u16 = 4;
pub const VERSION_5: u16 = 5;

/// v5's layout: every field `spec.md` §3 marks `[v5]`/`[v5 only]` present.
/// v4 predates `bytecode_offset` and the uniform/animation side tables; a v4
/// module's bytecode starts immediately after its (shorter) header and has
/// no uniform/animation tables (spec §9 open question resolution).
pub const HEADER_LEN_V4: usize = 20;
pub const HEADER_LEN_V5: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub flags: u16,
    pub bytecode_offset: u32,
    pub string_table_offset: u32,
    pub string_table_len: u32,
    pub data_section_offset: u32,
    pub uniform_table_offset: u32,
    pub uniform_table_len: u32,
    pub animation_table_offset: u32,
    pub animation_table_len: u32,
}

impl Header {
    pub fn header_len(&self) -> usize {
        if self.version == VERSION_4 {
            HEADER_LEN_V4
        } else {
            HEADER_LEN_V5
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < 8 || bytes[0..4] != MAGIC {
            return Err(FormatError::InvalidMagic);
        }
        let version = read_u16(bytes, 4)?;
        let flags = read_u16(bytes, 6)?;
        match version {
            VERSION_4 => {
                if bytes.len() < HEADER_LEN_V4 {
                    return Err(FormatError::Truncated);
                }
                let string_table_offset = read_u32(bytes, 8)?;
                let string_table_len = read_u32(bytes, 12)?;
                let data_section_offset = read_u32(bytes, 16)?;
                Ok(Header {
                    version,
                    flags,
                    bytecode_offset: HEADER_LEN_V4 as u32,
                    string_table_offset,
                    string_table_len,
                    data_section_offset,
                    uniform_table_offset: 0,
                    uniform_table_len: 0,
                    animation_table_offset: 0,
                    animation_table_len: 0,
                })
            }
            VERSION_5 => {
                if bytes.len() < HEADER_LEN_V5 {
                    return Err(FormatError::Truncated);
                }
                Ok(Header {
                    version,
                    flags,
                    bytecode_offset: read_u32(bytes, 8)?,
                    string_table_offset: read_u32(bytes, 12)?,
                    string_table_len: read_u32(bytes, 16)?,
                    data_section_offset: read_u32(bytes, 20)?,
                    uniform_table_offset: read_u32(bytes, 24)?,
                    uniform_table_len: read_u32(bytes, 28)?,
                    animation_table_offset: read_u32(bytes, 32)?,
                    animation_table_len: read_u32(bytes, 36)?,
                })
            }
            other => Err(FormatError::UnsupportedVersion(other)),
        }
    }

    /// Always writes the v5 layout (spec §9: "Writers should prefer v5.").
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION_5.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.bytecode_offset.to_le_bytes());
        out.extend_from_slice(&self.string_table_offset.to_le_bytes());
        out.extend_from_slice(&self.string_table_len.to_le_bytes());
        out.extend_from_slice(&self.data_section_offset.to_le_bytes());
        out.extend_from_slice(&self.uniform_table_offset.to_le_bytes());
        out.extend_from_slice(&self.uniform_table_len.to_le_bytes());
        out.extend_from_slice(&self.animation_table_offset.to_le_bytes());
        out.extend_from_slice(&self.animation_table_len.to_le_bytes());
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, FormatError> {
    bytes
        .get(at..at + 2)
        .map(|s| u16::from_le_bytes([s[0], s[1]]))
        .ok_or(FormatError::Truncated)
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, FormatError> {
    bytes
        .get(at..at + 4)
        .map(|s| u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or(FormatError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            version: VERSION_5,
            flags: 0,
            bytecode_offset: HEADER_LEN_V5 as u32,
            string_table_offset: 100,
            string_table_len: 10,
            data_section_offset: 200,
            uniform_table_offset: 300,
            uniform_table_len: 20,
            animation_table_offset: 400,
            animation_table_len: 30,
        }
    }

    #[test]
    fn v5_round_trips() {
        let header = sample();
        let mut bytes = Vec::new();
        header.write(&mut bytes);
        assert_eq!(bytes.len(), HEADER_LEN_V5);
        let parsed = Header::parse(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn v4_is_accepted_with_inferred_bytecode_offset() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&VERSION_4.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&50u32.to_le_bytes());
        bytes.extend_from_slice(&5u32.to_le_bytes());
        bytes.extend_from_slice(&60u32.to_le_bytes());
        let header = Header::parse(&bytes).unwrap();
        assert_eq!(header.bytecode_offset, HEADER_LEN_V4 as u32);
        assert_eq!(header.string_table_offset, 50);
    }

    #[test]
    fn bad_magic_errors() {
        let err = Header::parse(b"XXXX\x05\x00\x00\x00").unwrap_err();
        assert_eq!(err, FormatError::InvalidMagic);
    }

    #[test]
    fn unsupported_version_errors() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&99u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        let err = Header::parse(&bytes).unwrap_err();
        assert_eq!(err, FormatError::UnsupportedVersion(99));
    }
}
