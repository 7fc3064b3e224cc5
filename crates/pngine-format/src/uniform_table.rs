use crate::errors::FormatError;

pub const RECORD_LEN: usize = 14;

/// The shader numeric type a reflected `var<uniform>` field holds, matching
/// WGSL's scalar/vector/matrix families closely enough for byte-size and
/// writing purposes (spec §4.3 phase 5 feeds this from reflection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FieldType {
    F32 = 0,
    Vec2F32 = 1,
    Vec3F32 = 2,
    Vec4F32 = 3,
    Mat4x4F32 = 4,
    U32 = 5,
    I32 = 6,
}

impl FieldType {
    fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0 => Self::F32,
            1 => Self::Vec2F32,
            2 => Self::Vec3F32,
            3 => Self::Vec4F32,
            4 => Self::Mat4x4F32,
            5 => Self::U32,
            6 => Self::I32,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformField {
    pub buffer_id: u16,
    pub offset: u32,
    pub size: u32,
    pub field_type: FieldType,
}

/// Fixed-width records keyed by the uniform's interned variable-name string
/// id (spec §4.7: `find_field_by_string_id`).
#[derive(Debug, Clone, Copy)]
pub struct UniformTable<'a> {
    bytes: &'a [u8],
    count: u16,
}

impl<'a> UniformTable<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        if bytes.is_empty() {
            return Ok(Self { bytes: &[], count: 0 });
        }
        let count = super::read_u16_at(bytes, 0)?;
        let needed = 2 + count as usize * RECORD_LEN;
        if bytes.len() < needed {
            return Err(FormatError::Truncated);
        }
        Ok(Self { bytes, count })
    }

    pub fn find_field_by_string_id(&self, string_id: u16) -> Option<UniformField> {
        for i in 0..self.count as usize {
            let at = 2 + i * RECORD_LEN;
            let rec = &self.bytes[at..at + RECORD_LEN];
            let id = u16::from_le_bytes([rec[0], rec[1]]);
            if id == string_id {
                let buffer_id = u16::from_le_bytes([rec[2], rec[3]]);
                let offset = u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]);
                let size = u32::from_le_bytes([rec[8], rec[9], rec[10], rec[11]]);
                let field_type = FieldType::from_u8(rec[12])?;
                return Some(UniformField { buffer_id, offset, size, field_type });
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

pub fn write_uniform_table(entries: &[(u16, UniformField)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + entries.len() * RECORD_LEN);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (string_id, field) in entries {
        out.extend_from_slice(&string_id.to_le_bytes());
        out.extend_from_slice(&field.buffer_id.to_le_bytes());
        out.extend_from_slice(&field.offset.to_le_bytes());
        out.extend_from_slice(&field.size.to_le_bytes());
        out.push(field.field_type as u8);
        out.push(0); // pad
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_field_by_string_id() {
        let field = UniformField { buffer_id: 2, offset: 64, size: 64, field_type: FieldType::Mat4x4F32 };
        let bytes = write_uniform_table(&[(7, field)]);
        let table = UniformTable::parse(&bytes).unwrap();
        assert_eq!(table.find_field_by_string_id(7), Some(field));
        assert_eq!(table.find_field_by_string_id(8), None);
    }

    #[test]
    fn empty_table_parses() {
        let table = UniformTable::parse(&[]).unwrap();
        assert!(table.is_empty());
    }
}
