use crate::animation::AnimationTable;
use crate::data_section::DataSection;
use crate::errors::FormatError;
use crate::header::Header;
use crate::string_table::StringTable;

/// A zero-copy parsed view over a PNGB byte buffer. Every accessor borrows
/// from the original bytes; the caller owns the buffer for as long as a
/// `Module` built from it is alive (spec §4 "Ownership").
#[derive(Debug)]
pub struct Module<'a> {
    bytes: &'a [u8],
    header: Header,
}

impl<'a> Module<'a> {
    pub fn deserialize(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let header = Header::parse(bytes)?;
        let module = Self { bytes, header };
        module.check_offset(header.bytecode_offset)?;
        module.check_offset(header.string_table_offset)?;
        module.check_offset(header.data_section_offset)?;
        if header.version == crate::header::VERSION_5 {
            module.check_offset(header.uniform_table_offset)?;
            module.check_offset(header.animation_table_offset)?;
        }
        Ok(module)
    }

    fn check_offset(&self, offset: u32) -> Result<(), FormatError> {
        if offset as usize > self.bytes.len() {
            return Err(FormatError::BadOffset { offset, len: self.bytes.len() as u32 });
        }
        Ok(())
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn bytecode(&self) -> &'a [u8] {
        let start = self.header.bytecode_offset as usize;
        let end = self.header.string_table_offset as usize;
        if end > start && end <= self.bytes.len() {
            &self.bytes[start..end]
        } else {
            &self.bytes[start.min(self.bytes.len())..start.min(self.bytes.len())]
        }
    }

    pub fn strings(&self) -> Result<StringTable<'a>, FormatError> {
        let start = self.header.string_table_offset as usize;
        let end = start + self.header.string_table_len as usize;
        let slice = self.bytes.get(start..end).ok_or(FormatError::Truncated)?;
        StringTable::parse(slice)
    }

    pub fn data(&self) -> Result<DataSection<'a>, FormatError> {
        let start = self.header.data_section_offset as usize;
        let end = if self.header.version == crate::header::VERSION_5 {
            self.header.uniform_table_offset as usize
        } else {
            self.bytes.len()
        };
        let end = end.max(start).min(self.bytes.len());
        DataSection::parse(&self.bytes[start..end])
    }

    pub fn uniforms(&self) -> Result<crate::uniform_table::UniformTable<'a>, FormatError> {
        if self.header.version != crate::header::VERSION_5 {
            return crate::uniform_table::UniformTable::parse(&[]);
        }
        let start = self.header.uniform_table_offset as usize;
        let end = start + self.header.uniform_table_len as usize;
        let slice = self.bytes.get(start..end).ok_or(FormatError::Truncated)?;
        crate::uniform_table::UniformTable::parse(slice)
    }

    pub fn animation(&self) -> Result<AnimationTable<'a>, FormatError> {
        if self.header.version != crate::header::VERSION_5 {
            return AnimationTable::parse(&[]);
        }
        let start = self.header.animation_table_offset as usize;
        let end = start + self.header.animation_table_len as usize;
        let slice = self.bytes.get(start..end).ok_or(FormatError::Truncated)?;
        AnimationTable::parse(slice)
    }
}

/// Everything needed to serialize a full PNGB module (spec §4.6 stage 5).
pub struct ModuleParts {
    pub bytecode: Vec<u8>,
    pub string_table: Vec<u8>,
    pub data_section: Vec<u8>,
    pub uniform_table: Vec<u8>,
    pub animation_table: Vec<u8>,
}

/// Concatenates `header ∥ bytecode ∥ string table ∥ data section ∥ uniform
/// table ∥ animation table`, always writing the v5 header layout.
pub fn serialize(parts: &ModuleParts) -> Vec<u8> {
    let header_len = crate::header::HEADER_LEN_V5 as u32;
    let bytecode_offset = header_len;
    let string_table_offset = bytecode_offset + parts.bytecode.len() as u32;
    let data_section_offset = string_table_offset + parts.string_table.len() as u32;
    let uniform_table_offset = data_section_offset + parts.data_section.len() as u32;
    let animation_table_offset = uniform_table_offset + parts.uniform_table.len() as u32;

    let header = Header {
        version: crate::header::VERSION_5,
        flags: 0,
        bytecode_offset,
        string_table_offset,
        string_table_len: parts.string_table.len() as u32,
        data_section_offset,
        uniform_table_offset,
        uniform_table_len: parts.uniform_table.len() as u32,
        animation_table_offset,
        animation_table_len: parts.animation_table.len() as u32,
    };

    let mut out = Vec::with_capacity(
        header_len as usize
            + parts.bytecode.len()
            + parts.string_table.len()
            + parts.data_section.len()
            + parts.uniform_table.len()
            + parts.animation_table.len(),
    );
    header.write(&mut out);
    out.extend_from_slice(&parts.bytecode);
    out.extend_from_slice(&parts.string_table);
    out.extend_from_slice(&parts.data_section);
    out.extend_from_slice(&parts.uniform_table);
    out.extend_from_slice(&parts.animation_table);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string_table::write_string_table;
    use pretty_assertions::assert_eq;

    #[test]
    fn serialize_then_deserialize_round_trips() {
        let parts = ModuleParts {
            bytecode: vec![0, 1, 2],
            string_table: write_string_table(["hello"].iter().map(|s| s.as_bytes())),
            data_section: crate::data_section::write_data_section([[1u8, 2, 3]].iter().map(|v| v.as_slice())),
            uniform_table: Vec::new(),
            animation_table: Vec::new(),
        };
        let bytes = serialize(&parts);
        let module = Module::deserialize(&bytes).unwrap();
        assert_eq!(module.bytecode(), &[0, 1, 2]);
        assert_eq!(module.strings().unwrap().get_str(0), Some("hello"));
        assert_eq!(module.data().unwrap().get(0), Some([1u8, 2, 3].as_slice()));
    }

    #[test]
    fn serialize_is_identity_under_reparse() {
        let parts = ModuleParts {
            bytecode: vec![9, 9, 9],
            string_table: write_string_table(Vec::<&[u8]>::new().into_iter()),
            data_section: crate::data_section::write_data_section(Vec::<&[u8]>::new().into_iter()),
            uniform_table: Vec::new(),
            animation_table: Vec::new(),
        };
        let first = serialize(&parts);
        let module = Module::deserialize(&first).unwrap();
        let reparsed = ModuleParts {
            bytecode: module.bytecode().to_vec(),
            string_table: write_string_table(Vec::<&[u8]>::new().into_iter()),
            data_section: write_data_section_for_test(),
            uniform_table: Vec::new(),
            animation_table: Vec::new(),
        };
        let second = serialize(&reparsed);
        assert_eq!(first, second);
    }

    fn write_data_section_for_test() -> Vec<u8> {
        crate::data_section::write_data_section(Vec::<&[u8]>::new().into_iter())
    }
}
