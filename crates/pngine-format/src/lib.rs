//! The PNGB binary module container (spec §3, §4.7): header, string table,
//! data section, uniform table, and animation table, plus the zero-copy
//! [`Module`] view over a full byte buffer.

mod animation;
mod data_section;
mod errors;
mod header;
mod module;
mod string_table;
mod uniform_table;

pub use animation::{get_scene_time, AnimationTable, Scene, SceneIdx, SceneTime};
pub use data_section::{write_data_section, DataSection};
pub use errors::FormatError;
pub use header::{Header, HEADER_LEN_V4, HEADER_LEN_V5, MAGIC, VERSION_4, VERSION_5};
pub use module::{serialize, Module, ModuleParts};
pub use string_table::{write_string_table, StringTable};
pub use uniform_table::{write_uniform_table, FieldType, UniformField, UniformTable};

pub(crate) fn read_u16_at(bytes: &[u8], at: usize) -> Result<u16, FormatError> {
    bytes
        .get(at..at + 2)
        .map(|s| u16::from_le_bytes([s[0], s[1]]))
        .ok_or(FormatError::Truncated)
}
