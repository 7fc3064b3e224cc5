use crate::errors::FormatError;

/// `count (u16) + [offset, length] * count + bytes` (spec §3). Offsets are
/// relative to the start of the bytes blob that follows the index, not to
/// the start of the module.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    entries: &'a [u8],
    blob: &'a [u8],
    count: u16,
}

impl<'a> StringTable<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FormatError> {
        let count = super::read_u16_at(bytes, 0)?;
        let index_len = count as usize * 8;
        let entries = bytes.get(2..2 + index_len).ok_or(FormatError::Truncated)?;
        let blob = bytes.get(2 + index_len..).ok_or(FormatError::Truncated)?;
        Ok(Self { entries, blob, count })
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, id: u16) -> Option<&'a [u8]> {
        if id as usize >= self.count as usize {
            return None;
        }
        let at = id as usize * 8;
        let offset = u32::from_le_bytes(self.entries[at..at + 4].try_into().ok()?) as usize;
        let length = u32::from_le_bytes(self.entries[at + 4..at + 8].try_into().ok()?) as usize;
        self.blob.get(offset..offset + length)
    }

    pub fn get_str(&self, id: u16) -> Option<&'a str> {
        self.get(id).and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Serializes entries (in id order) into the on-disk string-table layout.
pub fn write_string_table(entries: impl ExactSizeIterator<Item = impl AsRef<[u8]>>) -> Vec<u8> {
    let count = entries.len() as u16;
    let mut index = Vec::with_capacity(entries.len() * 8);
    let mut blob = Vec::new();
    for entry in entries {
        let bytes = entry.as_ref();
        index.extend_from_slice(&(blob.len() as u32).to_le_bytes());
        index.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        blob.extend_from_slice(bytes);
    }
    let mut out = Vec::with_capacity(2 + index.len() + blob.len());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&index);
    out.extend_from_slice(&blob);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_entries_by_id() {
        let entries = vec!["alpha".to_string(), "beta".to_string(), "".to_string()];
        let bytes = write_string_table(entries.iter().map(|s| s.as_bytes()));
        let table = StringTable::parse(&bytes).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get_str(0), Some("alpha"));
        assert_eq!(table.get_str(1), Some("beta"));
        assert_eq!(table.get_str(2), Some(""));
        assert_eq!(table.get(3), None);
    }
}
