use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad magic bytes: expected `PNGB`")]
    InvalidMagic,
    #[error("unsupported PNGB version {0} (expected 4 or 5)")]
    UnsupportedVersion(u16),
    #[error("truncated PNGB module")]
    Truncated,
    #[error("offset {offset} out of bounds (module is {len} bytes)")]
    BadOffset { offset: u32, len: u32 },
}
