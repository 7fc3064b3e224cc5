use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZipError {
    #[error("not a valid ZIP archive (end of central directory not found)")]
    InvalidZip,
    #[error("file `{0}` not found in archive")]
    FileNotFound(String),
    #[error("CRC-32 mismatch extracting `{name}`")]
    InvalidCrc { name: String },
    #[error("truncated ZIP archive")]
    Truncated,
    #[error("invalid filename: empty or contains NUL")]
    InvalidFilename,
    #[error("unsupported compression method {0} for `{1}`")]
    UnsupportedMethod(u16, String),
}
