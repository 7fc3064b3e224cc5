//! Minimal STORE/DEFLATE ZIP reader and writer (spec §4.10), used to bundle
//! a compiled PNGB module with optional assets. Not a general-purpose ZIP
//! implementation: no multi-disk archives, no encryption, no Zip64.

mod errors;
mod format;
mod reader;
mod writer;

pub use errors::ZipError;
pub use reader::{ZipArchive, ZipEntry};
pub use writer::{Method, ZipWriter};

/// Byte 0 of a ZIP archive, used by the PNGB loader to decide whether to
/// delegate to this crate before parsing a module directly (spec §4
/// "ZIP envelope").
pub const ZIP_LOCAL_FILE_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

pub fn looks_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_LOCAL_FILE_SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_store_and_deflate_entries() {
        let mut w = ZipWriter::new();
        w.add_entry("main.pngb", Method::Deflate, b"PNGB-fake-module-bytes").unwrap();
        w.add_entry("assets/x", Method::Store, &[0, 1, 2, 3]).unwrap();
        let bytes = w.finish();

        assert!(looks_like_zip(&bytes));

        let archive = ZipArchive::parse(&bytes).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.extract("main.pngb").unwrap(), b"PNGB-fake-module-bytes");
        assert_eq!(archive.extract("assets/x").unwrap(), vec![0, 1, 2, 3]);
        assert!(archive.find_by_name("missing").is_none());
    }

    #[test]
    fn missing_entry_is_file_not_found() {
        let w = ZipWriter::new();
        let bytes = w.finish();
        let archive = ZipArchive::parse(&bytes).unwrap();
        let err = archive.extract("nope").unwrap_err();
        assert!(matches!(err, ZipError::FileNotFound(name) if name == "nope"));
    }

    #[test]
    fn corrupted_compressed_byte_fails_crc_check() {
        let mut w = ZipWriter::new();
        w.add_entry("main.pngb", Method::Deflate, b"hello pngine world, this compresses fine").unwrap();
        let mut bytes = w.finish();

        // Flip a byte inside the local file header's compressed data region,
        // which starts right after the 30-byte header + 9-byte filename.
        let corrupt_at = 30 + "main.pngb".len() + 2;
        bytes[corrupt_at] ^= 0xFF;

        let archive = ZipArchive::parse(&bytes).unwrap();
        let err = archive.extract("main.pngb").unwrap_err();
        assert!(matches!(err, ZipError::InvalidCrc { name } if name == "main.pngb") || matches!(err, ZipError::Truncated));
    }

    #[test]
    fn empty_filename_is_rejected() {
        let mut w = ZipWriter::new();
        assert!(matches!(w.add_entry("", Method::Store, &[]), Err(ZipError::InvalidFilename)));
    }

    #[test]
    fn garbage_bytes_are_not_a_valid_zip() {
        let err = ZipArchive::parse(&[1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, ZipError::InvalidZip));
    }
}
