//! Self-contained ZIP container codec
//!
//! This module provides the archive layer underneath the XLSX codec:
//! - CRC32 over entry payloads
//! - Raw DEFLATE compression (method 8) or stored entries (method 0)
//! - A two-pass in-memory writer with a deterministic offset layout
//! - A linear-scan reader for the single-disk archives the writer emits

pub mod bytes;
pub mod compression;
pub mod crc32;
pub mod reader;
pub mod writer;

pub use compression::{deflate, inflate, supports_compression};
pub use crc32::crc32;
pub use reader::{ZipEntry, ZipReader};
pub use writer::ZipWriter;

/// ZIP local file header signature
pub const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;

/// ZIP central directory signature
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// ZIP end of central directory signature
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

pub const LOCAL_FILE_HEADER_SIZE: usize = 30;
pub const CENTRAL_DIRECTORY_HEADER_SIZE: usize = 46;
pub const END_OF_CENTRAL_DIRECTORY_SIZE: usize = 22;

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;

/// "Version made by" and "version needed" (2.0)
pub(crate) const ZIP_VERSION: u16 = 20;

/// General purpose bit 11: file name is UTF-8
pub(crate) const FLAG_UTF8_NAME: u16 = 0x0800;

/// A file queued for archiving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub data: Vec<u8>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        FileEntry {
            path: path.into(),
            data: data.into(),
        }
    }
}
