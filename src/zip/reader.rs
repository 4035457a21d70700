//! Linear-scan ZIP reader
//!
//! Entries are discovered by walking local file headers from offset 0 and
//! trusting the sizes they declare. The central directory is never parsed;
//! scanning stops at its first signature. This covers every archive
//! [`ZipWriter`](super::ZipWriter) produces, but not streamed entries whose
//! sizes live in a trailing data descriptor.

use std::ops::Range;

use super::bytes::{decode_text, read_u16, read_u32};
use super::compression;
use super::crc32::crc32;
use super::{
    CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIGNATURE, LOCAL_FILE_HEADER_SIGNATURE,
    LOCAL_FILE_HEADER_SIZE, METHOD_DEFLATE, METHOD_STORED,
};
use crate::error::{Result, XlsxError};
use log::trace;

/// Entry discovered in a local file header
#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub compression_method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    /// Byte range of the (possibly compressed) payload within the archive
    pub data_range: Range<usize>,
}

/// Read-only view over an archive held in memory
pub struct ZipReader<'a> {
    data: &'a [u8],
    entries: Vec<ZipEntry>,
}

impl<'a> ZipReader<'a> {
    /// Scan `data` for local file headers.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let entries = Self::scan(data)?;
        Ok(ZipReader { data, entries })
    }

    /// Every discovered file name, in archive order.
    pub fn list_files(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// First entry named `path`.
    pub fn find_entry(&self, path: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == path)
    }

    /// Decoded bytes of `path`, or `None` when the archive has no such entry.
    pub fn get_file_bytes(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.find_entry(path) else {
            return Ok(None);
        };
        let raw = &self.data[entry.data_range.clone()];
        let data = match entry.compression_method {
            METHOD_STORED => raw.to_vec(),
            METHOD_DEFLATE => compression::inflate(raw)?,
            other => return Err(XlsxError::UnsupportedCompression(other)),
        };
        verify_crc(entry, &data)?;
        Ok(Some(data))
    }

    /// Text content of `path`, or `None` when the archive has no such entry.
    pub fn get_file(&self, path: &str) -> Result<Option<String>> {
        self.get_file_bytes(path)?.map(decode_text).transpose()
    }

    /// Suspending variant of [`get_file`](Self::get_file); inflation runs on
    /// the blocking pool.
    #[cfg(feature = "async")]
    pub async fn get_file_async(&self, path: &str) -> Result<Option<String>> {
        let Some(entry) = self.find_entry(path).cloned() else {
            return Ok(None);
        };
        let raw = self.data[entry.data_range.clone()].to_vec();
        let data = match entry.compression_method {
            METHOD_STORED => raw,
            METHOD_DEFLATE => compression::inflate_async(raw).await?,
            other => return Err(XlsxError::UnsupportedCompression(other)),
        };
        verify_crc(&entry, &data)?;
        decode_text(data).map(Some)
    }

    fn scan(data: &[u8]) -> Result<Vec<ZipEntry>> {
        let mut entries = Vec::new();
        let mut pos = 0usize;

        while pos + 4 <= data.len() {
            let signature = read_u32(data, pos)?;
            match signature {
                LOCAL_FILE_HEADER_SIGNATURE => {
                    let (entry, next) = Self::read_local_header(data, pos)?;
                    entries.push(entry);
                    pos = next;
                }
                CENTRAL_DIRECTORY_SIGNATURE | END_OF_CENTRAL_DIRECTORY_SIGNATURE => break,
                _ => {
                    trace!("zip: no signature at offset {}", pos);
                    pos += 1;
                }
            }
        }

        Ok(entries)
    }

    fn read_local_header(data: &[u8], pos: usize) -> Result<(ZipEntry, usize)> {
        if pos + LOCAL_FILE_HEADER_SIZE > data.len() {
            return Err(XlsxError::InvalidArchive(format!(
                "truncated local header at offset {}",
                pos
            )));
        }

        let compression_method = read_u16(data, pos + 8)?;
        let crc32 = read_u32(data, pos + 14)?;
        let compressed_size = read_u32(data, pos + 18)?;
        let uncompressed_size = read_u32(data, pos + 22)?;
        let name_len = read_u16(data, pos + 26)? as usize;
        let extra_len = read_u16(data, pos + 28)? as usize;

        let name_start = pos + LOCAL_FILE_HEADER_SIZE;
        let data_start = name_start + name_len + extra_len;
        let data_end = data_start + compressed_size as usize;
        if data_end > data.len() {
            return Err(XlsxError::InvalidArchive(format!(
                "entry at offset {} declares {} bytes past end of archive",
                pos, compressed_size
            )));
        }

        let name = String::from_utf8_lossy(&data[name_start..name_start + name_len]).into_owned();

        Ok((
            ZipEntry {
                name,
                compression_method,
                crc32,
                compressed_size,
                uncompressed_size,
                data_range: data_start..data_end,
            },
            data_end,
        ))
    }
}

fn verify_crc(entry: &ZipEntry, data: &[u8]) -> Result<()> {
    let actual = crc32(data);
    if actual != entry.crc32 {
        return Err(XlsxError::ChecksumMismatch {
            path: entry.name.clone(),
            expected: entry.crc32,
            actual,
        });
    }
    Ok(())
}
