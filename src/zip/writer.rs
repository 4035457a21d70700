//! In-memory ZIP writer
//!
//! Archives are produced in two passes. The size pass computes each entry's
//! CRC32, payload (stored or deflated) and local-header offset; the assembly
//! pass then writes local headers, the central directory and the end record
//! into a buffer allocated once at the final size.

use super::bytes::{dos_now, put_u16, put_u32};
use super::compression::{self, DEFAULT_LEVEL};
use super::crc32::crc32;
use super::{
    FileEntry, CENTRAL_DIRECTORY_HEADER_SIZE, CENTRAL_DIRECTORY_SIGNATURE,
    END_OF_CENTRAL_DIRECTORY_SIGNATURE, END_OF_CENTRAL_DIRECTORY_SIZE, FLAG_UTF8_NAME,
    LOCAL_FILE_HEADER_SIGNATURE, LOCAL_FILE_HEADER_SIZE, METHOD_DEFLATE, METHOD_STORED,
    ZIP_VERSION,
};
use crate::error::{Result, XlsxError};
use log::debug;

/// Per-entry layout computed during the size pass.
struct FileData<'a> {
    file_name: &'a [u8],
    crc: u32,
    data: &'a [u8],
    compressed_data: Option<Vec<u8>>,
    offset: u32,
    compression_method: u16,
}

impl FileData<'_> {
    fn payload(&self) -> &[u8] {
        self.compressed_data.as_deref().unwrap_or(self.data)
    }

    fn flags(&self) -> u16 {
        if self.file_name.is_ascii() {
            0
        } else {
            FLAG_UTF8_NAME
        }
    }
}

/// Collects files and serializes them into a single-disk ZIP archive.
#[derive(Debug, Clone)]
pub struct ZipWriter {
    files: Vec<FileEntry>,
    compression_level: u32,
}

impl ZipWriter {
    pub fn new() -> Self {
        ZipWriter {
            files: Vec::new(),
            compression_level: DEFAULT_LEVEL,
        }
    }

    /// Writer whose compressed output uses `level` (clamped to 0..=9).
    pub fn with_compression_level(level: u32) -> Self {
        ZipWriter {
            files: Vec::new(),
            compression_level: level.min(9),
        }
    }

    /// Append a file. Entries keep insertion order in the archive.
    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.push(FileEntry::new(path, data));
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Build the archive with every entry stored (method 0).
    pub fn generate(&self) -> Result<Vec<u8>> {
        let layout = self.size_pass(|_| Ok(None))?;
        self.assemble(layout)
    }

    /// Build the archive with every entry deflated (method 8).
    ///
    /// Fails with [`XlsxError::CompressionUnavailable`] when the build has
    /// no DEFLATE backend; it never falls back to stored output.
    pub fn generate_compressed(&self) -> Result<Vec<u8>> {
        if !compression::supports_compression() {
            return Err(XlsxError::CompressionUnavailable);
        }
        let level = self.compression_level;
        let layout = self.size_pass(|data| compression::deflate_with_level(data, level).map(Some))?;
        self.assemble(layout)
    }

    /// Suspending variant of [`generate_compressed`](Self::generate_compressed).
    #[cfg(feature = "async")]
    pub async fn generate_compressed_async(self) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || self.generate_compressed()).await?
    }

    fn size_pass<F>(&self, mut compress: F) -> Result<(Vec<FileData<'_>>, usize)>
    where
        F: FnMut(&[u8]) -> Result<Option<Vec<u8>>>,
    {
        if self.files.len() > u16::MAX as usize {
            return Err(XlsxError::LimitExceeded(format!(
                "{} entries (maximum {})",
                self.files.len(),
                u16::MAX
            )));
        }

        let mut entries = Vec::with_capacity(self.files.len());
        let mut offset: u64 = 0;
        let mut central_size: u64 = 0;

        for file in &self.files {
            let file_name = file.path.as_bytes();
            if file_name.len() > u16::MAX as usize {
                return Err(XlsxError::LimitExceeded(format!(
                    "file name of {} bytes",
                    file_name.len()
                )));
            }
            if file.data.len() > u32::MAX as usize {
                return Err(XlsxError::LimitExceeded(format!(
                    "'{}' is larger than 4 GiB",
                    file.path
                )));
            }

            let crc = crc32(&file.data);
            let compressed_data = compress(&file.data)?;
            let compression_method = if compressed_data.is_some() {
                METHOD_DEFLATE
            } else {
                METHOD_STORED
            };

            let entry = FileData {
                file_name,
                crc,
                data: &file.data,
                compressed_data,
                offset: u32::try_from(offset).map_err(|_| {
                    XlsxError::LimitExceeded(format!("offset of '{}' beyond 4 GiB", file.path))
                })?,
                compression_method,
            };

            offset += (LOCAL_FILE_HEADER_SIZE + file_name.len() + entry.payload().len()) as u64;
            central_size += (CENTRAL_DIRECTORY_HEADER_SIZE + file_name.len()) as u64;
            entries.push(entry);
        }

        let total = offset + central_size + END_OF_CENTRAL_DIRECTORY_SIZE as u64;
        if offset > u32::MAX as u64 || central_size > u32::MAX as u64 {
            return Err(XlsxError::LimitExceeded(format!(
                "archive of {} bytes",
                total
            )));
        }

        Ok((entries, total as usize))
    }

    fn assemble(&self, (entries, total): (Vec<FileData<'_>>, usize)) -> Result<Vec<u8>> {
        let (time, date) = dos_now();
        let mut out = Vec::with_capacity(total);

        for entry in &entries {
            let payload = entry.payload();
            put_u32(&mut out, LOCAL_FILE_HEADER_SIGNATURE);
            put_u16(&mut out, ZIP_VERSION); // version needed
            put_u16(&mut out, entry.flags());
            put_u16(&mut out, entry.compression_method);
            put_u16(&mut out, time);
            put_u16(&mut out, date);
            put_u32(&mut out, entry.crc);
            put_u32(&mut out, payload.len() as u32);
            put_u32(&mut out, entry.data.len() as u32);
            put_u16(&mut out, entry.file_name.len() as u16);
            put_u16(&mut out, 0); // extra len
            out.extend_from_slice(entry.file_name);
            out.extend_from_slice(payload);
        }

        let central_dir_offset = out.len();

        for entry in &entries {
            put_u32(&mut out, CENTRAL_DIRECTORY_SIGNATURE);
            put_u16(&mut out, ZIP_VERSION); // version made by
            put_u16(&mut out, ZIP_VERSION); // version needed
            put_u16(&mut out, entry.flags());
            put_u16(&mut out, entry.compression_method);
            put_u16(&mut out, time);
            put_u16(&mut out, date);
            put_u32(&mut out, entry.crc);
            put_u32(&mut out, entry.payload().len() as u32);
            put_u32(&mut out, entry.data.len() as u32);
            put_u16(&mut out, entry.file_name.len() as u16);
            put_u16(&mut out, 0); // extra len
            put_u16(&mut out, 0); // file comment len
            put_u16(&mut out, 0); // disk number start
            put_u16(&mut out, 0); // internal attrs
            put_u32(&mut out, 0); // external attrs
            put_u32(&mut out, entry.offset);
            out.extend_from_slice(entry.file_name);
        }

        let central_dir_size = out.len() - central_dir_offset;

        put_u32(&mut out, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        put_u16(&mut out, 0); // disk number
        put_u16(&mut out, 0); // disk with central dir
        put_u16(&mut out, entries.len() as u16);
        put_u16(&mut out, entries.len() as u16);
        put_u32(&mut out, central_dir_size as u32);
        put_u32(&mut out, central_dir_offset as u32);
        put_u16(&mut out, 0); // comment len

        debug_assert_eq!(out.len(), total);
        debug!(
            "zip: wrote {} entries, {} bytes ({} central directory)",
            entries.len(),
            out.len(),
            central_dir_size
        );
        Ok(out)
    }
}

impl Default for ZipWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::bytes::{read_u16, read_u32};

    #[test]
    fn test_empty_archive() {
        let bytes = ZipWriter::new().generate().unwrap();
        assert_eq!(bytes.len(), 22);
        assert_eq!(read_u32(&bytes, 0).unwrap(), END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        assert!(bytes[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_entry_count_limit() {
        let mut zip = ZipWriter::new();
        for i in 0..=u16::MAX as usize {
            zip.add_file(format!("{}", i), Vec::new());
        }
        assert_eq!(zip.file_count(), 65_536);
        assert!(matches!(zip.generate(), Err(XlsxError::LimitExceeded(_))));
    }

    #[cfg(not(feature = "deflate"))]
    #[test]
    fn test_compressed_without_backend_fails() {
        let mut zip = ZipWriter::new();
        zip.add_file("a.txt", "Hello");
        assert!(matches!(
            zip.generate_compressed(),
            Err(XlsxError::CompressionUnavailable)
        ));
        // stored output is unaffected
        assert!(zip.generate().is_ok());
    }

    #[test]
    fn test_stored_layout() {
        let mut zip = ZipWriter::new();
        zip.add_file("a.txt", "Hello");
        zip.add_file("dir/b.txt", "World!");
        let bytes = zip.generate().unwrap();

        let first = 30 + 5 + 5;
        let second = 30 + 9 + 6;
        let central = (46 + 5) + (46 + 9);
        assert_eq!(bytes.len(), first + second + central + 22);

        // second local header starts right after the first entry
        assert_eq!(read_u32(&bytes, first).unwrap(), LOCAL_FILE_HEADER_SIGNATURE);
        assert_eq!(read_u32(&bytes, 14).unwrap(), crc32(b"Hello"));
        assert_eq!(read_u16(&bytes, 8).unwrap(), METHOD_STORED);

        let cd = first + second;
        assert_eq!(read_u32(&bytes, cd).unwrap(), CENTRAL_DIRECTORY_SIGNATURE);
        assert_eq!(read_u32(&bytes, cd + 42).unwrap(), 0);
        let cd2 = cd + 46 + 5;
        assert_eq!(read_u32(&bytes, cd2 + 42).unwrap(), first as u32);

        let eocd = cd + central;
        assert_eq!(read_u32(&bytes, eocd).unwrap(), END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        assert_eq!(read_u16(&bytes, eocd + 10).unwrap(), 2);
        assert_eq!(read_u32(&bytes, eocd + 12).unwrap(), central as u32);
        assert_eq!(read_u32(&bytes, eocd + 16).unwrap(), cd as u32);
    }

    #[test]
    fn test_utf8_name_flag() {
        let mut zip = ZipWriter::new();
        zip.add_file("données.txt", "x");
        let bytes = zip.generate().unwrap();
        assert_eq!(read_u16(&bytes, 6).unwrap(), FLAG_UTF8_NAME);
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn test_compressed_layout() {
        let body = "row,".repeat(500);
        let mut zip = ZipWriter::new();
        zip.add_file("data.csv", body.as_bytes());
        let bytes = zip.generate_compressed().unwrap();

        assert_eq!(read_u16(&bytes, 8).unwrap(), METHOD_DEFLATE);
        let compressed = read_u32(&bytes, 18).unwrap() as usize;
        let uncompressed = read_u32(&bytes, 22).unwrap() as usize;
        assert_eq!(uncompressed, body.len());
        assert!(compressed < uncompressed);
        // CRC is over the uncompressed bytes
        assert_eq!(read_u32(&bytes, 14).unwrap(), crc32(body.as_bytes()));
    }
}
