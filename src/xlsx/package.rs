//! Path-addressed store of package parts
//!
//! The workbook writer fills a [`Package`] with its baseline parts. Callers
//! may then add parts, replace them, or splice XML into existing ones before
//! the store is zipped.

use indexmap::IndexMap;

use crate::error::Result;
use crate::zip::{compression, ZipWriter};

/// Insertion-ordered map from archive path to part contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    files: IndexMap<String, Vec<u8>>,
    compression_level: Option<u32>,
}

impl Package {
    pub fn new() -> Self {
        Package::default()
    }

    /// Store used with [`generate_compressed`](Self::generate_compressed)
    /// at DEFLATE level `level`.
    pub fn with_compression_level(level: u32) -> Self {
        Package {
            files: IndexMap::new(),
            compression_level: Some(level),
        }
    }

    /// Add a part. An existing part at `path` is replaced in place.
    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }

    /// Replace a part, returning the previous contents.
    pub fn set_file(
        &mut self,
        path: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Option<Vec<u8>> {
        self.files.insert(path.into(), data.into())
    }

    pub fn get_file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Part contents as UTF-8 text, or `None` if absent or not UTF-8.
    pub fn get_text(&self, path: &str) -> Option<&str> {
        self.get_file(path).and_then(|data| std::str::from_utf8(data).ok())
    }

    /// Remove a part, keeping the order of the others.
    pub fn remove_file(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.shift_remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Every `(path, contents)` pair in insertion order
    pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(path, data)| (path.as_str(), data.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Insert `fragment` immediately before the first occurrence of
    /// `closing_tag` in the part at `path`.
    ///
    /// Returns `false` if the part or the tag is missing.
    pub fn splice_before(&mut self, path: &str, closing_tag: &str, fragment: &str) -> bool {
        let Some(data) = self.files.get_mut(path) else {
            return false;
        };
        let Some(at) = find_bytes(data, closing_tag.as_bytes()) else {
            return false;
        };
        let tail = data.split_off(at);
        data.extend_from_slice(fragment.as_bytes());
        data.extend_from_slice(&tail);
        true
    }

    /// Hand every part to a [`ZipWriter`] without copying it.
    pub fn into_zip_writer(self) -> ZipWriter {
        let mut writer = match self.compression_level {
            Some(level) => ZipWriter::with_compression_level(level),
            None => ZipWriter::new(),
        };
        for (path, data) in self.files {
            writer.add_file(path, data);
        }
        writer
    }

    /// Zip every part with stored entries. The parts are copied; use
    /// [`into_zip_writer`](Self::into_zip_writer) when the package is no
    /// longer needed.
    pub fn generate(&self) -> Result<Vec<u8>> {
        self.clone().into_zip_writer().generate()
    }

    /// Zip every part with DEFLATE entries.
    ///
    /// Fails with [`XlsxError::CompressionUnavailable`](crate::XlsxError::CompressionUnavailable)
    /// when [`compression::supports_compression`] is false.
    pub fn generate_compressed(&self) -> Result<Vec<u8>> {
        self.clone().into_zip_writer().generate_compressed()
    }

    /// [`generate_compressed`](Self::generate_compressed) on the blocking pool.
    #[cfg(feature = "async")]
    pub async fn generate_compressed_async(self) -> Result<Vec<u8>> {
        self.into_zip_writer().generate_compressed_async().await
    }

    pub fn supports_compression() -> bool {
        compression::supports_compression()
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::ZipReader;

    #[test]
    fn test_store_operations() {
        let mut package = Package::new();
        package.add_file("a.xml", "<a/>");
        package.add_file("b.xml", "<b/>");
        package.add_file("c.xml", "<c/>");

        assert_eq!(package.len(), 3);
        assert!(package.contains("b.xml"));
        assert_eq!(package.get_text("a.xml"), Some("<a/>"));

        let old = package.set_file("a.xml", "<a2/>");
        assert_eq!(old.as_deref(), Some(&b"<a/>"[..]));
        assert_eq!(package.remove_file("b.xml").as_deref(), Some(&b"<b/>"[..]));

        // replacing keeps position, removal keeps the rest in order
        assert_eq!(package.paths().collect::<Vec<_>>(), vec!["a.xml", "c.xml"]);
        assert_eq!(package.get_file("missing"), None);
    }

    #[test]
    fn test_get_text_rejects_binary() {
        let mut package = Package::new();
        package.add_file("image.bin", vec![0xff, 0xfe, 0x00]);
        assert!(package.get_file("image.bin").is_some());
        assert_eq!(package.get_text("image.bin"), None);
    }

    #[test]
    fn test_splice_before_closing_tag() {
        let mut package = Package::new();
        package.add_file("sheet.xml", "<worksheet><sheetData></sheetData></worksheet>");

        assert!(package.splice_before("sheet.xml", "</worksheet>", "<drawing r:id=\"rId1\"/>"));
        assert_eq!(
            package.get_text("sheet.xml"),
            Some("<worksheet><sheetData></sheetData><drawing r:id=\"rId1\"/></worksheet>")
        );
        assert!(!package.splice_before("sheet.xml", "</missing>", "x"));
        assert!(!package.splice_before("nope.xml", "</worksheet>", "x"));
    }

    #[test]
    fn test_generate_round_trip() {
        let mut package = Package::new();
        package.add_file("hello.txt", "Hello");
        package.add_file("dir/world.txt", "World");

        let bytes = package.generate().unwrap();
        let reader = ZipReader::new(&bytes).unwrap();
        assert_eq!(reader.list_files(), vec!["hello.txt", "dir/world.txt"]);
        assert_eq!(reader.get_file("dir/world.txt").unwrap().as_deref(), Some("World"));
    }

    #[test]
    fn test_into_zip_writer_moves_parts_in_order() {
        let mut package = Package::new();
        package.add_file("[Content_Types].xml", "<Types/>");
        package.add_file("xl/workbook.xml", "<workbook/>");
        package.set_file("[Content_Types].xml", "<Types></Types>");

        let zip = package.into_zip_writer();
        assert_eq!(zip.file_count(), 2);
        let bytes = zip.generate().unwrap();
        let reader = ZipReader::new(&bytes).unwrap();
        assert_eq!(reader.list_files(), vec!["[Content_Types].xml", "xl/workbook.xml"]);
        assert_eq!(
            reader.get_file("[Content_Types].xml").unwrap().as_deref(),
            Some("<Types></Types>")
        );
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn test_generate_compressed_round_trip() {
        let mut package = Package::with_compression_level(9);
        package.add_file("big.txt", "repeat ".repeat(500));

        let bytes = package.generate_compressed().unwrap();
        assert!(bytes.len() < 3500);
        let reader = ZipReader::new(&bytes).unwrap();
        assert_eq!(reader.get_file("big.txt").unwrap(), Some("repeat ".repeat(500)));
    }
}
