//! Shared strings table for string deduplication

use super::xml_writer::XmlWriter;
use crate::error::Result;
use indexmap::IndexSet;
use std::io::Write;

const SPREADSHEETML_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Shared strings table that deduplicates strings across the workbook.
///
/// Indices are dense, zero-based and assigned in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: IndexSet<String>,
}

impl SharedStrings {
    pub fn new() -> Self {
        SharedStrings {
            strings: IndexSet::with_capacity(1000),
        }
    }

    /// Add a string and get its index
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(index) = self.strings.get_index_of(s) {
            return index as u32;
        }
        let (index, _) = self.strings.insert_full(s.to_string());
        index as u32
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get_index(index as usize).map(String::as_str)
    }

    pub fn index_of(&self, s: &str) -> Option<u32> {
        self.strings.get_index_of(s).map(|i| i as u32)
    }

    /// Get number of unique strings
    pub fn count(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }

    /// The ordered table, consuming the interner
    pub fn into_table(self) -> Vec<String> {
        self.strings.into_iter().collect()
    }

    /// Write shared strings XML
    pub fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        writer.declaration()?;

        writer.start_element("sst")?;
        writer.attribute("xmlns", SPREADSHEETML_NS)?;
        writer.attribute_int("count", self.strings.len() as i64)?;
        writer.attribute_int("uniqueCount", self.strings.len() as i64)?;
        writer.close_start_tag()?;

        for s in &self.strings {
            writer.start_element("si")?;
            writer.close_start_tag()?;

            writer.start_element("t")?;
            if needs_space_preserve(s) {
                writer.attribute("xml:space", "preserve")?;
            }
            writer.close_start_tag()?;
            writer.write_escaped(s)?;
            writer.end_element("t")?;

            writer.end_element("si")?;
        }

        writer.end_element("sst")?;
        writer.flush()?;
        Ok(())
    }

    /// Serialized `xl/sharedStrings.xml`
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(128 + self.strings.len() * 24);
        self.write_xml(&mut XmlWriter::new(&mut out))?;
        Ok(out)
    }
}

impl<S: Into<String>> FromIterator<S> for SharedStrings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        SharedStrings {
            strings: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn needs_space_preserve(s: &str) -> bool {
    s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace)
}
