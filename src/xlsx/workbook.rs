//! Workbook assembly
//!
//! [`XlsxWriter`] collects worksheets, renders them (sequentially or through
//! the parallel task engine), and lays the resulting parts out in a
//! [`Package`] ready to be zipped.

use std::collections::HashSet;
use std::path::Path;

use log::debug;

use super::package::Package;
use super::parallel::generate_parallel;
use super::shared_strings::SharedStrings;
use super::streaming::WorksheetStream;
use super::styles::STYLES_XML;
use super::worksheet::write_worksheet;
use super::xml_writer::XmlWriter;
use crate::config::WriterOptions;
use crate::error::{Result, XlsxError};
use crate::types::{Cell, Worksheet};

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub const ROOT_RELS_PATH: &str = "_rels/.rels";
pub const WORKBOOK_PATH: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
pub const STYLES_PATH: &str = "xl/styles.xml";
pub const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

const SPREADSHEETML_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

/// Archive path of the 1-based `n`th worksheet
pub fn worksheet_path(n: usize) -> String {
    format!("xl/worksheets/sheet{}.xml", n)
}

/// Builds XLSX workbooks in memory
///
/// ```
/// use zipsheet::xlsx::{read, XlsxWriter};
///
/// let mut writer = XlsxWriter::new();
/// writer.add_worksheet("People", vec![
///     vec!["Name".into(), "Age".into()],
///     vec!["Alice".into(), 30.into()],
/// ]);
/// let bytes = writer.generate().unwrap();
///
/// let workbook = read(&bytes).unwrap();
/// assert_eq!(workbook.sheets[0].name, "People");
/// ```
#[derive(Debug, Clone, Default)]
pub struct XlsxWriter {
    worksheets: Vec<Worksheet>,
    options: WriterOptions,
}

impl XlsxWriter {
    pub fn new() -> Self {
        XlsxWriter::default()
    }

    pub fn with_options(options: WriterOptions) -> Self {
        XlsxWriter {
            worksheets: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Append a worksheet and return it for further layout settings.
    pub fn add_worksheet(
        &mut self,
        name: impl Into<String>,
        rows: Vec<Vec<Cell>>,
    ) -> &mut Worksheet {
        self.push_worksheet(Worksheet::new(name, rows))
    }

    pub fn add_worksheet_with_widths(
        &mut self,
        name: impl Into<String>,
        rows: Vec<Vec<Cell>>,
        column_widths: Vec<f64>,
    ) -> &mut Worksheet {
        self.push_worksheet(Worksheet::new(name, rows).with_column_widths(column_widths))
    }

    pub fn push_worksheet(&mut self, worksheet: Worksheet) -> &mut Worksheet {
        self.worksheets.push(worksheet);
        let last = self.worksheets.len() - 1;
        &mut self.worksheets[last]
    }

    pub fn worksheets(&self) -> &[Worksheet] {
        &self.worksheets
    }

    /// Baseline parts for every worksheet added so far.
    ///
    /// Goes through the parallel task engine once the sheet count reaches
    /// [`WriterOptions::parallel_threshold`]. Both paths produce the same
    /// parts.
    pub fn package(&self) -> Result<Package> {
        if self.options.use_parallel(self.worksheets.len()) {
            self.package_parallel()
        } else {
            self.package_sequential()
        }
    }

    /// Render sheets one after another against a single table.
    pub fn package_sequential(&self) -> Result<Package> {
        validate_sheet_names(self.worksheets.iter().map(|ws| ws.name.as_str()))?;

        let mut strings = SharedStrings::new();
        let sheets: Vec<Vec<u8>> = self
            .worksheets
            .iter()
            .map(|ws| write_worksheet(ws, &mut strings))
            .collect();

        self.assemble(sheets, &strings)
    }

    /// Render sheets as independent tasks, then merge their tables.
    pub fn package_parallel(&self) -> Result<Package> {
        validate_sheet_names(self.worksheets.iter().map(|ws| ws.name.as_str()))?;

        let (sheets, strings) = generate_parallel(&self.worksheets)?;
        self.assemble(sheets, &strings)
    }

    fn assemble(&self, sheets: Vec<Vec<u8>>, strings: &SharedStrings) -> Result<Package> {
        let names: Vec<&str> = self.worksheets.iter().map(|ws| ws.name.as_str()).collect();
        let package = build_package(
            &names,
            sheets,
            strings,
            self.options.compression.level(),
        )?;
        debug!(
            "Packaged {} worksheets with {} shared strings",
            names.len(),
            strings.count()
        );
        Ok(package)
    }

    /// XLSX bytes with stored entries.
    pub fn generate(&self) -> Result<Vec<u8>> {
        self.package()?.into_zip_writer().generate()
    }

    /// XLSX bytes with DEFLATE entries at the configured level.
    pub fn generate_compressed(&self) -> Result<Vec<u8>> {
        self.package()?.into_zip_writer().generate_compressed()
    }

    /// [`generate_compressed`](Self::generate_compressed) on the blocking pool.
    #[cfg(feature = "async")]
    pub async fn generate_compressed_async(self) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || self.generate_compressed()).await?
    }

    /// Write the workbook to `path`, compressed when DEFLATE is available.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = if Package::supports_compression() {
            self.generate_compressed()?
        } else {
            self.generate()?
        };
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Single-sheet package whose worksheet part is produced by
    /// [`WorksheetStream`], pulling rows from `rows` as it goes.
    pub fn package_streamed<I, R>(&self, name: &str, rows: I) -> Result<Package>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Cell]>,
    {
        validate_sheet_names([name])?;

        let mut strings = SharedStrings::new();
        let mut sheet = Vec::new();
        for chunk in WorksheetStream::new(rows, &mut strings) {
            sheet.extend_from_slice(&chunk);
        }

        build_package(&[name], vec![sheet], &strings, self.options.compression.level())
    }
}

/// Reject names Excel would refuse: empty, longer than 31 characters,
/// containing `[]:*?/\`, or equal (ignoring case) to an earlier name.
pub fn validate_sheet_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty()
            || name.chars().count() > MAX_SHEET_NAME_LEN
            || name.contains(&FORBIDDEN_SHEET_NAME_CHARS[..])
            || !seen.insert(name.to_lowercase())
        {
            return Err(XlsxError::InvalidSheetName(name.to_string()));
        }
    }
    Ok(())
}

fn build_package(
    names: &[&str],
    sheets: Vec<Vec<u8>>,
    strings: &SharedStrings,
    compression_level: u32,
) -> Result<Package> {
    let mut package = Package::with_compression_level(compression_level);

    package.add_file(CONTENT_TYPES_PATH, content_types_xml(names.len())?);
    package.add_file(ROOT_RELS_PATH, ROOT_RELS_XML);
    package.add_file(WORKBOOK_PATH, workbook_xml(names)?);
    package.add_file(WORKBOOK_RELS_PATH, workbook_rels_xml(names.len())?);
    package.add_file(STYLES_PATH, STYLES_XML);
    package.add_file(SHARED_STRINGS_PATH, strings.to_xml()?);
    for (i, sheet) in sheets.into_iter().enumerate() {
        package.add_file(worksheet_path(i + 1), sheet);
    }

    Ok(package)
}

fn content_types_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(1024 + sheet_count * 160);
    let mut xml = XmlWriter::new(&mut out);

    xml.declaration()?;
    xml.start_element("Types")?;
    xml.attribute("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")?;
    xml.close_start_tag()?;

    for (extension, content_type) in [
        ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
        ("xml", "application/xml"),
    ] {
        xml.start_element("Default")?;
        xml.attribute("Extension", extension)?;
        xml.attribute("ContentType", content_type)?;
        xml.close_empty()?;
    }

    let mut overrides = vec![(
        format!("/{}", WORKBOOK_PATH),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
    )];
    overrides.extend(
        (1..=sheet_count).map(|n| (format!("/{}", worksheet_path(n)), WORKSHEET_CONTENT_TYPE)),
    );
    overrides.push((
        format!("/{}", STYLES_PATH),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
    ));
    overrides.push((
        format!("/{}", SHARED_STRINGS_PATH),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml",
    ));

    for (part, content_type) in &overrides {
        xml.start_element("Override")?;
        xml.attribute("PartName", part)?;
        xml.attribute("ContentType", content_type)?;
        xml.close_empty()?;
    }

    xml.end_element("Types")?;
    xml.flush()?;
    drop(xml);
    Ok(out)
}

fn workbook_xml(names: &[&str]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(512 + names.len() * 64);
    let mut xml = XmlWriter::new(&mut out);

    xml.declaration()?;
    xml.start_element("workbook")?;
    xml.attribute("xmlns", SPREADSHEETML_NS)?;
    xml.attribute("xmlns:r", RELATIONSHIPS_NS)?;
    xml.close_start_tag()?;

    xml.start_element("sheets")?;
    xml.close_start_tag()?;
    for (i, name) in names.iter().enumerate() {
        let sheet_id = i + 1;
        xml.start_element("sheet")?;
        xml.attribute("name", name)?;
        xml.attribute_int("sheetId", sheet_id as i64)?;
        xml.attribute("r:id", &format!("rId{}", sheet_id))?;
        xml.close_empty()?;
    }
    xml.end_element("sheets")?;

    xml.end_element("workbook")?;
    xml.flush()?;
    drop(xml);
    Ok(out)
}

/// Sheets take `rId1..=rIdN`, then styles and shared strings follow.
fn workbook_rels_xml(sheet_count: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(512 + sheet_count * 160);
    let mut xml = XmlWriter::new(&mut out);

    xml.declaration()?;
    xml.start_element("Relationships")?;
    xml.attribute("xmlns", PACKAGE_RELATIONSHIPS_NS)?;
    xml.close_start_tag()?;

    let mut relationship = |id: usize, kind: &str, target: &str| -> Result<()> {
        xml.start_element("Relationship")?;
        xml.attribute("Id", &format!("rId{}", id))?;
        xml.attribute("Type", &format!("{}/{}", RELATIONSHIPS_NS, kind))?;
        xml.attribute("Target", target)?;
        xml.close_empty()
    };

    for n in 1..=sheet_count {
        relationship(n, "worksheet", &format!("worksheets/sheet{}.xml", n))?;
    }
    relationship(sheet_count + 1, "styles", "styles.xml")?;
    relationship(sheet_count + 2, "sharedStrings", "sharedStrings.xml")?;

    xml.end_element("Relationships")?;
    xml.flush()?;
    drop(xml);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriterOptions;

    fn people() -> Vec<Vec<Cell>> {
        vec![
            vec!["Name".into(), "Age".into()],
            vec!["Alice".into(), 30.into()],
        ]
    }

    #[cfg(not(feature = "deflate"))]
    #[test]
    fn test_compressed_without_backend_fails() {
        let mut writer = XlsxWriter::new();
        writer.add_worksheet("People", people());
        assert!(matches!(
            writer.generate_compressed(),
            Err(XlsxError::CompressionUnavailable)
        ));
        assert!(writer.generate().is_ok());
    }

    #[test]
    fn test_baseline_parts() {
        let mut writer = XlsxWriter::new();
        writer.add_worksheet("People", people());
        writer.add_worksheet("Empty", vec![]);
        let package = writer.package().unwrap();

        assert_eq!(
            package.paths().collect::<Vec<_>>(),
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/workbook.xml",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/sharedStrings.xml",
                "xl/worksheets/sheet1.xml",
                "xl/worksheets/sheet2.xml",
            ]
        );

        let types = package.get_text(CONTENT_TYPES_PATH).unwrap();
        assert!(types.contains("PartName=\"/xl/worksheets/sheet2.xml\""));
        assert!(types.contains("PartName=\"/xl/sharedStrings.xml\""));

        let workbook = package.get_text(WORKBOOK_PATH).unwrap();
        assert!(workbook.contains("<sheet name=\"People\" sheetId=\"1\" r:id=\"rId1\"/>"));
        assert!(workbook.contains("<sheet name=\"Empty\" sheetId=\"2\" r:id=\"rId2\"/>"));

        let rels = package.get_text(WORKBOOK_RELS_PATH).unwrap();
        assert!(rels.contains(&format!(
            "Id=\"rId2\" Type=\"{}/worksheet\" Target=\"worksheets/sheet2.xml\"",
            RELATIONSHIPS_NS
        )));
        assert!(rels.contains(&format!("Id=\"rId3\" Type=\"{}/styles\"", RELATIONSHIPS_NS)));
        assert!(rels.contains(&format!(
            "Id=\"rId4\" Type=\"{}/sharedStrings\"",
            RELATIONSHIPS_NS
        )));

        let empty = package.get_text("xl/worksheets/sheet2.xml").unwrap();
        assert!(empty.contains("<sheetData></sheetData>"));
    }

    #[test]
    fn test_sheet_names_are_escaped() {
        let mut writer = XlsxWriter::new();
        writer.add_worksheet("R&D \"Q1\"", people());
        let package = writer.package().unwrap();
        let workbook = package.get_text(WORKBOOK_PATH).unwrap();
        assert!(workbook.contains("name=\"R&amp;D &quot;Q1&quot;\""));
    }

    #[test]
    fn test_sheet_name_validation() {
        assert!(validate_sheet_names(["Data", "Summary"]).is_ok());
        for bad in ["", "a/b", "what?", "[x]", "x".repeat(32).as_str()] {
            assert!(
                matches!(validate_sheet_names([bad]), Err(XlsxError::InvalidSheetName(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(validate_sheet_names(["Data", "DATA"]).is_err());
        assert!(validate_sheet_names(["ünïcödé".repeat(4).as_str()]).is_ok());

        let mut writer = XlsxWriter::new();
        writer.add_worksheet("Dup", vec![]);
        writer.add_worksheet("dup", vec![]);
        assert!(writer.generate().is_err());
    }

    #[test]
    fn test_parallel_and_sequential_packages_match() {
        let mut writer =
            XlsxWriter::with_options(WriterOptions::default().with_parallel_threshold(0));
        for s in 0..4 {
            let rows = (0..20)
                .map(|r| {
                    vec![
                        Cell::from(format!("s{}r{}", s, r % 3)),
                        Cell::from("common"),
                        Cell::from(r),
                    ]
                })
                .collect();
            writer.add_worksheet(format!("Sheet{}", s), rows);
        }

        let sequential = writer.package_sequential().unwrap();
        let parallel = writer.package_parallel().unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_streamed_package_matches_batch() {
        let writer = XlsxWriter::new();
        let rows = people();
        let streamed = writer.package_streamed("People", rows.iter()).unwrap();

        let mut batch = XlsxWriter::new();
        batch.add_worksheet("People", rows);
        assert_eq!(streamed, batch.package().unwrap());
    }

    #[test]
    fn test_layout_settings_through_writer() {
        let mut writer = XlsxWriter::new();
        writer
            .add_worksheet_with_widths("Wide", people(), vec![30.0])
            .freeze(1, 0)
            .merge(0, 0, 0, 1);
        let package = writer.package().unwrap();
        let sheet = package.get_text("xl/worksheets/sheet1.xml").unwrap();
        assert!(sheet.contains("<col min=\"1\" max=\"1\" width=\"30\" customWidth=\"1\"/>"));
        assert!(sheet.contains("activePane=\"bottomLeft\""));
        assert!(sheet.contains("<mergeCell ref=\"A1:B1\"/>"));
    }
}
