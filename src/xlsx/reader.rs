//! XLSX read path
//!
//! Recovers sheet names, cell values, formulas, column widths, row heights
//! and (on request) resolved cell styles from an archive. Parts are located
//! through the workbook relationships, so workbooks whose sheet parts are
//! not named `sheetN.xml` still read correctly.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::columns::parse_cell_reference;
use super::styles::{parse_styles, resolve_style};
use super::workbook::{
    worksheet_path, SHARED_STRINGS_PATH, STYLES_PATH, WORKBOOK_PATH, WORKBOOK_RELS_PATH,
};
use super::xml::{section, Element, ElementScanner};
use crate::error::{Result, XlsxError};
use crate::style::ParsedStyles;
use crate::types::{
    CellValue, ParsedCell, ParsedSheet, StyledSheet, WorkbookData, WorkbookDataWithStyles,
};
use crate::zip::ZipReader;

/// Excel's column count (`A`..`XFD`); bounds `<col>` ranges and cell references
const MAX_COLUMNS: u32 = 16_384;

/// Excel's row count
const MAX_ROWS: u32 = 1_048_576;

/// Read every sheet's values.
pub fn read(data: &[u8]) -> Result<WorkbookData> {
    let zip = ZipReader::new(data)?;
    load_parts(&zip, false)?.into_workbook()
}

/// Read every sheet's values, formulas and resolved styles.
pub fn read_with_styles(data: &[u8]) -> Result<WorkbookDataWithStyles> {
    let zip = ZipReader::new(data)?;
    load_parts(&zip, true)?.into_styled_workbook()
}

/// Suspending variant of [`read`]; the whole parse runs on the blocking pool
/// over a copy of `data`.
#[cfg(feature = "async")]
pub async fn read_async(data: &[u8]) -> Result<WorkbookData> {
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || read(&data)).await?
}

/// Suspending variant of [`read_with_styles`].
#[cfg(feature = "async")]
pub async fn read_with_styles_async(data: &[u8]) -> Result<WorkbookDataWithStyles> {
    let data = data.to_vec();
    tokio::task::spawn_blocking(move || read_with_styles(&data)).await?
}

/// A `<sheet>` entry of the workbook and the part that holds it
#[derive(Debug, Clone, PartialEq)]
struct SheetRef {
    name: String,
    path: String,
}

/// Decoded text of every part the reader needs
struct Parts {
    shared_strings: Vec<String>,
    styles: Option<ParsedStyles>,
    sheets: Vec<(String, String)>,
}

fn load_parts(zip: &ZipReader<'_>, with_styles: bool) -> Result<Parts> {
    let workbook = zip
        .get_file(WORKBOOK_PATH)?
        .ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PATH.to_string()))?;
    let rels = zip.get_file(WORKBOOK_RELS_PATH)?;

    let shared_strings = zip
        .get_file(SHARED_STRINGS_PATH)?
        .map(|xml| parse_shared_strings(&xml))
        .unwrap_or_default();

    let styles = if with_styles {
        zip.get_file(STYLES_PATH)?.map(|xml| parse_styles(&xml))
    } else {
        None
    };

    let mut sheets = Vec::new();
    for sheet in sheet_refs(&workbook, rels.as_deref()) {
        let xml = zip
            .get_file(&sheet.path)?
            .ok_or_else(|| XlsxError::MissingPart(sheet.path.clone()))?;
        sheets.push((sheet.name, xml));
    }

    Ok(Parts {
        shared_strings,
        styles,
        sheets,
    })
}

impl Parts {
    fn into_workbook(self) -> Result<WorkbookData> {
        let sheets = self
            .sheets
            .iter()
            .map(|(name, xml)| {
                let raw = parse_worksheet(xml, &self.shared_strings)?;
                Ok(ParsedSheet {
                    name: name.clone(),
                    data: raw
                        .rows
                        .into_iter()
                        .map(|row| row.into_iter().map(|cell| cell.value).collect())
                        .collect(),
                    column_widths: raw.column_widths,
                    row_heights: raw.row_heights,
                })
            })
            .collect::<Result<Vec<ParsedSheet>>>()?;

        debug!("Read {} sheets", sheets.len());
        Ok(WorkbookData { sheets })
    }

    fn into_styled_workbook(self) -> Result<WorkbookDataWithStyles> {
        let styles = self.styles.unwrap_or_default();
        let sheets = self
            .sheets
            .iter()
            .map(|(name, xml)| {
                let raw = parse_worksheet(xml, &self.shared_strings)?;
                Ok(StyledSheet {
                    name: name.clone(),
                    data: raw
                        .rows
                        .into_iter()
                        .map(|row| {
                            row.into_iter()
                                .map(|cell| ParsedCell {
                                    value: cell.value,
                                    style: cell.style.and_then(|s| resolve_style(s, &styles)),
                                    formula: cell.formula,
                                })
                                .collect()
                        })
                        .collect(),
                    column_widths: raw.column_widths,
                    row_heights: raw.row_heights,
                })
            })
            .collect::<Result<Vec<StyledSheet>>>()?;

        debug!("Read {} styled sheets", sheets.len());
        Ok(WorkbookDataWithStyles { sheets })
    }
}

/// One string per `<si>`; rich-text runs are concatenated.
pub(crate) fn parse_shared_strings(xml: &str) -> Vec<String> {
    ElementScanner::new(xml, "si")
        .map(|si| si.children("t").map(|t| t.text()).collect::<String>())
        .collect()
}

/// Sheets in workbook order, each mapped to its part through the
/// relationships file, or to `xl/worksheets/sheet{N}.xml` without one.
fn sheet_refs(workbook: &str, rels: Option<&str>) -> Vec<SheetRef> {
    let targets: BTreeMap<String, String> = rels
        .map(|rels| {
            ElementScanner::new(rels, "Relationship")
                .filter_map(|rel| {
                    let id = rel.attr("Id")?.into_owned();
                    let target = rel.attr("Target")?;
                    Some((id, resolve_target(&target)))
                })
                .collect()
        })
        .unwrap_or_default();

    ElementScanner::new(section(workbook, "sheets"), "sheet")
        .enumerate()
        .filter_map(|(i, sheet)| {
            let name = sheet.attr("name")?.into_owned();
            let path = match sheet.attr("r:id").and_then(|id| targets.get(id.as_ref()).cloned()) {
                Some(path) => path,
                None => {
                    let fallback = worksheet_path(i + 1);
                    warn!(
                        "Sheet '{}' has no relationship target, falling back to {}",
                        name, fallback
                    );
                    fallback
                }
            };
            Some(SheetRef { name, path })
        })
        .collect()
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

#[derive(Debug, Default)]
struct RawCell {
    value: CellValue,
    style: Option<u32>,
    formula: Option<String>,
}

#[derive(Debug, Default)]
struct RawSheet {
    rows: Vec<Vec<RawCell>>,
    column_widths: Option<BTreeMap<u32, f64>>,
    row_heights: Option<BTreeMap<u32, f64>>,
}

fn parse_worksheet(xml: &str, shared_strings: &[String]) -> Result<RawSheet> {
    let mut widths = BTreeMap::new();
    for col in ElementScanner::new(section(xml, "cols"), "col") {
        let (Some(min), Some(width)) = (col.attr_u32("min"), col.attr_f64("width")) else {
            continue;
        };
        let max = col.attr_u32("max").unwrap_or(min).min(MAX_COLUMNS);
        for c in min.max(1)..=max {
            widths.insert(c - 1, width);
        }
    }

    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    let mut heights = BTreeMap::new();
    for row in ElementScanner::new(section(xml, "sheetData"), "row") {
        let row_index = row
            .attr_u32("r")
            .and_then(|r| r.checked_sub(1))
            .unwrap_or(rows.len() as u32);
        if row_index >= MAX_ROWS {
            return Err(XlsxError::InvalidFormat(format!(
                "row {} is beyond the last worksheet row ({})",
                row_index as u64 + 1,
                MAX_ROWS
            )));
        }
        let row_index = row_index as usize;
        if let Some(height) = row.attr_f64("ht") {
            heights.insert(row_index as u32, height);
        }

        if rows.len() <= row_index {
            rows.resize_with(row_index + 1, Vec::new);
        }
        let cells = &mut rows[row_index];

        for cell in row.children("c") {
            let col = cell
                .raw_attr("r")
                .and_then(parse_cell_reference)
                .map(|(_, col)| col as usize)
                .unwrap_or(cells.len());
            if col >= MAX_COLUMNS as usize {
                return Err(XlsxError::InvalidFormat(format!(
                    "cell {} is beyond the last worksheet column (XFD)",
                    cell.raw_attr("r").unwrap_or_default()
                )));
            }
            if cells.len() <= col {
                cells.resize_with(col + 1, RawCell::default);
            }
            cells[col] = parse_cell(&cell, shared_strings);
        }
    }

    Ok(RawSheet {
        rows,
        column_widths: (!widths.is_empty()).then_some(widths),
        row_heights: (!heights.is_empty()).then_some(heights),
    })
}

fn parse_cell(cell: &Element<'_>, shared_strings: &[String]) -> RawCell {
    let formula = cell.child("f").map(|f| f.text().into_owned());
    let value = cell.child("v").map(|v| v.text());

    let value = match (cell.raw_attr("t"), value) {
        (Some("inlineStr"), _) => cell
            .child("is")
            .map(|is| CellValue::String(is.children("t").map(|t| t.text()).collect()))
            .unwrap_or_default(),
        (_, None) => CellValue::Empty,
        (Some("s"), Some(v)) => {
            let text = v.trim().parse::<usize>().ok().and_then(|i| shared_strings.get(i));
            match text {
                Some(text) => CellValue::String(text.clone()),
                None => {
                    warn!(
                        "Shared string index '{}' out of range ({} strings), using empty string",
                        v,
                        shared_strings.len()
                    );
                    CellValue::String(String::new())
                }
            }
        }
        (Some("b"), Some(v)) => CellValue::Bool(v.trim() == "1"),
        (Some("str"), Some(v)) => CellValue::String(v.into_owned()),
        (_, Some(v)) => match v.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::String(v.into_owned()),
        },
    };

    RawCell {
        value,
        style: cell.attr_u32("s"),
        formula,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_shared_strings() {
        let xml = r#"<sst count="3" uniqueCount="3"><si><t>Hello</t></si><si><t xml:space="preserve"> padded </t></si><si><r><rPr><b/></rPr><t>Rich</t></r><r><t> text</t></r></si><si><t>a&amp;b</t></si></sst>"#;
        assert_eq!(
            parse_shared_strings(xml),
            vec!["Hello", " padded ", "Rich text", "a&b"]
        );
    }

    #[test]
    fn test_cell_decoding() {
        let xml = r#"<worksheet><sheetData><row r="1">
<c r="A1" t="s"><v>1</v></c>
<c r="B1" t="n"><v>30</v></c>
<c r="C1" t="b"><v>1</v></c>
<c r="D1" t="b"><v>0</v></c>
<c r="E1" t="str"><f>A1&amp;"!"</f><v>x!</v></c>
<c r="F1" t="inlineStr"><is><t>inline</t></is></c>
<c r="G1"><v>2.5</v></c>
<c r="H1" t="e"><v>#NUM!</v></c>
<c r="I1"><f>SUM(B1:B9)</f></c>
</row></sheetData></worksheet>"#;
        let sheet = parse_worksheet(xml, &strings(&["zero", "one"])).unwrap();
        let row: Vec<&CellValue> = sheet.rows[0].iter().map(|c| &c.value).collect();

        assert_eq!(row[0], &CellValue::String("one".into()));
        assert_eq!(row[1], &CellValue::Number(30.0));
        assert_eq!(row[2], &CellValue::Bool(true));
        assert_eq!(row[3], &CellValue::Bool(false));
        assert_eq!(row[4], &CellValue::String("x!".into()));
        assert_eq!(sheet.rows[0][4].formula.as_deref(), Some("A1&\"!\""));
        assert_eq!(row[5], &CellValue::String("inline".into()));
        assert_eq!(row[6], &CellValue::Number(2.5));
        assert_eq!(row[7], &CellValue::String("#NUM!".into()));
        assert_eq!(row[8], &CellValue::Empty);
        assert_eq!(sheet.rows[0][8].formula.as_deref(), Some("SUM(B1:B9)"));
    }

    #[test]
    fn test_out_of_range_shared_string_is_empty() {
        let xml = r#"<sheetData><row r="1"><c r="A1" t="s"><v>7</v></c></row></sheetData>"#;
        let sheet = parse_worksheet(xml, &strings(&["only"])).unwrap();
        assert_eq!(sheet.rows[0][0].value, CellValue::String(String::new()));
    }

    #[test]
    fn test_sparse_cells_and_rows() {
        let xml = r#"<sheetData><row r="1"><c r="C1"><v>3</v></c></row><row r="3" ht="24"><c r="A3"><v>1</v></c></row></sheetData>"#;
        let sheet = parse_worksheet(xml, &[]).unwrap();

        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0].len(), 3);
        assert_eq!(sheet.rows[0][0].value, CellValue::Empty);
        assert_eq!(sheet.rows[0][2].value, CellValue::Number(3.0));
        assert!(sheet.rows[1].is_empty());
        assert_eq!(sheet.row_heights.unwrap().get(&2), Some(&24.0));
        assert!(sheet.column_widths.is_none());
    }

    #[test]
    fn test_column_widths() {
        let xml = r#"<cols><col min="1" max="1" width="20" customWidth="1"/><col min="3" max="4" width="9.5"/></cols><sheetData/>"#;
        let widths = parse_worksheet(xml, &[]).unwrap().column_widths.unwrap();
        assert_eq!(widths.get(&0), Some(&20.0));
        assert_eq!(widths.get(&1), None);
        assert_eq!(widths.get(&2), Some(&9.5));
        assert_eq!(widths.get(&3), Some(&9.5));
    }

    #[test]
    fn test_row_beyond_sheet_limit_is_rejected() {
        let xml = r#"<sheetData><row r="3000000"><c r="A3000000"><v>1</v></c></row></sheetData>"#;
        match parse_worksheet(xml, &[]) {
            Err(XlsxError::InvalidFormat(msg)) => assert!(msg.contains("3000000")),
            other => panic!("expected InvalidFormat, got {:?}", other.map(|s| s.rows.len())),
        }

        let last = r#"<sheetData><row r="1048576"><c r="A1048576"><v>1</v></c></row></sheetData>"#;
        assert_eq!(parse_worksheet(last, &[]).unwrap().rows.len(), 1_048_576);
    }

    #[test]
    fn test_column_beyond_sheet_limit_is_rejected() {
        let xml = r#"<sheetData><row r="1"><c r="ZZZZ1"><v>1</v></c></row></sheetData>"#;
        assert!(matches!(
            parse_worksheet(xml, &[]),
            Err(XlsxError::InvalidFormat(_))
        ));

        let last = r#"<sheetData><row r="1"><c r="XFD1"><v>1</v></c></row></sheetData>"#;
        assert_eq!(parse_worksheet(last, &[]).unwrap().rows[0].len(), 16_384);
    }

    #[test]
    fn test_read_rejects_oversized_sheet() {
        use crate::xlsx::XlsxWriter;

        let mut writer = XlsxWriter::new();
        writer.add_worksheet("Data", vec![vec!["x".into()]]);
        let mut package = writer.package().unwrap();
        package.set_file(
            worksheet_path(1),
            r#"<worksheet><sheetData><row r="3000000"><c r="ZZZZ3000000"><v>1</v></c></row></sheetData></worksheet>"#,
        );
        let bytes = package.generate().unwrap();

        assert!(matches!(read(&bytes), Err(XlsxError::InvalidFormat(_))));
        assert!(matches!(
            read_with_styles(&bytes),
            Err(XlsxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_sheet_refs_via_relationships() {
        let workbook = r#"<workbook><sheets><sheet name="First" sheetId="1" r:id="rId7"/><sheet name="Second" sheetId="2" r:id="rId9"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId7" Type="x/worksheet" Target="worksheets/data.xml"/><Relationship Id="rId8" Type="x/styles" Target="styles.xml"/></Relationships>"#;
        let refs = sheet_refs(workbook, Some(rels));

        assert_eq!(refs[0].name, "First");
        assert_eq!(refs[0].path, "xl/worksheets/data.xml");
        // rId9 has no target
        assert_eq!(refs[1].path, "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("/xl/worksheets/abs.xml"), "xl/worksheets/abs.xml");
    }
}
