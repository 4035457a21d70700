//! Worksheet XML generation
//!
//! The batch generator, the streaming emitter and the parallel task engine
//! all serialize rows through [`write_row`], so a worksheet's `<sheetData>`
//! is byte-identical whichever path produced it.

use super::columns::{column_letters, push_cell_reference};
use super::shared_strings::SharedStrings;
use super::xml_writer::{escape_into, XML_DECLARATION};
use crate::types::{excel_serial_date, Cell, CellValue, FrozenPane, Worksheet};

pub(crate) const WORKSHEET_OPEN: &str = "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">";

/// Largest magnitude written through the integer fast path
const INTEGER_FAST_PATH_LIMIT: f64 = 1e15;

/// Serialize a complete worksheet part, interning strings into `strings`.
pub fn write_worksheet(worksheet: &Worksheet, strings: &mut SharedStrings) -> Vec<u8> {
    let mut buf = Vec::with_capacity(512 + worksheet.rows.len() * 64);

    write_worksheet_start(&mut buf, worksheet);
    for (index, cells) in worksheet.rows.iter().enumerate() {
        let row = index as u32;
        write_row(
            &mut buf,
            row,
            cells,
            worksheet.row_heights.get(&row).copied(),
            strings,
        );
    }
    write_worksheet_end(&mut buf, worksheet);

    buf
}

/// Declaration, `<worksheet>`, views, column widths and `<sheetData>`.
pub(crate) fn write_worksheet_start(buf: &mut Vec<u8>, worksheet: &Worksheet) {
    buf.extend_from_slice(XML_DECLARATION.as_bytes());
    buf.extend_from_slice(WORKSHEET_OPEN.as_bytes());

    if let Some(pane) = worksheet.frozen_pane.filter(FrozenPane::is_active) {
        write_frozen_pane(buf, &pane);
    }

    // non-finite widths have no OOXML spelling; those columns keep the default
    let mut widths = worksheet
        .column_widths
        .iter()
        .enumerate()
        .filter(|(_, width)| width.is_finite())
        .peekable();
    if widths.peek().is_some() {
        let mut num = itoa::Buffer::new();
        buf.extend_from_slice(b"<cols>");
        for (index, width) in widths {
            let col = num.format(index + 1).as_bytes().to_vec();
            buf.extend_from_slice(b"<col min=\"");
            buf.extend_from_slice(&col);
            buf.extend_from_slice(b"\" max=\"");
            buf.extend_from_slice(&col);
            buf.extend_from_slice(b"\" width=\"");
            push_number(buf, *width);
            buf.extend_from_slice(b"\" customWidth=\"1\"/>");
        }
        buf.extend_from_slice(b"</cols>");
    }

    buf.extend_from_slice(b"<sheetData>");
}

/// `</sheetData>`, merged ranges and `</worksheet>`.
pub(crate) fn write_worksheet_end(buf: &mut Vec<u8>, worksheet: &Worksheet) {
    buf.extend_from_slice(b"</sheetData>");

    if !worksheet.merged_cells.is_empty() {
        let mut num = itoa::Buffer::new();
        buf.extend_from_slice(b"<mergeCells count=\"");
        buf.extend_from_slice(num.format(worksheet.merged_cells.len()).as_bytes());
        buf.extend_from_slice(b"\">");
        for merge in &worksheet.merged_cells {
            buf.extend_from_slice(b"<mergeCell ref=\"");
            push_cell_reference(buf, merge.start.row, merge.start.col);
            buf.push(b':');
            push_cell_reference(buf, merge.end.row, merge.end.col);
            buf.extend_from_slice(b"\"/>");
        }
        buf.extend_from_slice(b"</mergeCells>");
    }

    buf.extend_from_slice(b"</worksheet>");
}

fn write_frozen_pane(buf: &mut Vec<u8>, pane: &FrozenPane) {
    let mut num = itoa::Buffer::new();
    let active = match (pane.rows > 0, pane.cols > 0) {
        (true, true) => "bottomRight",
        (true, false) => "bottomLeft",
        _ => "topRight",
    };

    buf.extend_from_slice(b"<sheetViews><sheetView workbookViewId=\"0\"><pane");
    if pane.cols > 0 {
        buf.extend_from_slice(b" xSplit=\"");
        buf.extend_from_slice(num.format(pane.cols).as_bytes());
        buf.push(b'"');
    }
    if pane.rows > 0 {
        buf.extend_from_slice(b" ySplit=\"");
        buf.extend_from_slice(num.format(pane.rows).as_bytes());
        buf.push(b'"');
    }
    buf.extend_from_slice(b" topLeftCell=\"");
    buf.extend_from_slice(column_letters(pane.cols).as_bytes());
    buf.extend_from_slice(num.format(pane.rows as u64 + 1).as_bytes());
    buf.extend_from_slice(b"\" activePane=\"");
    buf.extend_from_slice(active.as_bytes());
    buf.extend_from_slice(b"\" state=\"frozen\"/><selection pane=\"");
    buf.extend_from_slice(active.as_bytes());
    buf.extend_from_slice(b"\"/></sheetView></sheetViews>");
}

/// Append `<row>` for zero-based `row`.
///
/// Returns the number of cells written. A row with no non-empty cells
/// leaves `buf` untouched and returns 0.
pub(crate) fn write_row(
    buf: &mut Vec<u8>,
    row: u32,
    cells: &[Cell],
    height: Option<f64>,
    strings: &mut SharedStrings,
) -> usize {
    if cells.iter().all(Cell::is_empty) {
        return 0;
    }

    let mut num = itoa::Buffer::new();
    buf.extend_from_slice(b"<row r=\"");
    buf.extend_from_slice(num.format(row as u64 + 1).as_bytes());
    buf.push(b'"');
    if let Some(height) = height.filter(|h| h.is_finite()) {
        buf.extend_from_slice(b" ht=\"");
        push_number(buf, height);
        buf.extend_from_slice(b"\" customHeight=\"1\"");
    }
    buf.push(b'>');

    let mut written = 0;
    for (col, cell) in cells.iter().enumerate() {
        if write_cell(buf, row, col as u32, cell, strings) {
            written += 1;
        }
    }

    buf.extend_from_slice(b"</row>");
    written
}

/// Encoded `(type code, literal)` for a cell value
enum Encoded {
    Omitted,
    Shared(u32),
    Number(f64),
    Bool(bool),
    Error(&'static str),
}

fn encode_value(value: &CellValue, strings: &mut SharedStrings) -> Encoded {
    match value {
        CellValue::Empty => Encoded::Omitted,
        CellValue::String(s) if s.is_empty() => Encoded::Omitted,
        CellValue::String(s) => Encoded::Shared(strings.intern(s)),
        CellValue::Number(n) if !n.is_finite() => Encoded::Error("#NUM!"),
        CellValue::Number(n) => Encoded::Number(*n),
        CellValue::Bool(b) => Encoded::Bool(*b),
        CellValue::Date(d) => Encoded::Number(excel_serial_date(d) as f64),
    }
}

fn write_cell(
    buf: &mut Vec<u8>,
    row: u32,
    col: u32,
    cell: &Cell,
    strings: &mut SharedStrings,
) -> bool {
    if cell.is_empty() {
        return false;
    }

    let encoded = encode_value(&cell.value, strings);
    let mut num = itoa::Buffer::new();

    buf.extend_from_slice(b"<c r=\"");
    push_cell_reference(buf, row, col);
    buf.push(b'"');

    if let Some(style) = cell.style {
        buf.extend_from_slice(b" s=\"");
        buf.extend_from_slice(num.format(style).as_bytes());
        buf.push(b'"');
    }

    match encoded {
        Encoded::Shared(_) => buf.extend_from_slice(b" t=\"s\""),
        Encoded::Number(_) => buf.extend_from_slice(b" t=\"n\""),
        Encoded::Bool(_) => buf.extend_from_slice(b" t=\"b\""),
        Encoded::Error(_) => buf.extend_from_slice(b" t=\"e\""),
        Encoded::Omitted => {}
    }
    buf.push(b'>');

    if let Some(formula) = &cell.formula {
        buf.extend_from_slice(b"<f>");
        escape_into(buf, formula);
        buf.extend_from_slice(b"</f>");
    }

    match encoded {
        Encoded::Omitted => {}
        Encoded::Shared(index) => {
            buf.extend_from_slice(b"<v>");
            buf.extend_from_slice(num.format(index).as_bytes());
            buf.extend_from_slice(b"</v>");
        }
        Encoded::Number(n) => {
            buf.extend_from_slice(b"<v>");
            push_number(buf, n);
            buf.extend_from_slice(b"</v>");
        }
        Encoded::Bool(b) => buf.extend_from_slice(if b { b"<v>1</v>" } else { b"<v>0</v>" }),
        Encoded::Error(code) => {
            buf.extend_from_slice(b"<v>");
            buf.extend_from_slice(code.as_bytes());
            buf.extend_from_slice(b"</v>");
        }
    }

    buf.extend_from_slice(b"</c>");
    true
}

/// Decimal text for `n`, using itoa for whole numbers.
fn push_number(buf: &mut Vec<u8>, n: f64) {
    if n.fract() == 0.0 && n.abs() < INTEGER_FAST_PATH_LIMIT {
        let mut num = itoa::Buffer::new();
        buf.extend_from_slice(num.format(n as i64).as_bytes());
    } else {
        buf.extend_from_slice(n.to_string().as_bytes()); // Float doesn't use itoa
    }
}
