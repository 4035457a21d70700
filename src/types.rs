//! Type definitions for worksheet data, on both the write and read paths

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::style::CellStyle;

/// Represents a single cell value in a worksheet
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell
    #[default]
    Empty,
    /// String value
    String(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Date/time, written as an Excel serial day number
    Date(NaiveDateTime),
}

impl CellValue {
    /// Convert cell value to string
    pub fn as_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::String(s) => s.clone(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Date(d) => d.to_string(),
        }
    }

    /// Empty values and empty strings are both omitted on write
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Date(d) => Some(excel_serial_date(d) as f64),
            CellValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            CellValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Excel serial day number for `date`.
///
/// Whole days since 1900-01-01 plus two: one because Excel counts that day
/// as 1, and one for the phantom 1900-02-29 Excel believes existed.
pub fn excel_serial_date(date: &NaiveDateTime) -> i64 {
    const MS_PER_DAY: i64 = 86_400_000;
    let epoch = NaiveDate::from_ymd_opt(1900, 1, 1)
        .unwrap_or_default()
        .and_time(chrono::NaiveTime::MIN);
    let ms = (*date - epoch).num_milliseconds();
    ms.div_euclid(MS_PER_DAY) + 2
}

/// A cell to be written: a value plus an optional formula and style index
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub value: CellValue,
    /// Formula text without the leading `=`
    pub formula: Option<String>,
    /// Index into the `cellXfs` table of `xl/styles.xml`
    pub style: Option<u32>,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Cell {
            value: value.into(),
            formula: None,
            style: None,
        }
    }

    pub fn empty() -> Self {
        Cell::default()
    }

    /// Formula cell with no cached value. A leading `=` is stripped.
    pub fn formula(formula: impl Into<String>) -> Self {
        Cell::empty().with_formula(formula)
    }

    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        let formula = formula.into();
        self.formula = Some(match formula.strip_prefix('=') {
            Some(stripped) => stripped.to_string(),
            None => formula,
        });
        self
    }

    pub fn with_style(mut self, style: u32) -> Self {
        self.style = Some(style);
        self
    }

    /// A cell is written when it has a non-empty value or a formula
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.formula.is_none()
    }
}

macro_rules! cell_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Cell {
                fn from(value: $ty) -> Self {
                    Cell::new(value)
                }
            }
        )*
    };
}

cell_from!(CellValue, &str, String, f64, i32, i64, u32, bool, NaiveDate, NaiveDateTime);

impl<T: Into<CellValue>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        Cell::new(CellValue::from(value))
    }
}

/// Zero-based cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellPosition {
    pub row: u32,
    pub col: u32,
}

impl CellPosition {
    pub fn new(row: u32, col: u32) -> Self {
        CellPosition { row, col }
    }
}

/// Inclusive merged range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeCell {
    pub start: CellPosition,
    pub end: CellPosition,
}

impl MergeCell {
    pub fn new(start: CellPosition, end: CellPosition) -> Self {
        MergeCell { start, end }
    }
}

/// Number of leading rows and columns kept in view while scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrozenPane {
    pub rows: u32,
    pub cols: u32,
}

impl FrozenPane {
    pub fn new(rows: u32, cols: u32) -> Self {
        FrozenPane { rows, cols }
    }

    /// A pane is emitted only when at least one split is set
    pub fn is_active(&self) -> bool {
        self.rows > 0 || self.cols > 0
    }
}

/// A worksheet to be written
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Worksheet {
    pub name: String,
    /// `rows[r][c]`; missing trailing cells are treated as empty
    pub rows: Vec<Vec<Cell>>,
    /// Width per column, starting at column A
    pub column_widths: Vec<f64>,
    /// Height by zero-based row index
    pub row_heights: BTreeMap<u32, f64>,
    pub merged_cells: Vec<MergeCell>,
    pub frozen_pane: Option<FrozenPane>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Worksheet {
            name: name.into(),
            rows,
            ..Default::default()
        }
    }

    pub fn with_column_widths(mut self, widths: Vec<f64>) -> Self {
        self.column_widths = widths;
        self
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) -> &mut Self {
        self.row_heights.insert(row, height);
        self
    }

    /// Merge the inclusive range `(start_row, start_col)..=(end_row, end_col)`
    pub fn merge(
        &mut self,
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> &mut Self {
        self.merged_cells.push(MergeCell::new(
            CellPosition::new(start_row, start_col),
            CellPosition::new(end_row, end_col),
        ));
        self
    }

    pub fn freeze(&mut self, rows: u32, cols: u32) -> &mut Self {
        self.frozen_pane = Some(FrozenPane::new(rows, cols));
        self
    }
}

/// A parsed cell decorated with its resolved style
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedCell {
    pub value: CellValue,
    pub style: Option<CellStyle>,
    pub formula: Option<String>,
}

/// A worksheet recovered from an archive, values only
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedSheet {
    pub name: String,
    pub data: Vec<Vec<CellValue>>,
    /// Width by zero-based column index
    pub column_widths: Option<BTreeMap<u32, f64>>,
    /// Height by zero-based row index
    pub row_heights: Option<BTreeMap<u32, f64>>,
}

/// A worksheet recovered from an archive with formulas and resolved styles
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StyledSheet {
    pub name: String,
    pub data: Vec<Vec<ParsedCell>>,
    pub column_widths: Option<BTreeMap<u32, f64>>,
    pub row_heights: Option<BTreeMap<u32, f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkbookData {
    pub sheets: Vec<ParsedSheet>,
}

impl WorkbookData {
    pub fn sheet(&self, name: &str) -> Option<&ParsedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkbookDataWithStyles {
    pub sheets: Vec<StyledSheet>,
}

impl WorkbookDataWithStyles {
    pub fn sheet(&self, name: &str) -> Option<&StyledSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(30), CellValue::Number(30.0));
        assert_eq!(CellValue::from("x"), CellValue::String("x".to_string()));
        assert_eq!(CellValue::from(None::<f64>), CellValue::Empty);
        assert_eq!(CellValue::String("true".to_string()).as_bool(), Some(true));
        assert_eq!(CellValue::Number(42.0).as_f64(), Some(42.0));
    }

    #[test]
    fn test_empty_string_counts_as_empty() {
        assert!(CellValue::String(String::new()).is_empty());
        assert!(!CellValue::Bool(false).is_empty());
        assert!(!Cell::formula("=SUM(A1:A3)").is_empty());
    }

    #[test]
    fn test_formula_prefix_stripped() {
        let cell = Cell::new(6).with_formula("=SUM(A1:A3)");
        assert_eq!(cell.formula.as_deref(), Some("SUM(A1:A3)"));
        assert_eq!(cell.value, CellValue::Number(6.0));
    }

    #[test]
    fn test_excel_serial_date() {
        let day = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        assert_eq!(excel_serial_date(&day(1900, 1, 1)), 2);
        assert_eq!(excel_serial_date(&day(1900, 3, 1)), 61);
        assert_eq!(excel_serial_date(&day(2024, 1, 1)), 45292);
        // time of day is truncated
        let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(excel_serial_date(&noon), 45292);
    }

    #[test]
    fn test_frozen_pane_activity() {
        assert!(!FrozenPane::default().is_active());
        assert!(FrozenPane::new(1, 0).is_active());
    }
}
