//! Cell style definitions for the read path
//!
//! `styles.xml` stores fonts, fills and borders in flat tables that `cellXfs`
//! records reference by id. [`ParsedStyles`] holds those tables as read;
//! [`CellStyle`] is the resolved form attached to a parsed cell.

use std::collections::BTreeMap;

/// Font attributes of a resolved style
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub size: Option<f64>,
    /// `#RRGGBB`
    pub color: Option<String>,
}

impl FontStyle {
    /// True when no field differs from the default font
    pub fn is_default(&self) -> bool {
        !self.bold && !self.italic && self.size.is_none() && self.color.is_none()
    }
}

/// Pattern fill
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FillStyle {
    /// `patternType`, e.g. `solid`, `gray125`, `none`
    pub pattern: Option<String>,
    /// Foreground colour as `#RRGGBB`
    pub color: Option<String>,
}

/// One edge of a cell border
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderSide {
    /// Line style, e.g. `thin`, `medium`, `dashed`
    pub style: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderStyle {
    pub top: Option<BorderSide>,
    pub bottom: Option<BorderSide>,
    pub left: Option<BorderSide>,
    pub right: Option<BorderSide>,
}

impl BorderStyle {
    pub fn has_any_side(&self) -> bool {
        self.top.is_some() || self.bottom.is_some() || self.left.is_some() || self.right.is_some()
    }
}

/// Alignment as written on the `<alignment>` element
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
}

/// A style resolved from a cell's `s` attribute
///
/// Every field is optional; a style with no fields is never produced.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellStyle {
    pub font: Option<FontStyle>,
    pub fill: Option<FillStyle>,
    pub border: Option<BorderStyle>,
    pub alignment: Option<Alignment>,
    /// Format code from `<numFmts>`, e.g. `0.00%`
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn is_empty(&self) -> bool {
        self.font.is_none()
            && self.fill.is_none()
            && self.border.is_none()
            && self.alignment.is_none()
            && self.number_format.is_none()
    }
}

/// A `<xf>` record from `<cellXfs>`
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellXf {
    pub font_id: Option<u32>,
    pub fill_id: Option<u32>,
    pub border_id: Option<u32>,
    pub num_fmt_id: Option<u32>,
    pub apply_font: bool,
    pub apply_fill: bool,
    pub apply_border: bool,
    pub apply_alignment: bool,
    pub alignment: Option<Alignment>,
}

/// Style tables from `xl/styles.xml`
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedStyles {
    pub fonts: Vec<FontStyle>,
    pub fills: Vec<FillStyle>,
    pub borders: Vec<BorderStyle>,
    pub cell_xfs: Vec<CellXf>,
    /// Custom number formats by `numFmtId`
    pub num_fmts: BTreeMap<u32, String>,
}
