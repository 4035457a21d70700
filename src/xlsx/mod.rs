//! XLSX document codec
//!
//! Write side: [`XlsxWriter`] renders worksheets into a [`Package`] of parts,
//! either one sheet after another, through the [`parallel`] task engine, or
//! row by row with [`WorksheetStream`]. Read side: [`read`] and
//! [`read_with_styles`] recover sheets from archive bytes.

pub mod columns;
pub mod package;
pub mod parallel;
pub mod reader;
pub mod shared_strings;
pub mod streaming;
pub mod styles;
pub mod workbook;
pub mod worksheet;

mod xml;
mod xml_writer;

pub use package::Package;
pub use reader::{read, read_with_styles};
#[cfg(feature = "async")]
pub use reader::{read_async, read_with_styles_async};
pub use shared_strings::SharedStrings;
pub use streaming::WorksheetStream;
pub use styles::{parse_styles, resolve_style};
pub use workbook::{validate_sheet_names, XlsxWriter};
pub use worksheet::write_worksheet;
pub use xml_writer::XmlWriter;
