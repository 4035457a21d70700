//! # zipsheet
//!
//! XLSX generation and parsing on top of a self-contained ZIP codec.
//!
//! ## Features
//!
//! - **No archive dependency**: CRC32, local/central-directory headers and
//!   the end record are written and scanned by the [`zip`] module
//! - **Optional DEFLATE**: stored output always works; compressed output is
//!   available behind the `deflate` feature and never silently downgraded
//! - **Streaming emission**: [`WorksheetStream`] yields worksheet XML one row
//!   at a time for sheets too large to build as one string
//! - **Parallel generation**: sheets render as independent tasks on rayon
//!   and their shared-string tables are merged deterministically
//! - **Styled reads**: cell style indices resolve into [`CellStyle`] values
//!
//! ## Quick Start
//!
//! ```rust
//! use zipsheet::{read, Cell, XlsxWriter};
//!
//! # fn main() -> zipsheet::Result<()> {
//! let mut writer = XlsxWriter::new();
//! writer
//!     .add_worksheet("People", vec![
//!         vec!["Name".into(), "Age".into()],
//!         vec!["Alice".into(), 30.into()],
//!         vec!["Total".into(), Cell::formula("=COUNT(B2:B2)")],
//!     ])
//!     .freeze(1, 0);
//!
//! let bytes = writer.generate()?;
//! let workbook = read(&bytes)?;
//! assert_eq!(workbook.sheets[0].data[1][0].as_str(), Some("Alice"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Raw archives
//!
//! ```rust
//! use zipsheet::zip::{ZipReader, ZipWriter};
//!
//! # fn main() -> zipsheet::Result<()> {
//! let mut zip = ZipWriter::new();
//! zip.add_file("test.txt", "Hello");
//! let bytes = zip.generate()?;
//!
//! let reader = ZipReader::new(&bytes)?;
//! assert_eq!(reader.get_file("test.txt")?.as_deref(), Some("Hello"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod style;
pub mod types;
pub mod xlsx;
pub mod zip;

pub use config::{CompressionProfile, WriterOptions};
pub use error::{Result, XlsxError};
pub use style::CellStyle;
pub use types::{
    Cell, CellValue, FrozenPane, MergeCell, ParsedCell, ParsedSheet, StyledSheet, WorkbookData,
    WorkbookDataWithStyles, Worksheet,
};
pub use xlsx::{read, read_with_styles, Package, SharedStrings, WorksheetStream, XlsxWriter};
#[cfg(feature = "async")]
pub use xlsx::{read_async, read_with_styles_async};
