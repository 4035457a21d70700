//! Streaming worksheet emission
//!
//! [`WorksheetStream`] turns a row source into worksheet XML one chunk at a
//! time, so a sheet too large to hold as a single string can be fed straight
//! into a sink. Rows are pulled only when the consumer asks for the next
//! chunk; dropping the stream early leaves a well-formed prefix of rows.

use std::iter::FusedIterator;

use super::shared_strings::SharedStrings;
use super::worksheet::{write_row, WORKSHEET_OPEN};
use super::xml_writer::XML_DECLARATION;
use crate::types::Cell;

enum State {
    Prologue,
    Rows,
    Done,
}

/// Pull-based worksheet XML producer
///
/// Yields the prologue (`<?xml ...?><worksheet ...><sheetData>`), then one
/// chunk per row that has at least one non-empty cell, then the epilogue.
/// Concatenating every chunk gives the same bytes as
/// [`write_worksheet`](super::worksheet::write_worksheet) for a sheet without
/// column widths, panes or merges.
///
/// ```
/// use zipsheet::xlsx::{SharedStrings, WorksheetStream};
/// use zipsheet::Cell;
///
/// let rows = (0..3).map(|i| vec![Cell::from("row"), Cell::from(i)]);
/// let mut strings = SharedStrings::new();
/// let xml: Vec<u8> = WorksheetStream::new(rows, &mut strings).flatten().collect();
///
/// assert!(String::from_utf8(xml).unwrap().contains("<row r=\"3\">"));
/// assert_eq!(strings.count(), 1);
/// ```
pub struct WorksheetStream<'s, I> {
    rows: I,
    strings: &'s mut SharedStrings,
    state: State,
    next_row: u32,
}

impl<'s, I, R> WorksheetStream<'s, I>
where
    I: Iterator<Item = R>,
    R: AsRef<[Cell]>,
{
    pub fn new(rows: impl IntoIterator<IntoIter = I>, strings: &'s mut SharedStrings) -> Self {
        WorksheetStream {
            rows: rows.into_iter(),
            strings,
            state: State::Prologue,
            next_row: 0,
        }
    }

    /// Zero-based index of the next row the source will supply
    pub fn rows_consumed(&self) -> u32 {
        self.next_row
    }
}

impl<I, R> Iterator for WorksheetStream<'_, I>
where
    I: Iterator<Item = R>,
    R: AsRef<[Cell]>,
{
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        match self.state {
            State::Prologue => {
                self.state = State::Rows;
                let mut chunk =
                    Vec::with_capacity(XML_DECLARATION.len() + WORKSHEET_OPEN.len() + 11);
                chunk.extend_from_slice(XML_DECLARATION.as_bytes());
                chunk.extend_from_slice(WORKSHEET_OPEN.as_bytes());
                chunk.extend_from_slice(b"<sheetData>");
                Some(chunk)
            }
            State::Rows => {
                for cells in self.rows.by_ref() {
                    let row = self.next_row;
                    self.next_row += 1;

                    let mut chunk = Vec::new();
                    if write_row(&mut chunk, row, cells.as_ref(), None, self.strings) > 0 {
                        return Some(chunk);
                    }
                }
                self.state = State::Done;
                Some(b"</sheetData></worksheet>".to_vec())
            }
            State::Done => None,
        }
    }
}

impl<I, R> FusedIterator for WorksheetStream<'_, I>
where
    I: Iterator<Item = R>,
    R: AsRef<[Cell]>,
{
}
