//! Parallel worksheet generation
//!
//! Each worksheet is rendered by an independent task that interns strings
//! into its own private table. Once every task has finished, the local
//! tables are merged in sheet order into one global table and each task's
//! `<v>` references are rewritten through its local-to-global map. The
//! result is byte-identical to generating the sheets one after another
//! against a single table.

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::shared_strings::SharedStrings;
use super::worksheet::write_worksheet;
use crate::error::{Result, XlsxError};
use crate::types::Worksheet;

/// Output of one generation task
#[derive(Debug, Clone)]
pub struct WorksheetTask {
    /// Position of the worksheet in the workbook
    pub index: usize,
    /// Worksheet XML whose string cells reference `strings` by local index
    pub xml: Vec<u8>,
    /// The task's private shared-string table
    pub strings: Vec<String>,
}

/// Global table plus one local-to-global map per task
#[derive(Debug, Clone, Default)]
pub struct MergedStrings {
    pub strings: SharedStrings,
    /// `remaps[task][local] == global`
    pub remaps: Vec<Vec<u32>>,
}

/// Render one worksheet against a fresh table.
pub fn generate_task(worksheet: &Worksheet, index: usize) -> WorksheetTask {
    let mut strings = SharedStrings::new();
    let xml = write_worksheet(worksheet, &mut strings);
    WorksheetTask {
        index,
        xml,
        strings: strings.into_table(),
    }
}

/// Run one task per worksheet and return the results in sheet order.
///
/// With the `parallel` feature the tasks run on the rayon pool; otherwise
/// they run on the calling thread.
pub fn run_tasks(worksheets: &[Worksheet]) -> Vec<WorksheetTask> {
    #[cfg(feature = "parallel")]
    let mut tasks: Vec<WorksheetTask> = worksheets
        .par_iter()
        .enumerate()
        .map(|(index, worksheet)| generate_task(worksheet, index))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let mut tasks: Vec<WorksheetTask> = worksheets
        .iter()
        .enumerate()
        .map(|(index, worksheet)| generate_task(worksheet, index))
        .collect();

    tasks.sort_by_key(|task| task.index);
    tasks
}

/// Merge per-task tables, visiting them in the order given.
pub fn merge_shared_strings<T: AsRef<[String]>>(tables: &[T]) -> MergedStrings {
    let mut strings = SharedStrings::new();
    let remaps: Vec<Vec<u32>> = tables
        .iter()
        .map(|table| {
            table
                .as_ref()
                .iter()
                .map(|s| strings.intern(s))
                .collect::<Vec<u32>>()
        })
        .collect();

    debug!(
        "Merged {} shared-string tables into {} unique strings",
        tables.len(),
        strings.count()
    );

    MergedStrings { strings, remaps }
}

/// Rewrite the `<v>` index of every `t="s"` cell through `remap`.
///
/// Fails with [`XlsxError::InvalidFormat`] when a cell references an index
/// the map does not cover or its value is not an integer.
pub fn remap_shared_string_refs(xml: &[u8], remap: &[u32]) -> Result<Vec<u8>> {
    let xml = std::str::from_utf8(xml)?;
    let mut out = Vec::with_capacity(xml.len() + xml.len() / 16);
    let mut num = itoa::Buffer::new();
    let mut pos = 0;

    while let Some(found) = xml[pos..].find("<c ") {
        let cell_start = pos + found;
        let Some(tag_len) = xml[cell_start..].find('>') else {
            break;
        };
        let tag_end = cell_start + tag_len;
        let tag = &xml[cell_start..tag_end];

        if !tag.contains(" t=\"s\"") {
            out.extend_from_slice(xml[pos..=tag_end].as_bytes());
            pos = tag_end + 1;
            continue;
        }

        let cell_end = xml[tag_end..]
            .find("</c>")
            .map(|i| tag_end + i)
            .ok_or_else(|| XlsxError::InvalidFormat(format!("unterminated cell: {}", tag)))?;
        let value = xml[tag_end..cell_end]
            .find("<v>")
            .map(|i| tag_end + i + 3)
            .and_then(|start| {
                xml[start..cell_end]
                    .find("</v>")
                    .map(|len| (start, start + len))
            });

        let Some((value_start, value_end)) = value else {
            out.extend_from_slice(xml[pos..cell_end].as_bytes());
            pos = cell_end;
            continue;
        };

        let local: usize = xml[value_start..value_end].parse().map_err(|_| {
            XlsxError::InvalidFormat(format!(
                "shared string reference '{}' is not an index",
                &xml[value_start..value_end]
            ))
        })?;
        let global = remap.get(local).ok_or_else(|| {
            XlsxError::InvalidFormat(format!(
                "shared string index {} outside a table of {}",
                local,
                remap.len()
            ))
        })?;

        out.extend_from_slice(xml[pos..value_start].as_bytes());
        out.extend_from_slice(num.format(*global).as_bytes());
        pos = value_end;
    }

    out.extend_from_slice(xml[pos..].as_bytes());
    Ok(out)
}

/// Generate every worksheet through the task engine.
///
/// Returns the worksheet XML in sheet order plus the global table.
pub fn generate_parallel(worksheets: &[Worksheet]) -> Result<(Vec<Vec<u8>>, SharedStrings)> {
    let tasks = run_tasks(worksheets);
    let tables: Vec<&[String]> = tasks.iter().map(|task| task.strings.as_slice()).collect();
    let merged = merge_shared_strings(&tables);

    let sheets = tasks
        .iter()
        .zip(&merged.remaps)
        .map(|(task, remap)| remap_shared_string_refs(&task.xml, remap))
        .collect::<Result<Vec<_>>>()?;

    Ok((sheets, merged.strings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn table(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_overlapping_tables() {
        let merged = merge_shared_strings(&[table(&["A", "B"]), table(&["B", "C"])]);
        assert_eq!(merged.strings.into_table(), vec!["A", "B", "C"]);
        assert_eq!(merged.remaps, vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn test_merge_identical_tables() {
        let merged = merge_shared_strings(&[table(&["Same"]), table(&["Same"])]);
        assert_eq!(merged.strings.count(), 1);
        assert_eq!(merged.remaps, vec![vec![0], vec![0]]);
    }

    #[test]
    fn test_remap_rewrites_only_shared_string_cells() {
        let xml = br#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="n"><v>0</v></c><c r="C1" t="s"><f>A1</f><v>1</v></c></row>"#;
        let out = remap_shared_string_refs(xml, &[7, 12]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<row r="1"><c r="A1" t="s"><v>7</v></c><c r="B1" t="n"><v>0</v></c><c r="C1" t="s"><f>A1</f><v>12</v></c></row>"#
        );
    }

    #[test]
    fn test_remap_rejects_unknown_index() {
        let xml = br#"<c r="A1" t="s"><v>3</v></c>"#;
        assert!(matches!(
            remap_shared_string_refs(xml, &[0]),
            Err(XlsxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_same_string_on_two_sheets() {
        let sheets = vec![
            Worksheet::new("One", vec![vec![Cell::from("Same")]]),
            Worksheet::new("Two", vec![vec![Cell::from("Same")]]),
        ];
        let (xml, strings) = generate_parallel(&sheets).unwrap();

        assert_eq!(strings.count(), 1);
        for sheet in xml {
            let sheet = String::from_utf8(sheet).unwrap();
            assert!(sheet.contains("<c r=\"A1\" t=\"s\"><v>0</v></c>"));
        }
    }

    #[test]
    fn test_identical_to_sequential_generation() {
        let sheets: Vec<Worksheet> = (0..6)
            .map(|s| {
                let rows = (0..50)
                    .map(|r| {
                        vec![
                            Cell::from(format!("sheet{}-row{}", s, r % 7)),
                            Cell::from(format!("shared{}", r % 5)),
                            Cell::from(r),
                        ]
                    })
                    .collect();
                Worksheet::new(format!("S{}", s), rows)
            })
            .collect();

        let mut sequential_strings = SharedStrings::new();
        let sequential: Vec<Vec<u8>> = sheets
            .iter()
            .map(|ws| write_worksheet(ws, &mut sequential_strings))
            .collect();

        let (parallel, parallel_strings) = generate_parallel(&sheets).unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(parallel_strings.into_table(), sequential_strings.into_table());
    }

    #[test]
    fn test_tasks_come_back_in_order() {
        let sheets: Vec<Worksheet> = (0..16)
            .map(|i| Worksheet::new(format!("S{}", i), vec![vec![Cell::from(i)]]))
            .collect();
        let indices: Vec<usize> = run_tasks(&sheets).iter().map(|t| t.index).collect();
        assert_eq!(indices, (0..16).collect::<Vec<_>>());
    }
}
