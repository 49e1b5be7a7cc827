use super::layout::TableLayout;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read fixed-width data lines into per-column cells. Cells are trimmed;
/// an all-blank span becomes `None` so that "missing" stays distinct from
/// any real value downstream. `limit` bounds the number of data rows read
/// (used for type-inference sampling).
///
/// The first non-blank line must cover the widest declared span; a shorter
/// line means the layout does not belong to this data file.
pub fn read_rows(
    data_path: &Path,
    layout: &TableLayout,
    limit: Option<usize>,
) -> Result<Vec<Vec<Option<String>>>> {
    let file = File::open(data_path)
        .with_context(|| format!("opening data file {}", data_path.display()))?;
    let reader = BufReader::new(file);

    let min_len = layout.min_line_len();
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut checked_width = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| {
            format!("reading line {} of {}", idx + 1, data_path.display())
        })?;
        if line.trim().is_empty() {
            continue;
        }
        if !checked_width {
            let actual = line.trim_end_matches(['\n', '\r']).len();
            if actual < min_len {
                bail!(
                    "line too short in {}: {} < {} expected by layout",
                    data_path.display(),
                    actual,
                    min_len
                );
            }
            checked_width = true;
        }

        rows.push(slice_line(&line, layout));

        if let Some(max) = limit {
            if rows.len() >= max {
                break;
            }
        }
    }

    Ok(rows)
}

fn slice_line(line: &str, layout: &TableLayout) -> Vec<Option<String>> {
    let bytes = line.as_bytes();
    layout
        .columns
        .iter()
        .map(|col| {
            let start = col.start.min(bytes.len());
            let end = col.end.min(bytes.len());
            let raw = String::from_utf8_lossy(&bytes[start..end]);
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Extract one column of an already-read row set.
pub fn column_values<'a>(
    rows: &'a [Vec<Option<String>>],
    col_idx: usize,
) -> Vec<Option<&'a str>> {
    rows.iter()
        .map(|r| r.get(col_idx).and_then(|v| v.as_deref()))
        .collect()
}
