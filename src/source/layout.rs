use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// `NAME start - end` column spans, possibly several per line.
static SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9_]+)\s+(\d+)\s*-\s*(\d+)").unwrap());

/// `NAME LABEL="..."` statements.
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*([A-Za-z0-9_]+)\s+LABEL="([^"]+)""#).unwrap());

/// One column of a fixed-width file. `start`/`end` are 0-based byte offsets,
/// end exclusive (the layout file declares 1-based inclusive spans).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// Parsed structure definition for one source table.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub columns: Vec<ColumnSpec>,
}

impl TableLayout {
    /// Length every data line must reach to cover the widest span.
    pub fn min_line_len(&self) -> usize {
        self.columns.iter().map(|c| c.end).max().unwrap_or(0)
    }

    /// Keep only the named columns, preserving position order.
    /// Unknown names are simply absent from the result.
    pub fn project(&self, names: &[&str]) -> TableLayout {
        let keep: std::collections::HashSet<&str> = names.iter().copied().collect();
        TableLayout {
            columns: self
                .columns
                .iter()
                .filter(|c| keep.contains(c.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Parse a layout (structure-definition) file: every `NAME a - b` pair
/// becomes a column, every `NAME LABEL="..."` line attaches a label.
/// Duplicate column names get `_2`, `_3`… suffixes in order of appearance;
/// their labels still resolve through the original name.
pub fn parse_layout(path: &Path) -> Result<TableLayout> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading layout file {}", path.display()))?;

    let mut raw: Vec<(String, usize, usize)> = Vec::new();
    let mut labels: HashMap<String, String> = HashMap::new();

    for line in text.lines() {
        for cap in SPAN_RE.captures_iter(line) {
            let name = cap[1].to_string();
            let start: usize = cap[2].parse().context("span start")?;
            let end: usize = cap[3].parse().context("span end")?;
            raw.push((name, start, end));
        }
        if let Some(cap) = LABEL_RE.captures(line) {
            labels.insert(cap[1].to_string(), cap[2].to_string());
        }
    }

    if raw.is_empty() {
        bail!("no column spans found in layout {}", path.display());
    }

    raw.sort_by_key(|(_, start, _)| *start);

    for (name, start, end) in &raw {
        if *start == 0 || end < start {
            bail!(
                "invalid span {}-{} for column {} in {}",
                start,
                end,
                name,
                path.display()
            );
        }
    }

    // Disambiguate repeated names while keeping label lookup on the original.
    let mut total: HashMap<&str, usize> = HashMap::new();
    for (name, _, _) in &raw {
        *total.entry(name.as_str()).or_insert(0) += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(raw.len());
    for (name, start, end) in &raw {
        let n = seen.entry(name.clone()).or_insert(0);
        *n += 1;
        let final_name = if total[name.as_str()] > 1 {
            format!("{}_{}", name, n)
        } else {
            name.clone()
        };
        columns.push(ColumnSpec {
            name: final_name,
            label: labels.get(name).cloned().unwrap_or_default(),
            start: start - 1,
            end: *end,
        });
    }

    Ok(TableLayout { columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_layout(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_spans_and_labels() {
        let f = write_layout(
            r#"INPUT
  ER13002 1 - 5   ER13003 6 - 7
;
ER13002 LABEL="1999 FAMILY WEIGHT"
ER13003 LABEL="AGE OF HEAD"
"#,
        );
        let layout = parse_layout(f.path()).unwrap();
        assert_eq!(layout.columns.len(), 2);
        assert_eq!(layout.columns[0].name, "ER13002");
        assert_eq!(layout.columns[0].start, 0);
        assert_eq!(layout.columns[0].end, 5);
        assert_eq!(layout.columns[0].label, "1999 FAMILY WEIGHT");
        assert_eq!(layout.columns[1].label, "AGE OF HEAD");
        assert_eq!(layout.min_line_len(), 7);
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let f = write_layout("V1 1 - 2  V1 3 - 4  V2 5 - 6\n");
        let layout = parse_layout(f.path()).unwrap();
        let names = layout.column_names();
        assert_eq!(names, vec!["V1_1", "V1_2", "V2"]);
    }

    #[test]
    fn empty_layout_is_an_error() {
        let f = write_layout("nothing useful here\n");
        assert!(parse_layout(f.path()).is_err());
    }

    #[test]
    fn projection_keeps_position_order() {
        let f = write_layout("A 1 - 2  B 3 - 4  C 5 - 6\n");
        let layout = parse_layout(f.path()).unwrap();
        let projected = layout.project(&["C", "A"]);
        assert_eq!(projected.column_names(), vec!["A", "C"]);
    }
}
