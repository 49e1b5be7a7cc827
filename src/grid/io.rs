use super::types::{Grid, GridRow};
use crate::report::Conflict;
use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Write a grid as CSV: {row, concept, required, <year>...}, one row per
/// concept, empty string for absent cells.
pub fn write_grid(grid: &Grid, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating grid file {}", path.display()))?;

    let mut header = vec!["row".to_string(), "concept".into(), "required".into()];
    header.extend(grid.years.iter().map(|y| y.to_string()));
    writer.write_record(&header).context("writing grid header")?;

    for row in &grid.rows {
        let mut record = vec![
            row.row.to_string(),
            row.concept.clone(),
            if row.required { "1" } else { "0" }.to_string(),
        ];
        record.extend(
            grid.years
                .iter()
                .map(|y| row.code(*y).unwrap_or_default().to_string()),
        );
        writer
            .write_record(&record)
            .with_context(|| format!("writing grid row {}", row.concept))?;
    }
    writer.flush().context("flushing grid file")?;
    info!(path = %path.display(), rows = grid.rows.len(), "wrote grid");
    Ok(())
}

/// Write the conflict ledger as CSV so resolutions can be audited without
/// digging through the run report. One line per dropped candidate.
pub fn write_conflicts(conflicts: &[Conflict], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating conflicts file {}", path.display()))?;
    writer
        .write_record(["concept", "year", "kept", "dropped", "reason"])
        .context("writing conflicts header")?;
    for c in conflicts {
        let year = c.year.to_string();
        writer
            .write_record([
                c.concept.as_str(),
                year.as_str(),
                c.kept.as_str(),
                c.dropped.as_str(),
                c.reason.as_str(),
            ])
            .with_context(|| format!("writing conflict row for {}", c.concept))?;
    }
    writer.flush().context("flushing conflicts file")?;
    info!(path = %path.display(), rows = conflicts.len(), "wrote conflict ledger");
    Ok(())
}

/// Read a grid CSV written by `write_grid` (or edited by hand — cells are
/// taken verbatim, empty meaning absent).
pub fn read_grid(path: &Path) -> Result<Grid> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening grid file {}", path.display()))?;

    let headers = reader.headers().context("reading grid header")?.clone();
    if headers.len() < 3 {
        bail!("grid file {} has no year columns", path.display());
    }
    let mut years = Vec::new();
    for field in headers.iter().skip(3) {
        let year: i32 = field
            .parse()
            .with_context(|| format!("non-year column '{}' in {}", field, path.display()))?;
        years.push(year);
    }

    let mut grid = Grid::new(years.clone());
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading grid row {}", i + 1))?;
        let concept = record
            .get(1)
            .with_context(|| format!("grid row {} missing concept", i + 1))?
            .to_string();
        let mut row = GridRow::new(concept);
        row.required = record.get(2) == Some("1");
        for (j, year) in years.iter().enumerate() {
            if let Some(code) = record.get(3 + j) {
                if !code.trim().is_empty() {
                    row.cells.insert(*year, code.trim().to_string());
                }
            }
        }
        grid.rows.push(row);
    }
    grid.renumber();
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn grid_round_trips_through_csv() {
        let mut grid = Grid::new(vec![1999, 2001]);
        let mut r1 = GridRow::new("ira_balance");
        r1.cells.insert(1999, "S517".into());
        r1.required = true;
        let r2 = GridRow::new("empty_concept");
        grid.rows.push(r1);
        grid.rows.push(r2);
        grid.renumber();

        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        write_grid(&grid, &path).unwrap();
        let loaded = read_grid(&path).unwrap();

        assert_eq!(loaded.years, vec![1999, 2001]);
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].concept, "ira_balance");
        assert!(loaded.rows[0].required);
        assert_eq!(loaded.rows[0].code(1999), Some("S517"));
        assert_eq!(loaded.rows[0].code(2001), None);
        // a concept with zero cells still appears
        assert_eq!(loaded.rows[1].concept, "empty_concept");
        assert!(loaded.rows[1].is_empty());
    }

    #[test]
    fn conflict_ledger_lists_every_dropped_candidate() {
        let conflicts = vec![
            Conflict {
                concept: "ira_balance".into(),
                year: 1999,
                kept: "S517".into(),
                dropped: "ER100".into(),
                reason: "modules FAM and WLTH both define concept".into(),
            },
            Conflict {
                concept: "age_head".into(),
                year: 2001,
                kept: "ER20".into(),
                dropped: "ER21".into(),
                reason: "duplicate concept within module".into(),
            },
        ];
        let dir = tempdir().unwrap();
        let path = dir.path().join("conflicts.csv");
        write_conflicts(&conflicts, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "concept,year,kept,dropped,reason");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("ira_balance,1999,S517,ER100"));
        assert!(lines[2].contains("duplicate concept within module"));
    }

    #[test]
    fn empty_ledger_still_writes_a_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conflicts.csv");
        write_conflicts(&[], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "concept,year,kept,dropped,reason");
    }

    #[test]
    fn rejects_grid_without_year_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "row,concept\n1,a\n").unwrap();
        assert!(read_grid(&path).is_err());
    }
}
