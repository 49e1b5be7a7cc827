use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// A source table that was skipped rather than aborting the stage.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedTable {
    pub table: String,
    pub reason: String,
}

/// One (concept, year) cell where more than one candidate code existed.
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub concept: String,
    pub year: i32,
    pub kept: String,
    pub dropped: String,
    pub reason: String,
}

/// Outcome of one materialized (year, module) partition.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub year: i32,
    pub module: String,
    pub rows: u64,
    pub columns: usize,
    pub coerced_cells: u64,
    pub missing_columns: u64,
}

/// Aggregated diagnostics for a whole pipeline run. Recovered row/file-level
/// failures land here so the operator sees them even though the run succeeds.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub tables_scanned: u64,
    pub tables_skipped: Vec<SkippedTable>,
    pub dictionary_records: u64,
    pub conflicts: Vec<Conflict>,
    pub merge_groups_applied: u64,
    pub merge_missing_concepts: Vec<String>,
    pub partitions: Vec<PartitionSummary>,
    pub rows_per_year: BTreeMap<i32, u64>,
    pub coerced_cells: u64,
    pub missing_columns: u64,
}

impl RunReport {
    pub fn new() -> Self {
        RunReport {
            started_at: Utc::now(),
            tables_scanned: 0,
            tables_skipped: Vec::new(),
            dictionary_records: 0,
            conflicts: Vec::new(),
            merge_groups_applied: 0,
            merge_missing_concepts: Vec::new(),
            partitions: Vec::new(),
            rows_per_year: BTreeMap::new(),
            coerced_cells: 0,
            missing_columns: 0,
        }
    }

    pub fn skip_table(&mut self, table: &str, reason: &str) {
        self.tables_skipped.push(SkippedTable {
            table: table.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn add_conflict(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }

    pub fn add_partition(&mut self, summary: PartitionSummary) {
        *self.rows_per_year.entry(summary.year).or_insert(0) += summary.rows;
        self.coerced_cells += summary.coerced_cells;
        self.missing_columns += summary.missing_columns;
        self.partitions.push(summary);
    }

    pub fn total_rows(&self) -> u64 {
        self.rows_per_year.values().sum()
    }

    /// Serialize the report to `report.json` under `out_dir`.
    pub fn write(&self, out_dir: &Path) -> Result<()> {
        let path = out_dir.join("report.json");
        let json = serde_json::to_string_pretty(self).context("serializing run report")?;
        fs::write(&path, json)
            .with_context(|| format!("writing run report {}", path.display()))?;
        info!(
            path = %path.display(),
            skipped = self.tables_skipped.len(),
            conflicts = self.conflicts.len(),
            coerced = self.coerced_cells,
            "wrote run report"
        );
        Ok(())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
