use super::types::{Grid, GridRow};
use crate::config::ConflictPolicy;
use crate::dict::Dictionary;
use crate::report::{Conflict, RunReport};
use crate::source::Module;
use anyhow::{bail, Result};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Pivot the dictionary into the concept × year grid. Rows appear in order
/// of the concept's first appearance across the scanned inputs; cells where
/// both modules define the concept are resolved by `policy`, and every
/// resolution that drops a candidate is logged as a conflict.
#[instrument(level = "info", skip_all, fields(records = dict.records.len()))]
pub fn build_grid(
    dict: &Dictionary,
    policy: ConflictPolicy,
    report: &mut RunReport,
) -> Result<Grid> {
    let mut grid = Grid::new(dict.years());
    let mut index: HashMap<&str, usize> = HashMap::new();
    // per row, per year: which module's code currently occupies the cell
    let mut owners: Vec<HashMap<i32, Module>> = Vec::new();

    for record in &dict.records {
        let row_idx = match index.get(record.concept.as_str()) {
            Some(&i) => i,
            None => {
                let i = grid.rows.len();
                index.insert(record.concept.as_str(), i);
                grid.rows.push(GridRow::new(record.concept.clone()));
                owners.push(HashMap::new());
                i
            }
        };
        let row = &mut grid.rows[row_idx];
        row.required |= record.required;

        match owners[row_idx].get(&record.year).copied() {
            None => {
                owners[row_idx].insert(record.year, record.module);
                row.cells.insert(record.year, record.source_code.clone());
            }
            Some(existing) if existing == record.module => {
                // duplicate within one module was already reported by the
                // dictionary builder; nothing to resolve here
                debug!(
                    concept = %record.concept,
                    year = record.year,
                    "ignoring same-module duplicate"
                );
            }
            Some(existing) => {
                let current = row.cells.get(&record.year).cloned().unwrap_or_default();
                let keep_incoming = match policy {
                    ConflictPolicy::FailOnConflict => {
                        bail!(
                            "concept {} defined by both modules in {} ({} vs {})",
                            record.concept,
                            record.year,
                            current,
                            record.source_code
                        );
                    }
                    ConflictPolicy::FirstWins => false,
                    ConflictPolicy::PreferFamily | ConflictPolicy::PreferWealth => {
                        policy.preferred_module() == Some(record.module)
                    }
                };
                let (kept, dropped) = if keep_incoming {
                    owners[row_idx].insert(record.year, record.module);
                    row.cells.insert(record.year, record.source_code.clone());
                    (record.source_code.clone(), current)
                } else {
                    (current, record.source_code.clone())
                };
                report.add_conflict(Conflict {
                    concept: record.concept.clone(),
                    year: record.year,
                    kept,
                    dropped,
                    reason: format!("modules {} and {} both define concept", existing, record.module),
                });
            }
        }
    }

    grid.renumber();
    info!(
        rows = grid.rows.len(),
        years = grid.years.len(),
        conflicts = report.conflicts.len(),
        "built canonical grid"
    );
    Ok(grid)
}
