use super::rules::{validate_rules, MergeGroup};
use super::types::{Grid, GridRow};
use crate::report::RunReport;
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Collapse each merge group into one row by strict left-to-right
/// fallback-fill: per year, the merged cell is the first non-empty code
/// among the group's present rows in declared order. Source rows are
/// removed — a concept named in a group never survives standalone. Rows in
/// no group pass through untouched. Groups are processed in file order.
#[instrument(level = "info", skip_all, fields(groups = groups.len()))]
pub fn apply_merges(grid: &mut Grid, groups: &[MergeGroup], report: &mut RunReport) -> Result<()> {
    validate_rules(groups)?;

    for group in groups {
        let present: Vec<usize> = group
            .concepts
            .iter()
            .filter_map(|concept| {
                let idx = grid.rows.iter().position(|r| &r.concept == concept);
                if idx.is_none() {
                    warn!(
                        concept = %concept,
                        line = group.line,
                        "merge group names a concept absent from the grid"
                    );
                    report.merge_missing_concepts.push(concept.clone());
                }
                idx
            })
            .collect();

        if present.is_empty() {
            warn!(line = group.line, "merge group matched no grid rows, producing nothing");
            continue;
        }

        let mut cells: BTreeMap<i32, String> = BTreeMap::new();
        for &year in &grid.years {
            // declared order, first non-empty wins
            let code = present
                .iter()
                .find_map(|&i| grid.rows[i].code(year).map(str::to_string));
            if let Some(code) = code {
                cells.insert(year, code);
            }
        }

        let merged = GridRow {
            row: 0,
            concept: group.merged_concept(),
            required: present.iter().any(|&i| grid.rows[i].required),
            cells,
        };

        // replace the group's first present row, drop the rest
        let insert_at = present[0];
        grid.rows[insert_at] = merged;
        let mut remove: Vec<usize> = present[1..].to_vec();
        remove.sort_unstable_by(|a, b| b.cmp(a));
        for idx in remove {
            grid.rows.remove(idx);
        }
        report.merge_groups_applied += 1;
    }

    grid.renumber();
    info!(
        applied = report.merge_groups_applied,
        rows = grid.rows.len(),
        "applied merge groups"
    );
    Ok(())
}
