use super::downcast::{numeric_column, string_column};
use super::write::write_partition;
use crate::config::PipelineConfig;
use crate::dict::types::{Dtype, VariableRecord};
use crate::dict::Dictionary;
use crate::grid::Grid;
use crate::report::{PartitionSummary, RunReport};
use crate::source::{layout, reader, Module, SourcePair};
use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

type CodeIndex<'a> = HashMap<(i32, Module, &'a str), &'a VariableRecord>;

enum PartitionOutcome {
    Written(PartitionSummary),
    Skipped { table: String, reason: String },
}

/// Materialize the panel: for every (year, module) source table, read only
/// the columns the final grid references, rename them to concepts, downcast,
/// and publish one partition. Partitions are independent and processed in
/// parallel; their output paths are disjoint by construction.
#[instrument(level = "info", skip_all, fields(partitions = pairs.len()))]
pub fn materialize_panel(
    grid: &Grid,
    dict: &Dictionary,
    pairs: &[SourcePair],
    cfg: &PipelineConfig,
    report: &mut RunReport,
) -> Result<()> {
    let by_code = dict.by_code();

    // Grid cells whose code no module defines for that year: count them once,
    // up front, so the per-partition loops stay symmetric.
    for row in &grid.rows {
        for (&year, code) in &row.cells {
            let known = by_code.contains_key(&(year, Module::Family, code.as_str()))
                || by_code.contains_key(&(year, Module::Wealth, code.as_str()));
            if !known {
                warn!(concept = %row.concept, year, code = %code, "grid code unknown to the dictionary");
                report.missing_columns += 1;
            }
        }
    }

    let outcomes: Vec<Result<PartitionOutcome>> = pairs
        .par_iter()
        .map(|pair| process_partition(pair, grid, &by_code, cfg))
        .collect();

    for outcome in outcomes {
        match outcome? {
            PartitionOutcome::Written(summary) => report.add_partition(summary),
            PartitionOutcome::Skipped { table, reason } => report.skip_table(&table, &reason),
        }
    }

    info!(
        partitions = report.partitions.len(),
        rows = report.total_rows(),
        coerced = report.coerced_cells,
        "materialized panel"
    );
    Ok(())
}

fn process_partition(
    pair: &SourcePair,
    grid: &Grid,
    by_code: &CodeIndex<'_>,
    cfg: &PipelineConfig,
) -> Result<PartitionOutcome> {
    let table = format!("{}{}", pair.module.as_str(), pair.year);

    // columns this partition owns: grid cells for this year whose code the
    // dictionary attributes to this module
    let mut plan: HashMap<&str, (&str, Dtype)> = HashMap::new();
    let mut codes: Vec<&str> = Vec::new();
    for row in &grid.rows {
        if let Some(code) = row.code(pair.year) {
            if let Some(record) = by_code.get(&(pair.year, pair.module, code)) {
                plan.insert(code, (row.concept.as_str(), record.dtype));
                codes.push(code);
            }
        }
    }
    if plan.is_empty() {
        return Ok(PartitionOutcome::Skipped {
            table,
            reason: "final grid references no columns of this table".into(),
        });
    }

    let full_layout = match layout::parse_layout(&pair.layout_path) {
        Ok(l) => l,
        Err(e) => {
            warn!(table = %table, error = %e, "unparseable layout, partition skipped");
            return Ok(PartitionOutcome::Skipped {
                table,
                reason: e.to_string(),
            });
        }
    };
    let projected = full_layout.project(&codes);
    let missing_columns = (codes.len() - projected.columns.len()) as u64;
    if missing_columns > 0 {
        let have: Vec<&str> = projected.column_names();
        let absent: Vec<&str> = codes
            .iter()
            .copied()
            .filter(|c| !have.contains(c))
            .collect();
        warn!(
            table = %table,
            absent = ?absent,
            "grid references columns absent from the layout"
        );
    }

    // only the projected spans are materialized; unreferenced columns are
    // sliced away at read time
    let rows = match reader::read_rows(&pair.data_path, &projected, None) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(table = %table, error = %e, "unreadable data file, partition skipped");
            return Ok(PartitionOutcome::Skipped {
                table,
                reason: e.to_string(),
            });
        }
    };
    if rows.is_empty() {
        return Ok(PartitionOutcome::Skipped {
            table,
            reason: "data file holds no rows".into(),
        });
    }

    let n = rows.len();
    let mut fields = vec![
        Field::new("year", DataType::Int32, false),
        Field::new("module", DataType::Utf8, false),
    ];
    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from(vec![pair.year; n])),
        Arc::new(StringArray::from(vec![pair.module.as_str(); n])),
    ];

    let mut coerced = 0u64;
    for (idx, col) in projected.columns.iter().enumerate() {
        let Some(&(concept, dtype)) = plan.get(col.name.as_str()) else {
            continue;
        };
        let values = reader::column_values(&rows, idx);
        let array = match dtype {
            Dtype::Numeric => {
                let down = numeric_column(&values);
                coerced += down.coerced;
                down.array
            }
            Dtype::String => string_column(&values),
        };
        fields.push(Field::new(concept, array.data_type().clone(), true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema, arrays)
        .with_context(|| format!("assembling record batch for {}", table))?;

    write_partition(
        &batch,
        &cfg.panel_dir,
        pair.year,
        pair.module,
        cfg.partition_by_module,
    )?;

    Ok(PartitionOutcome::Written(PartitionSummary {
        year: pair.year,
        module: pair.module.as_str().to_string(),
        rows: n as u64,
        columns: projected.columns.len(),
        coerced_cells: coerced,
        missing_columns,
    }))
}
