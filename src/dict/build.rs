use super::canonical::canonical_for;
use super::infer::TypeInference;
use super::types::VariableRecord;
use crate::report::{Conflict, RunReport};
use crate::source::{layout, reader, Module, SourcePair};
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// The variable dictionary: every (source_code, year, module) seen across
/// the scanned tables, in scan order. Scan order matters — the grid builder
/// derives row order from first appearance of each concept.
pub struct Dictionary {
    pub records: Vec<VariableRecord>,
}

impl Dictionary {
    /// All survey years present, sorted.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .records
            .iter()
            .map(|r| r.year)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable();
        years
    }

    /// Index records by (year, module, source_code) for partition planning.
    pub fn by_code(&self) -> HashMap<(i32, Module, &str), &VariableRecord> {
        self.records
            .iter()
            .map(|r| ((r.year, r.module, r.source_code.as_str()), r))
            .collect()
    }
}

/// Scan every source pair and build the dictionary. A table that cannot be
/// parsed is skipped with a diagnostic; the stage only fails when nothing at
/// all could be scanned.
#[instrument(level = "info", skip_all, fields(pairs = pairs.len()))]
pub fn build_dictionary(
    pairs: &[SourcePair],
    sample_rows: usize,
    inference: &dyn TypeInference,
    report: &mut RunReport,
) -> Result<Dictionary> {
    let mut records: Vec<VariableRecord> = Vec::new();
    let mut seen: HashMap<(String, i32, Module), usize> = HashMap::new();
    let mut scanned = 0u64;

    for pair in pairs {
        let table = format!("{}{}", pair.module.as_str(), pair.year);

        let table_layout = match layout::parse_layout(&pair.layout_path) {
            Ok(l) => l,
            Err(e) => {
                warn!(table = %table, error = %e, "unparseable layout, skipping table");
                report.skip_table(&table, &e.to_string());
                continue;
            }
        };
        let sample = match reader::read_rows(&pair.data_path, &table_layout, Some(sample_rows)) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(table = %table, error = %e, "unreadable data file, skipping table");
                report.skip_table(&table, &e.to_string());
                continue;
            }
        };
        scanned += 1;

        for (idx, col) in table_layout.columns.iter().enumerate() {
            let (concept, category) = canonical_for(pair.module, &col.name, &col.label);
            let key = (concept.clone(), pair.year, pair.module);
            if let Some(&kept_idx) = seen.get(&key) {
                // same concept twice within one module-year: first wins
                report.add_conflict(Conflict {
                    concept: concept.clone(),
                    year: pair.year,
                    kept: records[kept_idx].source_code.clone(),
                    dropped: col.name.clone(),
                    reason: "duplicate concept within module".into(),
                });
                continue;
            }
            seen.insert(key, records.len());

            let values = reader::column_values(&sample, idx);
            let (dtype, low_confidence) = inference.infer(&values);

            records.push(VariableRecord {
                concept,
                year: pair.year,
                module: pair.module,
                source_code: col.name.clone(),
                label: col.label.clone(),
                category,
                dtype,
                low_confidence,
                required: false,
            });
        }
    }

    if scanned == 0 {
        bail!("no source table could be scanned");
    }

    report.tables_scanned = scanned;
    report.dictionary_records = records.len() as u64;
    info!(
        tables = scanned,
        records = records.len(),
        "built variable dictionary"
    );
    Ok(Dictionary { records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::infer::SampledNumericShare;
    use crate::dict::types::Dtype;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_pair(
        dir: &std::path::Path,
        module: Module,
        year: i32,
        layout: &str,
        data: &str,
    ) -> SourcePair {
        let base = match module {
            Module::Family => format!("FAM{}ER", year),
            Module::Wealth => format!("WLTH{}", year),
        };
        let layout_path: PathBuf = dir.join(format!("{}.sas", base));
        let data_path: PathBuf = dir.join(format!("{}.txt", base));
        fs::write(&layout_path, layout).unwrap();
        fs::write(&data_path, data).unwrap();
        SourcePair {
            year,
            module,
            layout_path,
            data_path,
        }
    }

    #[test]
    fn builds_records_with_inferred_types() {
        let dir = tempdir().unwrap();
        let pair = write_pair(
            dir.path(),
            Module::Wealth,
            1999,
            "S515 1 - 6  S599 7 - 10\nS515 LABEL=\"IRA BALANCE\"\nS599 LABEL=\"NOTES\"\n",
            "  1200 abcd\n  3400 efgh\n",
        );
        let mut report = RunReport::new();
        let dict = build_dictionary(
            &[pair],
            500,
            &SampledNumericShare::default(),
            &mut report,
        )
        .unwrap();

        assert_eq!(dict.records.len(), 2);
        let ira = &dict.records[0];
        assert_eq!(ira.concept, "ira_balance");
        assert_eq!(ira.dtype, Dtype::Numeric);
        assert!(!ira.low_confidence);
        let notes = &dict.records[1];
        assert_eq!(notes.dtype, Dtype::String);
        assert_eq!(dict.years(), vec![1999]);
    }

    #[test]
    fn bad_table_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let good = write_pair(
            dir.path(),
            Module::Family,
            1999,
            "CHILD 1 - 2\n",
            " 3\n 0\n",
        );
        let bad = write_pair(
            dir.path(),
            Module::Family,
            2001,
            "no spans here\n",
            "irrelevant\n",
        );
        let mut report = RunReport::new();
        let dict = build_dictionary(
            &[good, bad],
            500,
            &SampledNumericShare::default(),
            &mut report,
        )
        .unwrap();
        assert_eq!(dict.records.len(), 1);
        assert_eq!(report.tables_scanned, 1);
        assert_eq!(report.tables_skipped.len(), 1);
    }

    #[test]
    fn all_tables_bad_is_fatal() {
        let dir = tempdir().unwrap();
        let bad = write_pair(dir.path(), Module::Family, 1999, "nothing\n", "x\n");
        let mut report = RunReport::new();
        assert!(build_dictionary(
            &[bad],
            500,
            &SampledNumericShare::default(),
            &mut report
        )
        .is_err());
    }
}
