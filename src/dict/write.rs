use super::build::Dictionary;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Write the dictionary as `mapping.csv`, sorted for stable diffs. The
/// `transform` column is reserved for per-variable transforms and currently
/// always empty.
pub fn write_mapping(dict: &Dictionary, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating mapping file {}", path.display()))?;
    writer
        .write_record([
            "canonical",
            "year",
            "module",
            "source_code",
            "label",
            "category",
            "dtype",
            "required",
            "transform",
        ])
        .context("writing mapping header")?;

    let mut sorted: Vec<_> = dict.records.iter().collect();
    sorted.sort_by(|a, b| {
        (a.year, a.module, &a.concept, &a.source_code)
            .cmp(&(b.year, b.module, &b.concept, &b.source_code))
    });

    for r in sorted {
        let year = r.year.to_string();
        writer
            .write_record([
                r.concept.as_str(),
                year.as_str(),
                r.module.as_str(),
                r.source_code.as_str(),
                r.label.as_str(),
                r.category.as_str(),
                r.dtype.as_str(),
                if r.required { "1" } else { "0" },
                "",
            ])
            .with_context(|| format!("writing mapping row for {}", r.source_code))?;
    }
    writer.flush().context("flushing mapping file")?;
    info!(path = %path.display(), rows = dict.records.len(), "wrote mapping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::types::{Dtype, VariableRecord};
    use crate::source::Module;
    use tempfile::tempdir;

    fn record(concept: &str, year: i32, module: Module, code: &str) -> VariableRecord {
        VariableRecord {
            concept: concept.into(),
            year,
            module,
            source_code: code.into(),
            label: "A LABEL, WITH COMMA".into(),
            category: "Retirement/IRA".into(),
            dtype: Dtype::Numeric,
            low_confidence: false,
            required: false,
        }
    }

    #[test]
    fn writes_sorted_quoted_csv() {
        let dict = Dictionary {
            records: vec![
                record("ira_balance", 2001, Module::Wealth, "S617"),
                record("ira_balance", 1999, Module::Wealth, "S517"),
            ],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("mapping.csv");
        write_mapping(&dict, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        // 1999 sorts before 2001
        assert!(lines[1].starts_with("ira_balance,1999,WLTH,S517"));
        // comma-bearing label round-trips via quoting
        assert!(lines[1].contains("\"A LABEL, WITH COMMA\""));
    }
}
