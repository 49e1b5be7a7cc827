use super::Module;
use crate::report::RunReport;
use anyhow::{bail, Context, Result};
use glob::glob;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static FAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(FAM(\d{4})ER)\.(sas|txt)$").unwrap());
static WLTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(WLTH(\d{4}))\.(sas|txt)$").unwrap());

/// One per-year source table: a structure-definition file and the
/// fixed-width data file it describes.
#[derive(Debug, Clone)]
pub struct SourcePair {
    pub year: i32,
    pub module: Module,
    pub layout_path: PathBuf,
    pub data_path: PathBuf,
}

#[derive(Default)]
struct PairSlot {
    layout: Option<PathBuf>,
    data: Option<PathBuf>,
}

/// Build the list of source pairs, either from a manifest file (one name per
/// line, `#` comments) or by scanning `data_dir`. Unrecognized names are
/// skipped with a warning; a pair missing one half is reported and skipped.
/// `years`, when given, restricts the result to those survey years.
pub fn discover_pairs(
    data_dir: &Path,
    manifest: Option<&Path>,
    years: Option<&[i32]>,
    report: &mut RunReport,
) -> Result<Vec<SourcePair>> {
    let names: Vec<String> = match manifest {
        Some(list) => {
            let text = fs::read_to_string(list)
                .with_context(|| format!("reading manifest {}", list.display()))?;
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect()
        }
        None => {
            let mut found = Vec::new();
            for pattern in ["*.sas", "*.txt"] {
                let full = format!("{}/{}", data_dir.display(), pattern);
                for entry in glob(&full).context("globbing data dir")? {
                    match entry {
                        Ok(p) => {
                            if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
                                found.push(name.to_string());
                            }
                        }
                        Err(e) => warn!("unreadable dir entry: {e}"),
                    }
                }
            }
            found.sort();
            found
        }
    };

    let mut slots: BTreeMap<(i32, Module), PairSlot> = BTreeMap::new();
    for name in &names {
        let (module, year, ext) = match parse_name(name) {
            Some(parts) => parts,
            None => {
                warn!(file = %name, "unrecognized source file name, skipping");
                continue;
            }
        };
        if let Some(keep) = years {
            if !keep.contains(&year) {
                continue;
            }
        }
        let slot = slots.entry((year, module)).or_default();
        let path = data_dir.join(name);
        match ext.as_str() {
            "sas" => slot.layout = Some(path),
            _ => slot.data = Some(path),
        }
    }

    let mut pairs = Vec::new();
    for ((year, module), slot) in slots {
        match (slot.layout, slot.data) {
            (Some(layout_path), Some(data_path)) => pairs.push(SourcePair {
                year,
                module,
                layout_path,
                data_path,
            }),
            (layout, data) => {
                let missing = if layout.is_none() { "layout" } else { "data" };
                warn!(year, module = %module, missing, "incomplete source pair, skipping");
                report.skip_table(
                    &format!("{}{}", module.as_str(), year),
                    &format!("missing {} file", missing),
                );
            }
        }
    }

    if pairs.is_empty() {
        bail!("no complete source pairs found under {}", data_dir.display());
    }
    info!(pairs = pairs.len(), "discovered source tables");
    Ok(pairs)
}

fn parse_name(name: &str) -> Option<(Module, i32, String)> {
    if let Some(cap) = FAM_RE.captures(name) {
        let year = cap[2].parse().ok()?;
        return Some((Module::Family, year, cap[3].to_lowercase()));
    }
    if let Some(cap) = WLTH_RE.captures(name) {
        let year = cap[2].parse().ok()?;
        return Some((Module::Wealth, year, cap[3].to_lowercase()));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn pairs_by_year_and_module() {
        let dir = tempdir().unwrap();
        for name in [
            "FAM1999ER.sas",
            "FAM1999ER.txt",
            "WLTH1999.sas",
            "WLTH1999.txt",
            "FAM2001ER.sas", // data half missing
            "README.md",
        ] {
            touch(dir.path(), name);
        }
        let mut report = RunReport::new();
        let pairs = discover_pairs(dir.path(), None, None, &mut report).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].year, 1999);
        assert_eq!(pairs[0].module, Module::Family);
        assert_eq!(pairs[1].module, Module::Wealth);
        assert_eq!(report.tables_skipped.len(), 1);
    }

    #[test]
    fn manifest_controls_selection() {
        let dir = tempdir().unwrap();
        for name in [
            "FAM1999ER.sas",
            "FAM1999ER.txt",
            "WLTH1999.sas",
            "WLTH1999.txt",
        ] {
            touch(dir.path(), name);
        }
        let manifest = dir.path().join("file_list.txt");
        fs::write(&manifest, "# family only\nFAM1999ER.sas\nFAM1999ER.txt\n").unwrap();
        let mut report = RunReport::new();
        let pairs = discover_pairs(dir.path(), Some(&manifest), None, &mut report).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].module, Module::Family);
    }

    #[test]
    fn year_filter_applies() {
        let dir = tempdir().unwrap();
        for name in [
            "FAM1999ER.sas",
            "FAM1999ER.txt",
            "FAM2001ER.sas",
            "FAM2001ER.txt",
        ] {
            touch(dir.path(), name);
        }
        let mut report = RunReport::new();
        let pairs = discover_pairs(dir.path(), None, Some(&[2001]), &mut report).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].year, 2001);
    }
}
