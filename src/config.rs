use crate::source::Module;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// How a (concept, year) cell defined by both modules is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    PreferFamily,
    PreferWealth,
    FirstWins,
    FailOnConflict,
}

impl ConflictPolicy {
    pub fn preferred_module(&self) -> Option<Module> {
        match self {
            ConflictPolicy::PreferFamily => Some(Module::Family),
            ConflictPolicy::PreferWealth => Some(Module::Wealth),
            _ => None,
        }
    }
}

/// Explicit run configuration. Everything the stages need is carried here;
/// no stage consults the working directory or environment on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding layout (.sas) and fixed-width (.txt) source files.
    pub data_dir: PathBuf,
    /// Directory for intermediate tables and the run report.
    pub out_dir: PathBuf,
    /// Root of the partitioned panel output.
    pub panel_dir: PathBuf,
    /// Optional manifest naming the source files to use; globbing otherwise.
    pub manifest: Option<PathBuf>,
    /// Merge rule file, one group of concepts per line.
    pub merge_rules: Option<PathBuf>,
    pub conflict_policy: ConflictPolicy,
    /// Restrict the run to these survey years.
    pub years: Option<Vec<i32>>,
    pub partition_by_module: bool,
    /// Remove any existing panel output before materializing.
    pub rebuild: bool,
    /// Rows sampled per table for type inference.
    pub sample_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("out"),
            panel_dir: PathBuf::from("out/panel"),
            manifest: None,
            merge_rules: None,
            conflict_policy: ConflictPolicy::PreferWealth,
            years: None,
            partition_by_module: true,
            rebuild: false,
            sample_rows: 500,
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file if one is given and exists, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<PipelineConfig> {
        match path {
            Some(p) if p.exists() => {
                let text = fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                let cfg: PipelineConfig = serde_yaml::from_str(&text)
                    .with_context(|| format!("parsing config {}", p.display()))?;
                info!(path = %p.display(), "loaded pipeline config");
                Ok(cfg)
            }
            Some(p) => anyhow::bail!("config file not found: {}", p.display()),
            None => Ok(PipelineConfig::default()),
        }
    }
}
