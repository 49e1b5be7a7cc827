use anyhow::{Context, Result};
use panelgrid::{
    config::PipelineConfig,
    dict::{self, SampledNumericShare},
    grid, panel,
    report::RunReport,
    source,
};
use std::{env, fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,panelgrid=info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();
    info!("startup");

    // ─── 2) load config ──────────────────────────────────────────────
    let cfg = match env::args().nth(1).map(PathBuf::from) {
        Some(path) => PipelineConfig::load(Some(&path))?,
        None => {
            let default = PathBuf::from("panelgrid.yaml");
            if default.exists() {
                PipelineConfig::load(Some(&default))?
            } else {
                PipelineConfig::default()
            }
        }
    };

    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("creating out dir {}", cfg.out_dir.display()))?;
    if cfg.rebuild && cfg.panel_dir.exists() {
        info!(path = %cfg.panel_dir.display(), "rebuild requested, removing panel output");
        fs::remove_dir_all(&cfg.panel_dir)
            .with_context(|| format!("removing {}", cfg.panel_dir.display()))?;
    }
    fs::create_dir_all(&cfg.panel_dir)
        .with_context(|| format!("creating panel dir {}", cfg.panel_dir.display()))?;

    let mut report = RunReport::new();

    // ─── 3) scan sources, build the variable dictionary ──────────────
    let pairs = source::discover_pairs(
        &cfg.data_dir,
        cfg.manifest.as_deref(),
        cfg.years.as_deref(),
        &mut report,
    )?;
    let inference = SampledNumericShare::default();
    let dictionary = dict::build_dictionary(&pairs, cfg.sample_rows, &inference, &mut report)?;
    dict::write_mapping(&dictionary, &cfg.out_dir.join("mapping.csv"))?;

    // ─── 4) pivot into the canonical grid ────────────────────────────
    let mut canonical = grid::build_grid(&dictionary, cfg.conflict_policy, &mut report)?;
    grid::write_grid(&canonical, &cfg.out_dir.join("canonical_grid.csv"))?;
    grid::write_conflicts(&report.conflicts, &cfg.out_dir.join("conflicts.csv"))?;

    // ─── 5) apply merge groups ───────────────────────────────────────
    if let Some(rules_path) = &cfg.merge_rules {
        let groups = grid::parse_rules(rules_path)?;
        grid::apply_merges(&mut canonical, &groups, &mut report)?;
    } else {
        info!("no merge rules configured, grid passes through unchanged");
    }
    grid::write_grid(&canonical, &cfg.out_dir.join("final_grid.csv"))?;

    // ─── 6) materialize the panel ────────────────────────────────────
    panel::materialize_panel(&canonical, &dictionary, &pairs, &cfg, &mut report)?;

    // ─── 7) publish diagnostics ──────────────────────────────────────
    report.write(&cfg.out_dir)?;
    info!(
        partitions = report.partitions.len(),
        rows = report.total_rows(),
        "pipeline complete"
    );
    Ok(())
}
