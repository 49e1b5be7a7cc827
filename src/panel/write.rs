use crate::source::Module;
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write one (year, module) partition. The file is written to a `.tmp` path
/// and renamed into place, so readers never see a partially written
/// partition. Paths are disjoint per (year, module) by construction, which
/// is what makes the partition writes safe to run in parallel.
pub fn write_partition(
    batch: &RecordBatch,
    panel_root: &Path,
    year: i32,
    module: Module,
    by_module: bool,
) -> Result<PathBuf> {
    let (dir, file_name) = if by_module {
        (
            panel_root
                .join(format!("year={}", year))
                .join(format!("module={}", module.as_str())),
            "data.parquet".to_string(),
        )
    } else {
        (
            panel_root.join(format!("year={}", year)),
            format!("{}.parquet", module.as_str()),
        )
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating partition dir {}", dir.display()))?;

    let final_path = dir.join(&file_name);
    let tmp_path = dir.join(format!("{}.tmp", file_name));

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(
            ZstdLevel::try_new(3).context("invalid zstd level")?,
        ))
        .set_dictionary_enabled(true)
        .build();

    let file = File::create(&tmp_path)
        .with_context(|| format!("creating partition file {}", tmp_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating parquet writer for partition")?;
    writer.write(batch).context("writing partition batch")?;
    writer.close().context("closing partition writer")?;

    fs::rename(&tmp_path, &final_path).with_context(|| {
        format!(
            "publishing partition {} -> {}",
            tmp_path.display(),
            final_path.display()
        )
    })?;

    debug!(
        path = %final_path.display(),
        rows = batch.num_rows(),
        "wrote partition"
    );
    Ok(final_path)
}
