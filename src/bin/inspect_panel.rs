use glob::glob;
use panelgrid::source::Module;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::collections::BTreeMap;
use std::{env, fs::File, path::Path, process::exit};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <PANEL_DIR>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// Walk every partition file under the panel root and print its row count
/// and column list, plus per-module and grand totals.
fn inspect(panel_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let pattern = format!("{}/**/*.parquet", panel_dir.display());
    let mut total_rows: i64 = 0;
    let mut per_module: BTreeMap<&'static str, i64> = BTreeMap::new();
    let mut partitions = 0usize;

    for entry in glob(&pattern)? {
        let path = entry?;
        let file = File::open(&path)?;
        let reader = SerializedFileReader::new(file)?;
        let meta = reader.metadata().file_metadata();

        let rel = path.strip_prefix(panel_dir).unwrap_or(&path);
        let columns: Vec<&str> = meta
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name())
            .collect();
        println!(
            "{:<40} {:>10} rows  [{}]",
            rel.display(),
            meta.num_rows(),
            columns.join(", ")
        );
        if let Some(module) = module_of(rel) {
            *per_module.entry(module.as_str()).or_insert(0) += meta.num_rows();
        }
        total_rows += meta.num_rows();
        partitions += 1;
    }

    if partitions == 0 {
        println!("no partitions under {}", panel_dir.display());
    } else {
        for (module, rows) in &per_module {
            println!("  {}: {} rows", module, rows);
        }
        println!("{} partition(s), {} rows total", partitions, total_rows);
    }
    Ok(())
}

/// Recover the module from a partition path, which encodes it either as a
/// `module=<M>` directory or as the `<M>.parquet` file name.
fn module_of(path: &Path) -> Option<Module> {
    path.components().rev().find_map(|c| {
        let s = c.as_os_str().to_str()?;
        let tag = s
            .strip_prefix("module=")
            .or_else(|| s.strip_suffix(".parquet"))?;
        Module::from_str(tag)
    })
}
