use anyhow::Result;
use panelgrid::grid::{parse_rules, read_grid, validate_rules};
use std::{env, path::Path, process::exit};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <RULES_FILE> <GRID_CSV>", args[0]);
        exit(1);
    }
    match check(Path::new(&args[1]), Path::new(&args[2])) {
        Ok(missing) if missing == 0 => println!("rules OK"),
        Ok(missing) => {
            println!("{} concept reference(s) missing from the grid", missing);
            exit(2);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit(1);
        }
    }
}

/// Validate a merge-rule file against a grid CSV before a pipeline run:
/// rejects ambiguous rule sets and reports concepts no grid row carries.
fn check(rules_path: &Path, grid_path: &Path) -> Result<usize> {
    let groups = parse_rules(rules_path)?;
    validate_rules(&groups)?;
    let grid = read_grid(grid_path)?;

    let mut missing = 0usize;
    for group in &groups {
        for concept in &group.concepts {
            if grid.find(concept).is_none() {
                println!(
                    "line {}: concept '{}' not present in {}",
                    group.line,
                    concept,
                    grid_path.display()
                );
                missing += 1;
            }
        }
    }
    println!(
        "{} group(s) over {} grid row(s)",
        groups.len(),
        grid.rows.len()
    );
    Ok(missing)
}
