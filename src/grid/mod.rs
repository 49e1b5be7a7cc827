pub mod build;
pub mod io;
pub mod merge;
pub mod rules;
pub mod types;

pub use build::build_grid;
pub use io::{read_grid, write_conflicts, write_grid};
pub use merge::apply_merges;
pub use rules::{parse_rules, validate_rules, MergeGroup};
pub use types::{Grid, GridRow};
