pub mod discover;
pub mod layout;
pub mod reader;

pub use discover::{discover_pairs, SourcePair};
pub use layout::{ColumnSpec, TableLayout};
pub use reader::read_rows;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two source-data families being integrated. Family extracts carry
/// demographics, wealth extracts carry asset/debt variables; both exist for
/// the same survey years and frequently define the same concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Family,
    Wealth,
}

impl Module {
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Family => "FAM",
            Module::Wealth => "WLTH",
        }
    }

    pub fn from_str(s: &str) -> Option<Module> {
        match s.to_ascii_uppercase().as_str() {
            "FAM" => Some(Module::Family),
            "WLTH" => Some(Module::Wealth),
            _ => None,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_round_trips_through_str() {
        assert_eq!(Module::from_str("FAM"), Some(Module::Family));
        assert_eq!(Module::from_str("wlth"), Some(Module::Wealth));
        assert_eq!(Module::from_str("OTHER"), None);
        assert_eq!(Module::Wealth.as_str(), "WLTH");
    }
}
