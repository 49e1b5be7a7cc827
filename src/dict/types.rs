use crate::source::Module;
use serde::{Deserialize, Serialize};

/// Light type classification used to pick a column strategy downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    Numeric,
    String,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Numeric => "numeric",
            Dtype::String => "string",
        }
    }
}

/// One variable as it appears in one source table: the canonical concept it
/// resolves to plus everything the materializer needs to find it again.
/// Unique per (concept, year, module); immutable once built.
#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub concept: String,
    pub year: i32,
    pub module: Module,
    pub source_code: String,
    pub label: String,
    pub category: String,
    pub dtype: Dtype,
    /// Set when type inference had nothing to go on and defaulted to string.
    pub low_confidence: bool,
    pub required: bool,
}
