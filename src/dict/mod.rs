pub mod build;
pub mod canonical;
pub mod infer;
pub mod types;
pub mod write;

pub use build::{build_dictionary, Dictionary};
pub use canonical::canonical_for;
pub use infer::{SampledNumericShare, TypeInference};
pub use types::{Dtype, VariableRecord};
pub use write::write_mapping;
