pub mod downcast;
pub mod materialize;
pub mod write;

pub use materialize::materialize_panel;
pub use write::write_partition;
