pub mod config;
pub mod dict;
pub mod grid;
pub mod panel;
pub mod report;
pub mod source;
