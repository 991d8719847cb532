//! CLI command implementations

pub mod render;
pub mod simulate;
pub mod table;
