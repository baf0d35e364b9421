//! API models

pub mod arm;
pub mod graph;
pub mod hosting;
pub mod luis;
