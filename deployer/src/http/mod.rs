pub mod arm;
pub mod client;
pub mod graph;
pub mod hosting;
pub mod luis;
