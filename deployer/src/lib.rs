//! botdeploy library
//!
//! Provisions the cloud resources a bot needs, publishes its compiled
//! package and language models, and tracks publish status.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod publish;
pub mod storage;
pub mod utils;
pub mod workers;
