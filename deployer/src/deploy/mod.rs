//! Provisioning and deployment of a bot project

pub mod build;
pub mod identity;
pub mod luis;
pub mod orchestrator;
pub mod package;
pub mod progress;
pub mod provision;
pub mod template;
pub mod upload;
