//! Build step: compile the bot runtime and stage its declarative assets

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Compiles the bot runtime into an output folder
#[async_trait]
pub trait BotBuilder: Send + Sync {
    async fn publish(&self, project_dir: &Path, output_dir: &Path) -> Result<(), DeployError>;
}

/// Builds with `dotnet publish`
#[derive(Debug, Clone)]
pub struct DotnetBuilder {
    pub project_file: String,
    pub configuration: String,
}

impl DotnetBuilder {
    pub fn new(project_file: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            project_file: project_file.into(),
            configuration: configuration.into(),
        }
    }
}

#[async_trait]
impl BotBuilder for DotnetBuilder {
    async fn publish(&self, project_dir: &Path, output_dir: &Path) -> Result<(), DeployError> {
        info!(
            "Running dotnet publish for {} into {}",
            self.project_file,
            output_dir.display()
        );

        let output = Command::new("dotnet")
            .current_dir(project_dir)
            .arg("publish")
            .arg(&self.project_file)
            .args(["-c", &self.configuration, "-o"])
            .arg(output_dir)
            .args(["-v", "q"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DeployError::BuildError(format!("Failed to run dotnet publish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(DeployError::BuildError(format!(
                "dotnet publish exited with {}: {}{}",
                output.status,
                stdout.trim(),
                stderr.trim()
            )));
        }

        debug!("dotnet publish finished");
        Ok(())
    }
}

/// Contents of the deployment descriptor for `project_file`
pub fn descriptor_contents(project_file: &str) -> String {
    format!("[config]\nproject = {}\n", project_file)
}

/// Write the deployment descriptor unless one already exists. Returns true if written.
pub async fn ensure_descriptor(file: &File, project_file: &str) -> Result<bool, DeployError> {
    if file.exists().await {
        return Ok(false);
    }
    file.write_string(&descriptor_contents(project_file)).await?;
    Ok(true)
}

/// Copy declarative assets into the publish output, overwriting existing files
pub async fn copy_assets(source: &Dir, dest: &Dir) -> Result<u64, DeployError> {
    if !source.exists().await {
        return Err(DeployError::BuildError(format!(
            "asset folder not found: {}",
            source.path().display()
        )));
    }
    dest.create().await?;
    source.copy_to(dest).await
}
