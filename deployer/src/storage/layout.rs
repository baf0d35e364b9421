//! Project layout: every path the deployment touches, derived from the project root

use std::path::{Path, PathBuf};

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Folder (inside the project and inside the publish output) holding the declarative bot assets
pub const ASSETS_DIR_NAME: &str = "dialogs";

/// Paths of a bot project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Root of the bot runtime project
    pub project_dir: PathBuf,
}

impl ProjectLayout {
    /// Create a new project layout
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// ARM template describing the bot resources
    pub fn template_file(&self) -> File {
        File::new(
            self.project_dir
                .join("deployment-templates")
                .join("template-with-preexisting-rg.json"),
        )
    }

    /// Declarative assets shipped with the project
    pub fn assets_dir(&self) -> Dir {
        Dir::new(self.project_dir.join(ASSETS_DIR_NAME))
    }

    /// Settings document read and written by `create`
    pub fn settings_file(&self) -> File {
        File::new(
            self.assets_dir()
                .path()
                .join("settings")
                .join("appsettings.json"),
        )
    }

    /// Output folder of the build step
    pub fn publish_dir(&self) -> Dir {
        Dir::new(self.project_dir.join("bin").join("release").join("publish"))
    }

    /// Declarative assets copied into the publish output
    pub fn deployed_assets_dir(&self) -> Dir {
        self.publish_dir().subdir(ASSETS_DIR_NAME)
    }

    /// Settings document shipped inside the publish output
    pub fn deploy_settings_file(&self) -> File {
        File::new(
            self.deployed_assets_dir()
                .path()
                .join("settings")
                .join("appsettings.json"),
        )
    }

    /// Compiled language model artifacts
    pub fn generated_dir(&self) -> Dir {
        self.deployed_assets_dir().subdir("generated")
    }

    /// Archive uploaded to the hosting endpoint
    pub fn archive_file(&self) -> File {
        File::new(self.project_dir.join("code.zip"))
    }

    /// Deployment descriptor naming the project to build on the host
    pub fn descriptor_file(&self) -> File {
        File::new(self.project_dir.join(".deployment"))
    }

    /// Persisted publish history
    pub fn publish_history_file(&self) -> File {
        File::new(self.project_dir.join(".botdeploy").join("publishHistory.json"))
    }
}
