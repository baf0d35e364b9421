//! Deployment configuration

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::errors::DeployError;
use crate::storage::layout::ProjectLayout;
use crate::storage::settings::{BuildSettings, EndpointSettings, ToolSettings};

pub const SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";
pub const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";
pub const GRAPH_TOKEN_ENV: &str = "AZURE_GRAPH_TOKEN";

/// Everything one create/deploy invocation needs. Immutable once built.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub subscription_id: String,

    /// Directory tenant the identity is registered in
    pub tenant_id: String,

    /// Bearer token for the resource manager and LUIS authoring APIs
    pub access_token: SecretString,

    /// Bearer token for the directory graph API
    pub graph_token: SecretString,

    /// Project paths
    pub layout: ProjectLayout,

    pub endpoints: EndpointSettings,

    pub build: BuildSettings,

    /// Interval between publish status checks
    pub status_poll_interval: Duration,

    /// Base interval between deployment state checks
    pub deployment_poll_interval: Duration,

    pub http_timeout: Duration,
}

impl DeploymentConfig {
    /// Build a config from tool settings and the credential environment variables
    pub fn from_env(
        project_dir: impl Into<PathBuf>,
        settings: &ToolSettings,
    ) -> Result<Self, DeployError> {
        Self::from_lookup(project_dir, settings, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(
        project_dir: impl Into<PathBuf>,
        settings: &ToolSettings,
        lookup: F,
    ) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DeployError::ConfigError(format!("{} is not set", key)))
        };

        Ok(Self {
            subscription_id: required(SUBSCRIPTION_ID_ENV)?,
            tenant_id: lookup(TENANT_ID_ENV)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "myorganization".to_string()),
            access_token: SecretString::from(required(ACCESS_TOKEN_ENV)?),
            graph_token: SecretString::from(required(GRAPH_TOKEN_ENV)?),
            layout: ProjectLayout::new(project_dir),
            endpoints: settings.endpoints.clone(),
            build: settings.build.clone(),
            status_poll_interval: Duration::from_millis(settings.status_poll_interval_ms),
            deployment_poll_interval: Duration::from_secs(settings.deployment_poll_interval_secs),
            http_timeout: Duration::from_secs(settings.http_timeout_secs),
        })
    }
}
