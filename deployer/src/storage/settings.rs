//! Tool settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// botdeploy settings, read from `deployer.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs
    #[serde(default)]
    pub json_logs: bool,

    /// Optional directory for a log file
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Service endpoints
    #[serde(default)]
    pub endpoints: EndpointSettings,

    /// Build configuration
    #[serde(default)]
    pub build: BuildSettings,

    /// Interval between publish status checks, in milliseconds
    #[serde(default = "default_status_poll_interval")]
    pub status_poll_interval_ms: u64,

    /// Interval between deployment state checks, in seconds
    #[serde(default = "default_deployment_poll_interval")]
    pub deployment_poll_interval_secs: u64,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_status_poll_interval() -> u64 {
    10_000
}

fn default_deployment_poll_interval() -> u64 {
    5
}

fn default_http_timeout() -> u64 {
    300
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            log_dir: None,
            endpoints: EndpointSettings::default(),
            build: BuildSettings::default(),
            status_poll_interval_ms: default_status_poll_interval(),
            deployment_poll_interval_secs: default_deployment_poll_interval(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

/// Base URLs of the services the deployment talks to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSettings {
    #[serde(default = "default_management_url")]
    pub management_url: String,

    #[serde(default = "default_graph_url")]
    pub graph_url: String,

    /// Suffix of the per-site upload host, `{site}.scm.{hosting_domain}`
    #[serde(default = "default_hosting_domain")]
    pub hosting_domain: String,
}

fn default_management_url() -> String {
    "https://management.azure.com".to_string()
}

fn default_graph_url() -> String {
    "https://graph.windows.net".to_string()
}

fn default_hosting_domain() -> String {
    "azurewebsites.net".to_string()
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            management_url: default_management_url(),
            graph_url: default_graph_url(),
            hosting_domain: default_hosting_domain(),
        }
    }
}

/// Build step settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Project file passed to `dotnet publish` and named in the deployment descriptor
    #[serde(default = "default_project_file")]
    pub project_file: String,

    /// Build configuration
    #[serde(default = "default_configuration")]
    pub configuration: String,

    /// Command used to build language models
    #[serde(default = "default_luis_build_command")]
    pub luis_build_command: String,
}

fn default_project_file() -> String {
    "BotProject.csproj".to_string()
}

fn default_configuration() -> String {
    "release".to_string()
}

fn default_luis_build_command() -> String {
    "bf".to_string()
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            project_file: default_project_file(),
            configuration: default_configuration(),
            luis_build_command: default_luis_build_command(),
        }
    }
}
