//! Error types for botdeploy

use thiserror::Error;

/// Main error type for provisioning and deployment
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },

    #[error("Settings file not found: {0}")]
    SettingsNotFound(String),

    #[error("An app password is required when no MicrosoftAppId exists in settings")]
    MissingAppPassword,

    #[error("Template validation failed: {0}")]
    ValidationFailed(String),

    #[error("Template deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Build error: {0}")]
    BuildError(String),

    #[error("LUIS build error: {0}")]
    LuisBuildError(String),

    #[error("LUIS account not found: {0}")]
    AccountNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Internal(err.to_string())
    }
}
