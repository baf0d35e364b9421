//! Artifact upload to the hosting endpoint

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::errors::DeployError;
use crate::filesys::file::File;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Hosting operations needed to push an archive
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// Set the publishing credentials used by the upload endpoint
    async fn set_publishing_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), DeployError>;

    /// Upload an archive to `site`. Non-2xx responses are errors.
    async fn zip_deploy(
        &self,
        site: &str,
        archive: Vec<u8>,
        username: &str,
        password: &str,
    ) -> Result<(), DeployError>;
}

/// Credentials for one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishingCredentials {
    pub username: String,
    pub password: String,
}

/// A fresh password is derived for every upload
pub fn publishing_credentials(name: &str, env: &str, now: DateTime<Utc>) -> PublishingCredentials {
    PublishingCredentials {
        username: format!("{}-{}", name, env),
        password: format!("{}-{}-{}", name, env, now.timestamp_millis()),
    }
}

/// Set new publishing credentials and upload the archive to `{name}-{env}`
pub async fn deploy_zip(
    client: &dyn HostingClient,
    archive: &File,
    name: &str,
    env: &str,
) -> Result<(), DeployError> {
    let credentials = publishing_credentials(name, env, Utc::now());
    client
        .set_publishing_credentials(&credentials.username, &credentials.password)
        .await?;

    let bytes = archive.read_bytes().await?;
    let site = format!("{}-{}", name, env);
    info!("Uploading {} bytes to {}", bytes.len(), site);

    client
        .zip_deploy(&site, bytes, &credentials.username, &credentials.password)
        .await
}
