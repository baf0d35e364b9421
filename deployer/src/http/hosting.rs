//! Web hosting client: publishing credentials and zip upload

use std::time::Duration;

use async_trait::async_trait;
use azure_models::models::hosting::{PublishingUser, PublishingUserProperties};
use secrecy::SecretString;
use tracing::info;
use url::Url;

use crate::deploy::upload::{HostingClient, ZIP_CONTENT_TYPE};
use crate::errors::DeployError;
use crate::http::client::{Credential, HttpClient};

pub const WEB_API_VERSION: &str = "2019-08-01";

/// App hosting operations
pub struct AppServiceHosting {
    management: HttpClient,
    hosting_domain: String,
    timeout: Duration,
}

impl AppServiceHosting {
    pub fn new(management: HttpClient, hosting_domain: impl Into<String>, timeout: Duration) -> Self {
        Self {
            management,
            hosting_domain: hosting_domain.into(),
            timeout,
        }
    }

    /// `https://{site}.scm.{domain}`
    pub fn scm_url(&self, site: &str) -> Result<Url, DeployError> {
        Url::parse(&format!("https://{}.scm.{}", site, self.hosting_domain))
            .map_err(|e| DeployError::ConfigError(format!("invalid site {}: {}", site, e)))
    }
}

#[async_trait]
impl HostingClient for AppServiceHosting {
    async fn set_publishing_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), DeployError> {
        let body = PublishingUser {
            properties: PublishingUserProperties {
                publishing_user_name: username.to_string(),
                publishing_password: Some(password.to_string()),
            },
        };
        let path = format!(
            "/providers/Microsoft.Web/publishingUsers/web?api-version={}",
            WEB_API_VERSION
        );
        let _: serde_json::Value = self.management.put(&path, &body).await?;
        Ok(())
    }

    async fn zip_deploy(
        &self,
        site: &str,
        archive: Vec<u8>,
        username: &str,
        password: &str,
    ) -> Result<(), DeployError> {
        let scm = self.scm_url(site)?;
        let client = HttpClient::new(scm.as_str(), self.timeout)?.with_credential(Credential::Basic {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        });

        let status = client
            .post_bytes("/zipdeploy", archive, ZIP_CONTENT_TYPE)
            .await?;
        info!("Upload to {} accepted with {}", scm, status);
        Ok(())
    }
}
