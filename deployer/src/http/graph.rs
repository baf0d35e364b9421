//! Directory graph client

use async_trait::async_trait;
use azure_models::models::graph::{Application, ApplicationCreateParameters, PasswordCredential};
use chrono::{SecondsFormat, Utc};
use secrecy::SecretString;
use tracing::info;

use crate::deploy::identity::{credential_window, AppIdentity, IdentityRegistrar, BOT_REDIRECT_URL};
use crate::errors::DeployError;
use crate::http::client::HttpClient;

pub const GRAPH_API_VERSION: &str = "1.6";

/// Registers applications in a directory tenant
pub struct GraphClient {
    http: HttpClient,
    tenant_id: String,
}

impl GraphClient {
    pub fn new(http: HttpClient, tenant_id: impl Into<String>) -> Self {
        Self {
            http,
            tenant_id: tenant_id.into(),
        }
    }
}

#[async_trait]
impl IdentityRegistrar for GraphClient {
    async fn create_app(
        &self,
        display_name: &str,
        password: &str,
    ) -> Result<AppIdentity, DeployError> {
        let (start, end) = credential_window(Utc::now());
        let body = ApplicationCreateParameters {
            display_name: display_name.to_string(),
            available_to_other_tenants: true,
            reply_urls: vec![BOT_REDIRECT_URL.to_string()],
            password_credentials: vec![PasswordCredential {
                start_date: start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end_date: end.to_rfc3339_opts(SecondsFormat::Secs, true),
                value: password.to_string(),
            }],
        };

        let path = format!(
            "/{}/applications?api-version={}",
            self.tenant_id, GRAPH_API_VERSION
        );
        let application: Application = self.http.post(&path, &body).await?;
        info!("Registered application {}", application.app_id);

        Ok(AppIdentity {
            app_id: application.app_id,
            password: SecretString::from(password.to_string()),
        })
    }
}
