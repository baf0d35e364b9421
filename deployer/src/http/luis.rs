//! LUIS authoring client

use std::time::Duration;

use async_trait::async_trait;
use azure_models::models::luis::{AzureAccount, AzureAccountAssignment};
use secrecy::SecretString;

use crate::deploy::luis::{luis_endpoint, LuisAccounts};
use crate::errors::DeployError;
use crate::http::client::{Credential, HttpClient};

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Authoring account operations against the regional LUIS endpoint
pub struct LuisClient {
    access_token: SecretString,
    timeout: Duration,
}

impl LuisClient {
    pub fn new(access_token: SecretString, timeout: Duration) -> Self {
        Self {
            access_token,
            timeout,
        }
    }

    fn http(&self, region: &str, authoring_key: &str) -> Result<HttpClient, DeployError> {
        Ok(HttpClient::new(&luis_endpoint(region), self.timeout)?
            .with_credential(Credential::Bearer(self.access_token.clone()))
            .with_header(SUBSCRIPTION_KEY_HEADER, authoring_key))
    }
}

#[async_trait]
impl LuisAccounts for LuisClient {
    async fn list_accounts(
        &self,
        region: &str,
        authoring_key: &str,
    ) -> Result<Vec<AzureAccount>, DeployError> {
        self.http(region, authoring_key)?
            .get("/luis/api/v2.0/azureaccounts")
            .await
    }

    async fn assign_account(
        &self,
        region: &str,
        authoring_key: &str,
        app_id: &str,
        account: &AzureAccountAssignment,
    ) -> Result<(), DeployError> {
        let path = format!("/luis/api/v2.0/apps/{}/azureaccounts", app_id);
        let _: serde_json::Value = self
            .http(region, authoring_key)?
            .post(&path, account)
            .await?;
        Ok(())
    }
}
