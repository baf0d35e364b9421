//! LUIS authoring models

use serde::{Deserialize, Serialize};

/// Account descriptor as listed by `GET /luis/api/v2.0/azureaccounts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AzureAccount {
    pub azure_subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Body of `POST /luis/api/v2.0/apps/{appId}/azureaccounts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureAccountAssignment {
    pub azure_subscription_id: String,
    pub resource_group: String,
    pub account_name: String,
}

impl From<&AzureAccount> for AzureAccountAssignment {
    fn from(account: &AzureAccount) -> Self {
        Self {
            azure_subscription_id: account.azure_subscription_id.clone(),
            resource_group: account.resource_group.clone(),
            account_name: account.account_name.clone(),
        }
    }
}
