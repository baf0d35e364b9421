//! Directory graph models

use serde::{Deserialize, Serialize};

/// Application registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCreateParameters {
    pub display_name: String,
    pub available_to_other_tenants: bool,
    pub reply_urls: Vec<String>,
    pub password_credentials: Vec<PasswordCredential>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredential {
    pub start_date: String,
    pub end_date: String,
    pub value: String,
}

/// Registered application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub app_id: String,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}
