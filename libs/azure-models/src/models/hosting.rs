//! Web hosting models

use serde::{Deserialize, Serialize};

/// Publishing user credentials for the scm site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingUser {
    pub properties: PublishingUserProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishingUserProperties {
    pub publishing_user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishing_password: Option<String>,
}
