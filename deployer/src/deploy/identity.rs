//! Application identity registration

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use secrecy::SecretString;

use crate::errors::DeployError;

/// Redirect URL registered on every bot identity
pub const BOT_REDIRECT_URL: &str = "https://token.botframework.com/.auth/web/redirect";

/// Lifetime of the generated password credential
pub const CREDENTIAL_LIFETIME_MONTHS: u32 = 24;

/// A registered application identity
#[derive(Debug, Clone)]
pub struct AppIdentity {
    pub app_id: String,
    pub password: SecretString,
}

/// Registers application identities
#[async_trait]
pub trait IdentityRegistrar: Send + Sync {
    async fn create_app(
        &self,
        display_name: &str,
        password: &str,
    ) -> Result<AppIdentity, DeployError>;
}

/// Validity window of a password credential created at `now`
pub fn credential_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = now
        .checked_add_months(Months::new(CREDENTIAL_LIFETIME_MONTHS))
        .unwrap_or(now);
    (now, end)
}
