//! The bot settings document
//!
//! The document is an arbitrary JSON object. Only the sections the
//! deployment owns are typed; every other key is carried through reads and
//! writes untouched. Updates consume the document and return a new one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::models::publish::PublishTarget;

pub const APP_ID_KEY: &str = "MicrosoftAppId";
pub const APP_PASSWORD_KEY: &str = "MicrosoftAppPassword";
pub const LUIS_KEY: &str = "luis";
pub const PUBLISH_TARGETS_KEY: &str = "publishTargets";

/// Language model section as read from settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuisSettings {
    #[serde(default)]
    pub authoring_key: Option<String>,

    #[serde(default)]
    pub authoring_region: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub endpoint_key: Option<String>,

    #[serde(default)]
    pub default_language: Option<String>,
}

impl LuisSettings {
    /// Authoring region, falling back to the runtime region
    pub fn effective_region(&self) -> Option<&str> {
        self.authoring_region
            .as_deref()
            .or(self.region.as_deref())
            .filter(|r| !r.is_empty())
    }
}

/// Settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotSettings(Map<String, Value>);

impl BotSettings {
    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, DeployError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DeployError::ConfigError(format!(
                "settings document must be a JSON object, found {}",
                other
            ))),
        }
    }

    /// Read the document from disk
    pub async fn load(file: &File) -> Result<Self, DeployError> {
        if !file.exists().await {
            return Err(DeployError::SettingsNotFound(
                file.path().display().to_string(),
            ));
        }
        Self::from_value(file.read_json().await?)
    }

    /// Write the document to disk atomically
    pub async fn save(&self, file: &File) -> Result<(), DeployError> {
        file.write_json(&self.0).await
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Registered application id, if present and non-empty
    pub fn app_id(&self) -> Option<&str> {
        self.non_empty_str(APP_ID_KEY)
    }

    pub fn app_password(&self) -> Option<&str> {
        self.non_empty_str(APP_PASSWORD_KEY)
    }

    /// Typed view of the language model section
    pub fn luis(&self) -> LuisSettings {
        self.0
            .get(LUIS_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Publish targets, skipping malformed entries
    pub fn publish_targets(&self) -> Vec<PublishTarget> {
        self.0
            .get(PUBLISH_TARGETS_KEY)
            .and_then(Value::as_array)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| serde_json::from_value(t.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the keys present in `fragment`, leaving all others as they were
    pub fn merge(mut self, fragment: Map<String, Value>) -> Self {
        for (key, value) in fragment {
            self.0.insert(key, value);
        }
        self
    }

    /// Set the application identity
    pub fn with_identity(self, app_id: &str, app_password: Option<&str>) -> Self {
        let mut fragment = Map::new();
        fragment.insert(APP_ID_KEY.to_string(), Value::String(app_id.to_string()));
        if let Some(app_password) = app_password {
            fragment.insert(
                APP_PASSWORD_KEY.to_string(),
                Value::String(app_password.to_string()),
            );
        }
        self.merge(fragment)
    }

    /// Replace the language model section
    pub fn with_luis(self, luis: Value) -> Self {
        let mut fragment = Map::new();
        fragment.insert(LUIS_KEY.to_string(), luis);
        self.merge(fragment)
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}
