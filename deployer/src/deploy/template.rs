//! Template reader and parameter envelopes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DeployError;
use crate::filesys::file::File;

/// The `{ "value": X }` envelope the template engine binds parameters from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamValue<T> {
    pub value: T,
}

impl<T> ParamValue<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Template parameters by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateParameters(BTreeMap<String, ParamValue<Value>>);

impl TemplateParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap and insert a parameter
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), ParamValue::new(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).map(|p| &p.value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Result<Value, DeployError> {
        Ok(serde_json::to_value(&self.0)?)
    }
}

/// Parameters of the bot resources template. Without a secret the
/// template's own `appSecret` default applies.
pub fn deployment_template_params(
    app_id: &str,
    app_secret: Option<&str>,
    location: &str,
    bot_id: &str,
    create_luis_authoring: bool,
) -> TemplateParameters {
    let mut params = TemplateParameters::new();
    params.insert("appId", app_id);
    if let Some(app_secret) = app_secret {
        params.insert("appSecret", app_secret);
    }
    params.insert("location", location);
    params.insert("botId", bot_id);
    params.insert("shouldCreateAuthoringResource", create_luis_authoring);
    params
}

/// Read and parse a template file
pub async fn read_template(file: &File) -> Result<Value, DeployError> {
    if !file.exists().await {
        return Err(DeployError::TemplateError(format!(
            "template not found: {}",
            file.path().display()
        )));
    }
    let template: Value = file
        .read_json()
        .await
        .map_err(|e| DeployError::TemplateError(format!("{}: {}", file.path().display(), e)))?;
    if !template.is_object() {
        return Err(DeployError::TemplateError(format!(
            "{} is not a JSON object",
            file.path().display()
        )));
    }
    Ok(template)
}
