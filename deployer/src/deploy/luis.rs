//! Language model publishing: build LUIS models, record their app ids in the
//! deployed settings and bind them to the provisioned authoring account.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use azure_models::models::luis::{AzureAccount, AzureAccountAssignment};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info};

use crate::deploy::progress::{ProgressEvent, ProgressKind, ProgressSink};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::storage::bot_settings::BotSettings;
use crate::storage::layout::ProjectLayout;

pub const LU_EXTENSION: &str = "lu";
pub const DEFAULT_LANGUAGE: &str = "en-us";

/// Service endpoint for a region
pub fn luis_endpoint(region: &str) -> String {
    format!("https://{}.api.cognitive.microsoft.com", region)
}

/// Name of the authoring account the resource template provisions
pub fn authoring_account_name(name: &str, environment: &str) -> String {
    format!("{}-{}-luis", name, environment)
}

/// Authoring key and region, both required to publish
#[derive(Debug, Clone)]
pub struct LuisCredentials {
    pub authoring_key: SecretString,
    pub region: String,
}

impl LuisCredentials {
    /// Explicit values win over settings. `None` unless both key and region are known.
    pub fn resolve(
        explicit_key: Option<&str>,
        explicit_region: Option<&str>,
        settings: &BotSettings,
    ) -> Option<Self> {
        let luis = settings.luis();
        let region = explicit_region
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| luis.effective_region().map(str::to_string))?;
        let key = explicit_key
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or(luis.authoring_key.filter(|k| !k.is_empty()))?;

        Some(Self {
            authoring_key: SecretString::from(key),
            region,
        })
    }
}

/// Inputs of one model build
#[derive(Debug, Clone)]
pub struct LuisBuildRequest {
    pub files: Vec<PathBuf>,
    pub bot_name: String,
    pub environment: String,
    pub region: String,
    pub language: String,
    pub authoring_key: SecretString,
    pub out_dir: PathBuf,
}

/// Compiles and publishes models from `.lu` sources
#[async_trait]
pub trait LuisBuilder: Send + Sync {
    async fn build(&self, request: &LuisBuildRequest) -> Result<(), DeployError>;
}

/// Builds with the `bf luis:build` command
#[derive(Debug, Clone)]
pub struct BfCliBuilder {
    pub command: String,
}

impl BfCliBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl LuisBuilder for BfCliBuilder {
    async fn build(&self, request: &LuisBuildRequest) -> Result<(), DeployError> {
        let config_file = File::new(request.out_dir.join("luconfig.json"));
        config_file
            .write_json(&serde_json::json!({ "models": request.files }))
            .await?;

        let output = Command::new(&self.command)
            .arg("luis:build")
            .arg("--luConfig")
            .arg(config_file.path())
            .args(["--authoringKey", request.authoring_key.expose_secret()])
            .args(["--botName", &request.bot_name])
            .args(["--suffix", &request.environment])
            .args(["--region", &request.region])
            .args(["--defaultCulture", &request.language])
            .arg("--out")
            .arg(&request.out_dir)
            .args(["--force", "--log"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                DeployError::LuisBuildError(format!("Failed to run {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            return Err(DeployError::LuisBuildError(format!(
                "luis:build exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Authoring account REST operations
#[async_trait]
pub trait LuisAccounts: Send + Sync {
    async fn list_accounts(
        &self,
        region: &str,
        authoring_key: &str,
    ) -> Result<Vec<AzureAccount>, DeployError>;

    async fn assign_account(
        &self,
        region: &str,
        authoring_key: &str,
        app_id: &str,
        account: &AzureAccountAssignment,
    ) -> Result<(), DeployError>;
}

/// One publish for a bot environment
#[derive(Debug, Clone)]
pub struct LuisPublishRequest {
    pub name: String,
    pub environment: String,
    pub language: String,
    pub credentials: LuisCredentials,
    /// Runtime key written to settings, defaults to the authoring key
    pub endpoint_key: Option<String>,
}

/// What a publish produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LuisPublishOutcome {
    /// Model name to published app id
    pub app_ids: BTreeMap<String, String>,
    /// Account the apps were bound to
    pub account: Option<AzureAccount>,
}

/// Non-empty `.lu` sources below `dir`
pub async fn find_model_sources(dir: &Dir) -> Result<Vec<PathBuf>, DeployError> {
    if !dir.exists().await {
        return Ok(Vec::new());
    }
    let mut sources = Vec::new();
    for path in dir.walk_files().await? {
        let is_lu = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(LU_EXTENSION))
            .unwrap_or(false);
        if is_lu && File::new(&path).size().await > 0 {
            sources.push(path);
        }
    }
    Ok(sources)
}

fn is_model_settings_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("luis.settings") && n.ends_with(".json"))
        .unwrap_or(false)
}

/// Merge the `luis` app-id maps of every per-model settings file below `dir`
pub async fn collect_app_ids(dir: &Dir) -> Result<BTreeMap<String, String>, DeployError> {
    let mut app_ids = BTreeMap::new();
    for path in dir.walk_files().await? {
        if !is_model_settings_file(&path) {
            continue;
        }
        let settings: Value = File::new(&path).read_json().await?;
        if let Some(map) = settings.get("luis").and_then(Value::as_object) {
            for (model, app_id) in map {
                if let Some(app_id) = app_id.as_str() {
                    app_ids.insert(model.clone(), app_id.to_string());
                }
            }
        }
    }
    Ok(app_ids)
}

/// `{ endpoint, endpointKey, <model>: <appId>... }`
pub fn endpoint_config(
    region: &str,
    endpoint_key: &str,
    app_ids: &BTreeMap<String, String>,
) -> Value {
    let mut config = Map::new();
    config.insert("endpoint".to_string(), Value::String(luis_endpoint(region)));
    config.insert(
        "endpointKey".to_string(),
        Value::String(endpoint_key.to_string()),
    );
    for (model, app_id) in app_ids {
        config.insert(model.clone(), Value::String(app_id.clone()));
    }
    Value::Object(config)
}

/// Publishes language models for a deployment
#[derive(Clone)]
pub struct LuisPublisher {
    builder: Arc<dyn LuisBuilder>,
    accounts: Arc<dyn LuisAccounts>,
}

impl LuisPublisher {
    pub fn new(builder: Arc<dyn LuisBuilder>, accounts: Arc<dyn LuisAccounts>) -> Self {
        Self { builder, accounts }
    }

    pub async fn publish(
        &self,
        request: &LuisPublishRequest,
        layout: &ProjectLayout,
        sink: &dyn ProgressSink,
    ) -> Result<LuisPublishOutcome, DeployError> {
        let assets_dir = layout.deployed_assets_dir();
        let sources = find_model_sources(&assets_dir).await?;
        if sources.is_empty() {
            sink.report(ProgressEvent::new(
                ProgressKind::DeployInfo,
                "No language model sources found, skipping LUIS publish",
            ));
            return Ok(LuisPublishOutcome::default());
        }

        let generated_dir = layout.generated_dir();
        generated_dir.create().await?;

        sink.report(ProgressEvent::new(
            ProgressKind::DeployInfo,
            format!("Building {} language model file(s)...", sources.len()),
        ));
        let credentials = &request.credentials;
        self.builder
            .build(&LuisBuildRequest {
                files: sources,
                bot_name: request.name.clone(),
                environment: request.environment.clone(),
                region: credentials.region.clone(),
                language: request.language.clone(),
                authoring_key: credentials.authoring_key.clone(),
                out_dir: generated_dir.path().to_path_buf(),
            })
            .await?;

        let app_ids = collect_app_ids(&assets_dir).await?;
        debug!("Published LUIS apps: {:?}", app_ids);

        let authoring_key = credentials.authoring_key.expose_secret();
        let endpoint_key = request.endpoint_key.as_deref().unwrap_or(authoring_key);
        self.write_settings(layout, &credentials.region, endpoint_key, &app_ids)
            .await?;

        if app_ids.is_empty() {
            return Ok(LuisPublishOutcome::default());
        }

        let account_name = authoring_account_name(&request.name, &request.environment);
        let accounts = self
            .accounts
            .list_accounts(&credentials.region, authoring_key)
            .await?;
        let account = accounts
            .into_iter()
            .find(|a| a.account_name == account_name)
            .ok_or_else(|| DeployError::AccountNotFound(account_name.clone()))?;

        let assignment = AzureAccountAssignment::from(&account);
        for app_id in app_ids.values() {
            self.accounts
                .assign_account(&credentials.region, authoring_key, app_id, &assignment)
                .await?;
            info!("Bound LUIS app {} to account {}", app_id, account_name);
        }

        sink.report(ProgressEvent::new(
            ProgressKind::DeployInfo,
            format!("Published {} LUIS app(s)", app_ids.len()),
        ));

        Ok(LuisPublishOutcome {
            app_ids,
            account: Some(account),
        })
    }

    async fn write_settings(
        &self,
        layout: &ProjectLayout,
        region: &str,
        endpoint_key: &str,
        app_ids: &BTreeMap<String, String>,
    ) -> Result<(), DeployError> {
        let file = layout.deploy_settings_file();
        let settings = if file.exists().await {
            BotSettings::load(&file).await?
        } else {
            BotSettings::default()
        };
        settings
            .with_luis(endpoint_config(region, endpoint_key, app_ids))
            .save(&file)
            .await
    }
}
