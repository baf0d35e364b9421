//! Deployment orchestrator
//!
//! `create` provisions the identity and cloud resources of a bot environment
//! and records the results in the project settings. `deploy` builds the bot,
//! publishes its language models and uploads the package. Steps run strictly
//! in sequence; each one consumes what the previous produced.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::{error, info};

use crate::app::options::DeploymentConfig;
use crate::deploy::build::{copy_assets, ensure_descriptor, BotBuilder};
use crate::deploy::identity::IdentityRegistrar;
use crate::deploy::luis::{LuisCredentials, LuisPublishRequest, LuisPublisher, DEFAULT_LANGUAGE};
use crate::deploy::package::zip_directory;
use crate::deploy::progress::{ProgressEvent, ProgressKind, ProgressSink};
use crate::deploy::provision::{
    classify_failures, resource_group_name, unwrap_outputs, DeploymentRequest, FailureKind,
    ResourceProvisioner,
};
use crate::deploy::template::deployment_template_params;
use crate::deploy::upload::{deploy_zip, HostingClient};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::storage::bot_settings::BotSettings;
use crate::utils::deployment_id;

/// Optional inputs of `deploy`
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub luis_authoring_key: Option<String>,
    pub luis_authoring_region: Option<String>,
    /// Declarative assets to ship instead of the project's own
    pub bot_path: Option<PathBuf>,
    pub language: Option<String>,
}

/// External collaborators of the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub provisioner: Arc<dyn ResourceProvisioner>,
    pub registrar: Arc<dyn IdentityRegistrar>,
    pub builder: Arc<dyn BotBuilder>,
    pub luis: LuisPublisher,
    pub hosting: Arc<dyn HostingClient>,
}

/// Sequences provisioning and deployment of one bot project
pub struct BotDeployer {
    config: DeploymentConfig,
    provisioner: Arc<dyn ResourceProvisioner>,
    registrar: Arc<dyn IdentityRegistrar>,
    builder: Arc<dyn BotBuilder>,
    luis: LuisPublisher,
    hosting: Arc<dyn HostingClient>,
    sink: Arc<dyn ProgressSink>,
}

impl BotDeployer {
    pub fn new(
        config: DeploymentConfig,
        collaborators: Collaborators,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            provisioner: collaborators.provisioner,
            registrar: collaborators.registrar,
            builder: collaborators.builder,
            luis: collaborators.luis,
            hosting: collaborators.hosting,
            sink,
        }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    fn report(&self, status: ProgressKind, message: impl Into<String>) {
        self.sink.report(ProgressEvent::new(status, message));
    }

    /// Provision the resources of `{name}-{environment}`.
    ///
    /// Returns `Ok(false)` after logging when a precondition fails or the
    /// template is rejected. Transport and IO failures are returned as errors.
    pub async fn create(
        &self,
        name: &str,
        location: &str,
        environment: &str,
        app_password: Option<&str>,
        luis_authoring_key: Option<&str>,
    ) -> Result<bool, DeployError> {
        let settings_file = self.config.layout.settings_file();
        if !settings_file.exists().await {
            self.report(
                ProgressKind::ProvisionError,
                format!(
                    "Settings file not found at {}",
                    settings_file.path().display()
                ),
            );
            return Ok(false);
        }
        let settings = BotSettings::load(&settings_file).await?;

        let app_password = app_password
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .or_else(|| settings.app_password().map(str::to_string));

        let (app_id, app_password) = match settings.app_id() {
            // the existing registration keeps its credential
            Some(app_id) => (app_id.to_string(), app_password),
            None => {
                let Some(password) = app_password else {
                    self.report(
                        ProgressKind::ProvisionError,
                        DeployError::MissingAppPassword.to_string(),
                    );
                    return Ok(false);
                };
                self.report(ProgressKind::ProvisionInfo, "Creating App Registration...");
                let identity = self.registrar.create_app(name, &password).await?;
                self.report(
                    ProgressKind::ProvisionInfo,
                    format!("Created App Registration {}", identity.app_id),
                );
                (
                    identity.app_id,
                    Some(identity.password.expose_secret().to_string()),
                )
            }
        };

        let resource_group = resource_group_name(name, environment);
        let deploy_id = deployment_id(Utc::now());

        self.report(
            ProgressKind::ProvisionInfo,
            format!("Creating resource group {} in {}...", resource_group, location),
        );
        self.provisioner
            .create_resource_group(location, &resource_group)
            .await?;
        self.report(
            ProgressKind::ProvisionInfo,
            format!("Resource group {} ready", resource_group),
        );

        let request = DeploymentRequest {
            template_file: self.config.layout.template_file(),
            location: location.to_string(),
            resource_group: resource_group.clone(),
            deploy_id: deploy_id.clone(),
            parameters: deployment_template_params(
                &app_id,
                app_password.as_deref(),
                location,
                &resource_group,
                luis_authoring_key.map_or(true, str::is_empty),
            ),
        };

        self.report(ProgressKind::ProvisionInfo, "Validating deployment template...");
        let validation = self.provisioner.validate_deployment(&request).await?;
        if let Some(err) = validation.error {
            self.report(
                ProgressKind::ProvisionError,
                DeployError::ValidationFailed(format!("{} {}", err.code, err.message)).to_string(),
            );
            self.report_cleanup_hint(&resource_group);
            return Ok(false);
        }
        self.report(ProgressKind::ProvisionInfo, "Template is valid");

        self.report(
            ProgressKind::ProvisionInfo,
            format!("Deploying template to {} (deployment {})...", resource_group, deploy_id),
        );
        let deployment = self.provisioner.create_deployment(&request).await?;
        if !deployment.is_success() {
            let detail = deployment
                .error()
                .map(|e| format!("{} {}", e.code, e.message))
                .unwrap_or_else(|| format!("status {}", deployment.status));
            self.report(
                ProgressKind::ProvisionError,
                DeployError::DeploymentFailed(detail).to_string(),
            );
            self.report_cleanup_hint(&resource_group);
            return Ok(false);
        }
        self.report(ProgressKind::ProvisionInfo, "Template deployed");

        let outputs = self
            .provisioner
            .deployment_outputs(&resource_group, &deploy_id)
            .await?
            .filter(|o| !o.is_empty());

        match outputs {
            Some(outputs) => {
                settings
                    .merge(unwrap_outputs(outputs))
                    .with_identity(&app_id, app_password.as_deref())
                    .save(&settings_file)
                    .await?;
                self.report(
                    ProgressKind::ProvisionInfo,
                    format!("Updated settings at {}", settings_file.path().display()),
                );
            }
            None => {
                self.report(
                    ProgressKind::ProvisionError,
                    "Deployment returned no outputs, settings were not updated",
                );
                self.diagnose_deployment(&resource_group, &deploy_id, location)
                    .await?;
            }
        }

        info!("Provisioned {}", resource_group);
        Ok(true)
    }

    fn report_cleanup_hint(&self, resource_group: &str) {
        self.report(
            ProgressKind::ProvisionErrorDetails,
            format!(
                "Delete the resource group {} before retrying to remove partially created resources",
                resource_group
            ),
        );
    }

    async fn diagnose_deployment(
        &self,
        resource_group: &str,
        deploy_id: &str,
        location: &str,
    ) -> Result<(), DeployError> {
        let operations = self
            .provisioner
            .list_deployment_operations(resource_group, deploy_id)
            .await?;

        for failure in classify_failures(&operations) {
            let resource = failure.resource.as_deref().unwrap_or("unknown resource");
            let message = match failure.kind {
                FailureKind::LocationNotSupported => format!(
                    "{} is not available in {}, choose a different region",
                    resource, location
                ),
                FailureKind::Generic => format!(
                    "Deployment of {} failed: {} {}",
                    resource, failure.code, failure.message
                ),
            };
            self.report(ProgressKind::ProvisionErrorDetails, message);
        }
        Ok(())
    }

    /// Build, package and upload the bot to `{name}-{environment}`
    pub async fn deploy(
        &self,
        name: &str,
        environment: &str,
        options: &DeployOptions,
    ) -> Result<(), DeployError> {
        match self.run_deploy(name, environment, options).await {
            Ok(()) => {
                self.report(
                    ProgressKind::DeploySuccess,
                    format!("Deployed {}-{}", name, environment),
                );
                Ok(())
            }
            Err(e) => {
                error!("Deployment of {}-{} failed: {}", name, environment, e);
                self.report(ProgressKind::DeployError, e.to_string());
                Err(e)
            }
        }
    }

    async fn run_deploy(
        &self,
        name: &str,
        environment: &str,
        options: &DeployOptions,
    ) -> Result<(), DeployError> {
        let layout = &self.config.layout;

        if ensure_descriptor(&layout.descriptor_file(), &self.config.build.project_file).await? {
            self.report(ProgressKind::DeployInfo, "Created deployment descriptor");
        }
        layout.archive_file().delete().await?;

        self.report(ProgressKind::DeployInfo, "Building bot runtime...");
        let publish_dir = layout.publish_dir();
        self.builder
            .publish(layout.project_dir(), publish_dir.path())
            .await?;

        let source = options
            .bot_path
            .as_ref()
            .map(Dir::new)
            .unwrap_or_else(|| layout.assets_dir());
        let copied = copy_assets(&source, &layout.deployed_assets_dir()).await?;
        self.report(
            ProgressKind::DeployInfo,
            format!("Copied {} asset file(s) from {}", copied, source.path().display()),
        );

        let settings_file = layout.settings_file();
        let settings = if settings_file.exists().await {
            BotSettings::load(&settings_file).await?
        } else {
            BotSettings::default()
        };

        match LuisCredentials::resolve(
            options.luis_authoring_key.as_deref(),
            options.luis_authoring_region.as_deref(),
            &settings,
        ) {
            Some(credentials) => {
                let request = LuisPublishRequest {
                    name: name.to_string(),
                    environment: environment.to_string(),
                    language: options
                        .language
                        .clone()
                        .or(settings.luis().default_language)
                        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                    credentials,
                    endpoint_key: settings.luis().endpoint_key,
                };
                let outcome = self
                    .luis
                    .publish(&request, layout, self.sink.as_ref())
                    .await?;
                if let Some(account) = &outcome.account {
                    let apps: Vec<String> = outcome
                        .app_ids
                        .iter()
                        .map(|(model, app_id)| format!("{}={}", model, app_id))
                        .collect();
                    self.report(
                        ProgressKind::DeployInfo,
                        format!(
                            "LUIS apps {} bound to {}",
                            apps.join(", "),
                            account.account_name
                        ),
                    );
                }
            }
            None => {
                self.report(
                    ProgressKind::DeployInfo,
                    "No LUIS authoring key and region, skipping language models",
                );
            }
        }

        self.report(ProgressKind::DeployInfo, "Packaging...");
        let archive = layout.archive_file();
        zip_directory(&publish_dir, &archive).await?;

        self.report(ProgressKind::DeployInfo, "Uploading package...");
        deploy_zip(self.hosting.as_ref(), &archive, name, environment).await?;

        Ok(())
    }

    /// `create`, then `deploy` if provisioning succeeded.
    ///
    /// Returns `Ok(false)` when provisioning reported a failure; nothing is deployed then.
    pub async fn create_and_deploy(
        &self,
        name: &str,
        location: &str,
        environment: &str,
        app_password: Option<&str>,
        options: &DeployOptions,
    ) -> Result<bool, DeployError> {
        let created = self
            .create(
                name,
                location,
                environment,
                app_password,
                options.luis_authoring_key.as_deref(),
            )
            .await?;
        if !created {
            return Ok(false);
        }
        self.deploy(name, environment, options).await?;
        Ok(true)
    }
}
