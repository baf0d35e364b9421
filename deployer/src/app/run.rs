//! Command dispatch: wires the REST clients and runs one command

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::app::options::DeploymentConfig;
use crate::deploy::build::DotnetBuilder;
use crate::deploy::luis::{BfCliBuilder, LuisPublisher};
use crate::deploy::orchestrator::{BotDeployer, Collaborators, DeployOptions};
use crate::deploy::progress::ProgressSink;
use crate::errors::DeployError;
use crate::http::arm::ArmClient;
use crate::http::client::{Credential, HttpClient};
use crate::http::graph::GraphClient;
use crate::http::hosting::AppServiceHosting;
use crate::http::luis::LuisClient;
use crate::models::publish::{PublishStatus, PublishStatusKind};
use crate::publish::fsm::PublishState;
use crate::publish::history::PublishHistoryStore;
use crate::storage::bot_settings::BotSettings;
use crate::utils::CooldownOptions;
use crate::workers::poller::{self, HistoryStatusSource, LogNotifier, PublishKey, StatusPoller};

/// What to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create,
    Deploy,
    CreateAndDeploy,
    /// Follow the publish status of every target in the settings
    Status,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub command: Command,
    pub name: String,
    pub environment: String,
    pub location: String,
    pub app_password: Option<String>,
    pub deploy: DeployOptions,
}

/// REST-backed collaborators for a config
pub fn build_collaborators(config: &DeploymentConfig) -> Result<Collaborators, DeployError> {
    let management = HttpClient::new(&config.endpoints.management_url, config.http_timeout)?
        .with_credential(Credential::Bearer(config.access_token.clone()));
    let graph = HttpClient::new(&config.endpoints.graph_url, config.http_timeout)?
        .with_credential(Credential::Bearer(config.graph_token.clone()));

    let provisioner = ArmClient::new(management.clone(), config.subscription_id.clone())
        .with_poll_options(CooldownOptions {
            base_delay: config.deployment_poll_interval,
            ..Default::default()
        });

    let luis = LuisPublisher::new(
        Arc::new(BfCliBuilder::new(config.build.luis_build_command.clone())),
        Arc::new(LuisClient::new(config.access_token.clone(), config.http_timeout)),
    );

    Ok(Collaborators {
        provisioner: Arc::new(provisioner),
        registrar: Arc::new(GraphClient::new(graph, config.tenant_id.clone())),
        builder: Arc::new(DotnetBuilder::new(
            config.build.project_file.clone(),
            config.build.configuration.clone(),
        )),
        luis,
        hosting: Arc::new(AppServiceHosting::new(
            management,
            config.endpoints.hosting_domain.clone(),
            config.http_timeout,
        )),
    })
}

/// Run one command. `Ok(false)` means a failure was reported but not raised.
pub async fn run(
    config: DeploymentConfig,
    options: RunOptions,
    sink: Arc<dyn ProgressSink>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<bool, DeployError> {
    let collaborators = build_collaborators(&config)?;
    run_with(config, collaborators, options, sink, shutdown_signal).await
}

/// Run one command with the given collaborators
pub async fn run_with(
    config: DeploymentConfig,
    collaborators: Collaborators,
    options: RunOptions,
    sink: Arc<dyn ProgressSink>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<bool, DeployError> {
    let history = PublishHistoryStore::new(config.layout.publish_history_file());
    let poller = StatusPoller::new(
        poller::Options {
            interval: config.status_poll_interval,
        },
        Arc::new(HistoryStatusSource::new(history.clone())),
        Arc::new(LogNotifier),
    );
    let settings_file = config.layout.settings_file();
    let deployer = BotDeployer::new(config, collaborators, sink);
    let key = PublishKey::new(options.name.clone(), options.environment.clone());

    info!(
        "Running {:?} for {}-{}",
        options.command, options.name, options.environment
    );
    let result = match options.command {
        Command::Create => {
            deployer
                .create(
                    &options.name,
                    &options.location,
                    &options.environment,
                    options.app_password.as_deref(),
                    options.deploy.luis_authoring_key.as_deref(),
                )
                .await
        }
        Command::Deploy => {
            let deploy = async {
                deployer
                    .deploy(&options.name, &options.environment, &options.deploy)
                    .await
                    .map(|()| true)
            };
            tracked(&poller, &history, &key, deploy).await
        }
        Command::CreateAndDeploy => {
            let deploy = deployer.create_and_deploy(
                &options.name,
                &options.location,
                &options.environment,
                options.app_password.as_deref(),
                &options.deploy,
            );
            tracked(&poller, &history, &key, deploy).await
        }
        Command::Status => {
            let targets = BotSettings::load(&settings_file).await?.publish_targets();
            let keys: Vec<PublishKey> = targets
                .iter()
                .map(|t| PublishKey::new(options.name.clone(), t.name.clone()))
                .collect();
            let observed = join_all(
                targets
                    .iter()
                    .zip(&keys)
                    .map(|(target, key)| poller.observe(key, target)),
            )
            .await;
            for result in observed {
                if let Err(e) = result {
                    warn!("Failed to read publish status: {}", e);
                }
            }

            tokio::select! {
                _ = shutdown_signal => {
                    info!("Shutdown signal received, shutting down...");
                }
                _ = await_settled(&poller, &keys, deployer.config().status_poll_interval) => {}
            }
            Ok(true)
        }
    };

    poller.shutdown();
    result
}

/// Record a publish in the history around `publish` and let the poller
/// pick up its outcome
async fn tracked<F>(
    poller: &StatusPoller,
    history: &PublishHistoryStore,
    key: &PublishKey,
    publish: F,
) -> Result<bool, DeployError>
where
    F: Future<Output = Result<bool, DeployError>>,
{
    poller.begin_publish(std::slice::from_ref(key));
    history
        .append(
            &key.target,
            PublishStatus::new(PublishStatusKind::Pending, "Accepted for publishing"),
        )
        .await?;

    let result = publish.await;
    let status = match &result {
        Ok(true) => PublishStatus::new(PublishStatusKind::Success, "Success"),
        Ok(false) => PublishStatus::new(PublishStatusKind::Failure, "Provisioning failed"),
        Err(e) => PublishStatus::new(PublishStatusKind::Failure, "Deployment failed")
            .with_comment(e.to_string()),
    };
    if let Err(e) = history.append(&key.target, status).await {
        error!("Failed to record publish status of {}: {}", key.target, e);
    } else if let Err(e) = poller.check(key).await {
        warn!("Failed to read publish status of {}: {}", key.target, e);
    }
    result
}

/// Wait until no key is pending with a live re-check timer
async fn await_settled(poller: &StatusPoller, keys: &[PublishKey], interval: std::time::Duration) {
    while keys
        .iter()
        .any(|k| poller.state(k) == PublishState::Pending && poller.is_polling(k))
    {
        tokio::time::sleep(interval).await;
    }
}
