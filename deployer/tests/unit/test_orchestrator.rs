//! Orchestrator tests against in-memory collaborators

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use azure_models::models::arm::{
    DeploymentExtended, DeploymentOperation, DeploymentOperationProperties, DeploymentValidateResult,
    ErrorResponse, ResourceGroup, StatusMessage, TargetResource,
};
use azure_models::models::luis::{AzureAccount, AzureAccountAssignment};
use secrecy::SecretString;
use serde_json::{json, Map, Value};

use botdeploy::app::options::{
    DeploymentConfig, ACCESS_TOKEN_ENV, GRAPH_TOKEN_ENV, SUBSCRIPTION_ID_ENV,
};
use botdeploy::app::run::{run_with, Command, RunOptions};
use botdeploy::deploy::build::BotBuilder;
use botdeploy::deploy::identity::{AppIdentity, IdentityRegistrar};
use botdeploy::deploy::luis::{LuisAccounts, LuisBuildRequest, LuisBuilder, LuisPublisher};
use botdeploy::deploy::orchestrator::{BotDeployer, Collaborators, DeployOptions};
use botdeploy::deploy::progress::{ProgressKind, RecordingSink};
use botdeploy::deploy::provision::{DeploymentRequest, DeploymentResponse, ResourceProvisioner};
use botdeploy::deploy::upload::HostingClient;
use botdeploy::errors::DeployError;
use botdeploy::filesys::file::File;
use botdeploy::storage::settings::ToolSettings;

// ================================ MOCKS ================================ //

#[derive(Default)]
struct MockProvisioner {
    validation_error: Option<ErrorResponse>,
    deploy_status: Option<u16>,
    outputs: Option<Map<String, Value>>,
    operations: Vec<DeploymentOperation>,

    groups: Mutex<Vec<String>>,
    requests: Mutex<Vec<DeploymentRequest>>,
    validations: AtomicUsize,
    deployments: AtomicUsize,
    operation_lists: AtomicUsize,
}

#[async_trait]
impl ResourceProvisioner for MockProvisioner {
    async fn create_resource_group(
        &self,
        location: &str,
        name: &str,
    ) -> Result<ResourceGroup, DeployError> {
        self.groups.lock().unwrap().push(name.to_string());
        Ok(ResourceGroup {
            location: location.to_string(),
            id: None,
            name: Some(name.to_string()),
            properties: None,
        })
    }

    async fn validate_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentValidateResult, DeployError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Ok(DeploymentValidateResult {
            error: self.validation_error.clone(),
            properties: None,
        })
    }

    async fn create_deployment(
        &self,
        _request: &DeploymentRequest,
    ) -> Result<DeploymentResponse, DeployError> {
        self.deployments.fetch_add(1, Ordering::SeqCst);
        Ok(DeploymentResponse {
            status: self.deploy_status.unwrap_or(200),
            deployment: DeploymentExtended::default(),
        })
    }

    async fn deployment_outputs(
        &self,
        _resource_group: &str,
        _deploy_id: &str,
    ) -> Result<Option<Map<String, Value>>, DeployError> {
        Ok(self.outputs.clone())
    }

    async fn list_deployment_operations(
        &self,
        _resource_group: &str,
        _deploy_id: &str,
    ) -> Result<Vec<DeploymentOperation>, DeployError> {
        self.operation_lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.operations.clone())
    }
}

#[derive(Default)]
struct MockRegistrar {
    calls: AtomicUsize,
}

#[async_trait]
impl IdentityRegistrar for MockRegistrar {
    async fn create_app(
        &self,
        _display_name: &str,
        password: &str,
    ) -> Result<AppIdentity, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AppIdentity {
            app_id: "app-123".to_string(),
            password: SecretString::from(password.to_string()),
        })
    }
}

#[derive(Default)]
struct MockBuilder {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl BotBuilder for MockBuilder {
    async fn publish(&self, _project_dir: &Path, output_dir: &Path) -> Result<(), DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeployError::BuildError("compilation failed".to_string()));
        }
        File::new(output_dir.join("BotProject.dll"))
            .write_string("binary")
            .await
    }
}

#[derive(Default)]
struct MockLuisBuilder {
    calls: AtomicUsize,
}

#[async_trait]
impl LuisBuilder for MockLuisBuilder {
    async fn build(&self, request: &LuisBuildRequest) -> Result<(), DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = format!(
            "luis.settings.{}.{}.json",
            request.environment, request.region
        );
        File::new(request.out_dir.join(name))
            .write_json(&json!({ "luis": { "main_dev_lu": "app-1" } }))
            .await
    }
}

#[derive(Default)]
struct MockAccounts {
    accounts: Vec<AzureAccount>,
    lists: AtomicUsize,
    assigned: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl LuisAccounts for MockAccounts {
    async fn list_accounts(
        &self,
        _region: &str,
        _authoring_key: &str,
    ) -> Result<Vec<AzureAccount>, DeployError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.clone())
    }

    async fn assign_account(
        &self,
        _region: &str,
        _authoring_key: &str,
        app_id: &str,
        account: &AzureAccountAssignment,
    ) -> Result<(), DeployError> {
        self.assigned
            .lock()
            .unwrap()
            .push((app_id.to_string(), account.account_name.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct MockHosting {
    uploads: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl HostingClient for MockHosting {
    async fn set_publishing_credentials(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<(), DeployError> {
        Ok(())
    }

    async fn zip_deploy(
        &self,
        site: &str,
        archive: Vec<u8>,
        _username: &str,
        _password: &str,
    ) -> Result<(), DeployError> {
        self.uploads
            .lock()
            .unwrap()
            .push((site.to_string(), archive.len()));
        Ok(())
    }
}

// ================================ FIXTURE ================================ //

struct Fixture {
    _dir: tempfile::TempDir,
    project: PathBuf,
    provisioner: Arc<MockProvisioner>,
    registrar: Arc<MockRegistrar>,
    builder: Arc<MockBuilder>,
    luis_builder: Arc<MockLuisBuilder>,
    accounts: Arc<MockAccounts>,
    hosting: Arc<MockHosting>,
    sink: Arc<RecordingSink>,
}

impl Fixture {
    fn new(provisioner: MockProvisioner) -> Self {
        Self::with(provisioner, MockBuilder::default(), MockAccounts::default())
    }

    fn with(provisioner: MockProvisioner, builder: MockBuilder, accounts: MockAccounts) -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            project: dir.path().to_path_buf(),
            _dir: dir,
            provisioner: Arc::new(provisioner),
            registrar: Arc::new(MockRegistrar::default()),
            builder: Arc::new(builder),
            luis_builder: Arc::new(MockLuisBuilder::default()),
            accounts: Arc::new(accounts),
            hosting: Arc::new(MockHosting::default()),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    fn config(&self) -> DeploymentConfig {
        DeploymentConfig::from_lookup(&self.project, &ToolSettings::default(), |k| match k {
            SUBSCRIPTION_ID_ENV => Some("sub".to_string()),
            ACCESS_TOKEN_ENV | GRAPH_TOKEN_ENV => Some("token".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            provisioner: self.provisioner.clone(),
            registrar: self.registrar.clone(),
            builder: self.builder.clone(),
            luis: LuisPublisher::new(self.luis_builder.clone(), self.accounts.clone()),
            hosting: self.hosting.clone(),
        }
    }

    fn deployer(&self) -> BotDeployer {
        BotDeployer::new(self.config(), self.collaborators(), self.sink.clone())
    }

    fn messages(&self, kind: ProgressKind) -> Vec<String> {
        self.sink
            .events()
            .into_iter()
            .filter(|e| e.status == kind)
            .map(|e| e.message)
            .collect()
    }

    fn settings_file(&self) -> File {
        File::new(self.project.join("dialogs/settings/appsettings.json"))
    }

    fn deploy_settings_file(&self) -> File {
        File::new(
            self.project
                .join("bin/release/publish/dialogs/settings/appsettings.json"),
        )
    }

    async fn write_settings(&self, settings: Value) {
        self.settings_file().write_json(&settings).await.unwrap();
    }

    async fn read_settings(&self) -> Value {
        self.settings_file().read_json().await.unwrap()
    }

    async fn write_model(&self) {
        File::new(self.project.join("dialogs/main/main.lu"))
            .write_string("# Greet\n- hi\n")
            .await
            .unwrap();
    }
}

fn outputs() -> Map<String, Value> {
    json!({
        "applicationInsights": { "type": "Object", "value": { "InstrumentationKey": "ik-1" } },
        "cosmosDb": { "type": "Object", "value": { "collectionId": "botstate" } }
    })
    .as_object()
    .unwrap()
    .clone()
}

fn luis_account(name: &str) -> AzureAccount {
    AzureAccount {
        azure_subscription_id: "sub".to_string(),
        resource_group: "bot1-dev".to_string(),
        account_name: name.to_string(),
        location: Some("westus".to_string()),
    }
}

fn luis_options() -> DeployOptions {
    DeployOptions {
        luis_authoring_key: Some("authoring-key".to_string()),
        luis_authoring_region: Some("westus".to_string()),
        ..Default::default()
    }
}

// ================================ CREATE ================================ //

#[tokio::test]
async fn test_create_end_to_end() {
    let fixture = Fixture::new(MockProvisioner {
        outputs: Some(outputs()),
        ..Default::default()
    });
    fixture
        .write_settings(json!({ "feature": { "useCosmos": true }, "bot": "bot1" }))
        .await;

    let created = fixture
        .deployer()
        .create("bot1", "westus", "dev", Some("Passw0rd!"), None)
        .await
        .unwrap();
    assert!(created);

    assert_eq!(fixture.registrar.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*fixture.provisioner.groups.lock().unwrap(), vec!["bot1-dev"]);
    assert_eq!(fixture.provisioner.validations.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.provisioner.deployments.load(Ordering::SeqCst), 1);

    let settings = fixture.read_settings().await;
    assert_eq!(settings["MicrosoftAppId"], "app-123");
    assert_eq!(settings["MicrosoftAppPassword"], "Passw0rd!");
    assert_eq!(settings["applicationInsights"]["InstrumentationKey"], "ik-1");
    assert_eq!(settings["cosmosDb"]["collectionId"], "botstate");
    assert_eq!(settings["feature"], json!({ "useCosmos": true }));
    assert_eq!(settings["bot"], "bot1");
}

#[tokio::test]
async fn test_create_template_parameters() {
    let fixture = Fixture::new(MockProvisioner {
        outputs: Some(outputs()),
        ..Default::default()
    });
    fixture.write_settings(json!({})).await;

    fixture
        .deployer()
        .create("bot1", "westus", "dev", Some("Passw0rd!"), Some("luis-key"))
        .await
        .unwrap();

    let requests = fixture.provisioner.requests.lock().unwrap().clone();
    let request = &requests[0];
    assert_eq!(request.resource_group, "bot1-dev");
    assert_eq!(request.parameters.get("appId"), Some(&json!("app-123")));
    assert_eq!(request.parameters.get("botId"), Some(&json!("bot1-dev")));
    assert_eq!(request.parameters.get("location"), Some(&json!("westus")));
    assert_eq!(
        request.parameters.get("shouldCreateAuthoringResource"),
        Some(&json!(false))
    );
    assert_eq!(
        request.parameters.to_value().unwrap()["appSecret"],
        json!({ "value": "Passw0rd!" })
    );
}

#[tokio::test]
async fn test_create_validation_error_skips_deployment() {
    let fixture = Fixture::new(MockProvisioner {
        validation_error: Some(ErrorResponse {
            code: "InvalidTemplate".to_string(),
            message: "bad template".to_string(),
            details: Vec::new(),
        }),
        ..Default::default()
    });
    fixture.write_settings(json!({ "MicrosoftAppId": "existing" })).await;

    let created = fixture
        .deployer()
        .create("bot1", "westus", "dev", None, None)
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(fixture.provisioner.validations.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.provisioner.deployments.load(Ordering::SeqCst), 0);
    assert_eq!(
        fixture.messages(ProgressKind::ProvisionError),
        vec!["Template validation failed: InvalidTemplate bad template"]
    );
    assert_eq!(fixture.sink.count(ProgressKind::ProvisionErrorDetails), 1);
}

#[tokio::test]
async fn test_create_without_identity_or_password() {
    let fixture = Fixture::new(MockProvisioner::default());
    fixture.write_settings(json!({ "bot": "bot1" })).await;

    let created = fixture
        .deployer()
        .create("bot1", "westus", "dev", None, None)
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(fixture.registrar.calls.load(Ordering::SeqCst), 0);
    assert!(fixture.provisioner.groups.lock().unwrap().is_empty());
    assert_eq!(fixture.read_settings().await, json!({ "bot": "bot1" }));
}

#[tokio::test]
async fn test_create_without_settings_file() {
    let fixture = Fixture::new(MockProvisioner::default());

    let created = fixture
        .deployer()
        .create("bot1", "westus", "dev", Some("Passw0rd!"), None)
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(fixture.registrar.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.sink.count(ProgressKind::ProvisionError), 1);
}

#[tokio::test]
async fn test_create_reuses_existing_identity() {
    let fixture = Fixture::new(MockProvisioner {
        outputs: Some(outputs()),
        ..Default::default()
    });
    fixture
        .write_settings(json!({ "MicrosoftAppId": "existing", "MicrosoftAppPassword": "secret" }))
        .await;

    assert!(fixture
        .deployer()
        .create("bot1", "westus", "dev", None, None)
        .await
        .unwrap());

    assert_eq!(fixture.registrar.calls.load(Ordering::SeqCst), 0);
    let settings = fixture.read_settings().await;
    assert_eq!(settings["MicrosoftAppId"], "existing");
    assert_eq!(settings["MicrosoftAppPassword"], "secret");
}

#[tokio::test]
async fn test_create_failed_deployment() {
    let fixture = Fixture::new(MockProvisioner {
        deploy_status: Some(500),
        ..Default::default()
    });
    fixture.write_settings(json!({ "MicrosoftAppId": "existing" })).await;

    let created = fixture
        .deployer()
        .create("bot1", "westus", "dev", None, None)
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(fixture.provisioner.deployments.load(Ordering::SeqCst), 1);
    assert_eq!(
        fixture.messages(ProgressKind::ProvisionError),
        vec!["Template deployment failed: status 500"]
    );
    assert_eq!(fixture.sink.count(ProgressKind::ProvisionErrorDetails), 1);
}

#[tokio::test]
async fn test_create_existing_identity_without_password() {
    let fixture = Fixture::new(MockProvisioner {
        outputs: Some(outputs()),
        ..Default::default()
    });
    fixture
        .write_settings(json!({ "MicrosoftAppId": "existing", "bot": "bot1" }))
        .await;

    assert!(fixture
        .deployer()
        .create("bot1", "westus", "dev", None, None)
        .await
        .unwrap());

    let requests = fixture.provisioner.requests.lock().unwrap().clone();
    assert_eq!(requests[0].parameters.get("appId"), Some(&json!("existing")));
    assert_eq!(requests[0].parameters.get("appSecret"), None);

    let settings = fixture.read_settings().await;
    assert_eq!(settings["MicrosoftAppId"], "existing");
    assert!(settings.get("MicrosoftAppPassword").is_none());
    assert_eq!(settings["applicationInsights"]["InstrumentationKey"], "ik-1");
}

#[tokio::test]
async fn test_create_without_outputs_diagnoses_operations() {
    let failed = |code: &str, resource: &str| DeploymentOperation {
        properties: Some(DeploymentOperationProperties {
            provisioning_state: Some("Failed".to_string()),
            status_message: Some(StatusMessage {
                status: Some("Failed".to_string()),
                error: Some(ErrorResponse {
                    code: code.to_string(),
                    message: "failed".to_string(),
                    details: Vec::new(),
                }),
            }),
            target_resource: Some(TargetResource {
                resource_name: Some(resource.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };
    let fixture = Fixture::new(MockProvisioner {
        operations: vec![
            failed("MissingRegistrationForLocation", "bot1-dev-qna"),
            failed("Conflict", "bot1-dev-cosmos"),
        ],
        ..Default::default()
    });
    fixture.write_settings(json!({ "MicrosoftAppId": "existing" })).await;

    let created = fixture
        .deployer()
        .create("bot1", "westus", "dev", None, None)
        .await
        .unwrap();

    // diagnostics do not change the result
    assert!(created);
    assert_eq!(fixture.provisioner.operation_lists.load(Ordering::SeqCst), 1);

    let details: Vec<String> = fixture
        .sink
        .events()
        .into_iter()
        .filter(|e| e.status == ProgressKind::ProvisionErrorDetails)
        .map(|e| e.message)
        .collect();
    assert_eq!(details.len(), 2);
    assert!(details[0].contains("not available in westus"));
    assert!(details[1].contains("Conflict"));
    assert_eq!(fixture.read_settings().await, json!({ "MicrosoftAppId": "existing" }));
}

// ================================ DEPLOY ================================ //

#[tokio::test]
async fn test_deploy_skips_luis_without_credentials() {
    let fixture = Fixture::new(MockProvisioner::default());
    fixture.write_settings(json!({ "MicrosoftAppId": "existing" })).await;
    fixture.write_model().await;

    let only_key = DeployOptions {
        luis_authoring_key: Some("authoring-key".to_string()),
        ..Default::default()
    };
    fixture
        .deployer()
        .deploy("bot1", "dev", &only_key)
        .await
        .unwrap();

    assert_eq!(fixture.luis_builder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.accounts.lists.load(Ordering::SeqCst), 0);
    assert!(fixture.accounts.assigned.lock().unwrap().is_empty());

    let uploads = fixture.hosting.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "bot1-dev");
    assert!(uploads[0].1 > 0);

    assert_eq!(
        File::new(fixture.project.join(".deployment"))
            .read_string()
            .await
            .unwrap(),
        "[config]\nproject = BotProject.csproj\n"
    );
    assert_eq!(fixture.sink.count(ProgressKind::DeploySuccess), 1);
}

#[tokio::test]
async fn test_deploy_publishes_language_models() {
    let fixture = Fixture::with(
        MockProvisioner::default(),
        MockBuilder::default(),
        MockAccounts {
            accounts: vec![luis_account("other-luis"), luis_account("bot1-dev-luis")],
            ..Default::default()
        },
    );
    fixture
        .write_settings(json!({
            "MicrosoftAppId": "existing",
            "MicrosoftAppPassword": "secret",
            "luis": { "endpointKey": "runtime-key" }
        }))
        .await;
    fixture.write_model().await;

    fixture
        .deployer()
        .deploy("bot1", "dev", &luis_options())
        .await
        .unwrap();

    assert_eq!(fixture.luis_builder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.accounts.lists.load(Ordering::SeqCst), 1);
    assert_eq!(
        *fixture.accounts.assigned.lock().unwrap(),
        vec![("app-1".to_string(), "bot1-dev-luis".to_string())]
    );
    assert!(fixture
        .messages(ProgressKind::DeployInfo)
        .contains(&"LUIS apps main_dev_lu=app-1 bound to bot1-dev-luis".to_string()));

    // only the luis section of the deployed settings changes
    let deployed: Value = fixture.deploy_settings_file().read_json().await.unwrap();
    assert_eq!(deployed["MicrosoftAppId"], "existing");
    assert_eq!(deployed["MicrosoftAppPassword"], "secret");
    assert_eq!(
        deployed["luis"],
        json!({
            "endpoint": "https://westus.api.cognitive.microsoft.com",
            "endpointKey": "runtime-key",
            "main_dev_lu": "app-1"
        })
    );
    assert_eq!(fixture.hosting.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_deploy_reads_luis_credentials_from_settings() {
    let fixture = Fixture::with(
        MockProvisioner::default(),
        MockBuilder::default(),
        MockAccounts {
            accounts: vec![luis_account("bot1-dev-luis")],
            ..Default::default()
        },
    );
    fixture
        .write_settings(json!({
            "luis": { "authoringKey": "from-settings", "authoringRegion": "westeurope" }
        }))
        .await;
    fixture.write_model().await;

    fixture
        .deployer()
        .deploy("bot1", "dev", &DeployOptions::default())
        .await
        .unwrap();

    assert_eq!(fixture.luis_builder.calls.load(Ordering::SeqCst), 1);
    let deployed: Value = fixture.deploy_settings_file().read_json().await.unwrap();
    assert_eq!(
        deployed["luis"]["endpoint"],
        "https://westeurope.api.cognitive.microsoft.com"
    );
    assert_eq!(deployed["luis"]["endpointKey"], "from-settings");
}

#[tokio::test]
async fn test_deploy_fails_when_account_not_found() {
    let fixture = Fixture::with(
        MockProvisioner::default(),
        MockBuilder::default(),
        MockAccounts {
            accounts: vec![luis_account("other-luis")],
            ..Default::default()
        },
    );
    fixture.write_settings(json!({})).await;
    fixture.write_model().await;

    let result = fixture
        .deployer()
        .deploy("bot1", "dev", &luis_options())
        .await;

    match result {
        Err(DeployError::AccountNotFound(name)) => assert_eq!(name, "bot1-dev-luis"),
        other => panic!("expected AccountNotFound, got {:?}", other),
    }
    assert!(fixture.accounts.assigned.lock().unwrap().is_empty());
    assert!(fixture.hosting.uploads.lock().unwrap().is_empty());
    assert_eq!(fixture.sink.count(ProgressKind::DeployError), 1);
    assert_eq!(fixture.sink.count(ProgressKind::DeploySuccess), 0);
}

#[tokio::test]
async fn test_deploy_build_failure_is_returned() {
    let fixture = Fixture::with(
        MockProvisioner::default(),
        MockBuilder {
            fail: true,
            ..Default::default()
        },
        MockAccounts::default(),
    );
    fixture.write_settings(json!({})).await;

    let result = fixture
        .deployer()
        .deploy("bot1", "dev", &DeployOptions::default())
        .await;

    assert!(matches!(result, Err(DeployError::BuildError(_))));
    assert!(fixture.hosting.uploads.lock().unwrap().is_empty());
    assert_eq!(fixture.sink.count(ProgressKind::DeployError), 1);
}

#[tokio::test]
async fn test_create_and_deploy_stops_after_failed_create() {
    let fixture = Fixture::new(MockProvisioner::default());
    fixture.write_settings(json!({})).await;

    let deployed = fixture
        .deployer()
        .create_and_deploy("bot1", "westus", "dev", None, &DeployOptions::default())
        .await
        .unwrap();

    assert!(!deployed);
    assert_eq!(fixture.builder.calls.load(Ordering::SeqCst), 0);
    assert!(fixture.hosting.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_and_deploy() {
    let fixture = Fixture::new(MockProvisioner {
        outputs: Some(outputs()),
        ..Default::default()
    });
    fixture.write_settings(json!({})).await;

    let deployed = fixture
        .deployer()
        .create_and_deploy(
            "bot1",
            "westus",
            "dev",
            Some("Passw0rd!"),
            &DeployOptions::default(),
        )
        .await
        .unwrap();

    assert!(deployed);
    assert_eq!(fixture.builder.calls.load(Ordering::SeqCst), 1);

    // the provisioned settings ship with the package
    let deployed: Value = fixture.deploy_settings_file().read_json().await.unwrap();
    assert_eq!(deployed["MicrosoftAppId"], "app-123");
}

// ================================ STATUS ================================ //

#[tokio::test]
async fn test_status_returns_when_published_target_has_no_history() {
    let fixture = Fixture::new(MockProvisioner::default());
    fixture
        .write_settings(json!({
            "publishTargets": [
                { "name": "dev", "type": "azurePublish", "lastPublished": "2024-05-01T10:00:00Z" }
            ]
        }))
        .await;

    let options = RunOptions {
        command: Command::Status,
        name: "bot1".to_string(),
        environment: "dev".to_string(),
        location: "westus".to_string(),
        app_password: None,
        deploy: DeployOptions::default(),
    };
    let run = run_with(
        fixture.config(),
        fixture.collaborators(),
        options,
        fixture.sink.clone(),
        std::future::pending::<()>(),
    );

    let result = tokio::time::timeout(std::time::Duration::from_secs(5), run)
        .await
        .expect("status did not settle");
    assert!(result.unwrap());
}
