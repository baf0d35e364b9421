//! Resource provisioning contract and deployment result handling

use async_trait::async_trait;
use azure_models::models::arm::{
    DeploymentExtended, DeploymentOperation, DeploymentValidateResult, ErrorResponse,
    ResourceGroup,
};
use serde_json::{Map, Value};

use crate::deploy::template::TemplateParameters;
use crate::errors::DeployError;
use crate::filesys::file::File;

/// Error code the resource manager reports when a resource type is not offered in a region
pub const LOCATION_NOT_SUPPORTED_CODE: &str = "MissingRegistrationForLocation";

/// Resource group name for a bot environment
pub fn resource_group_name(name: &str, environment: &str) -> String {
    format!("{}-{}", name, environment)
}

/// A template deployment into a resource group
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub template_file: File,
    pub location: String,
    pub resource_group: String,
    pub deploy_id: String,
    pub parameters: TemplateParameters,
}

/// Outcome of a template deployment
#[derive(Debug, Clone)]
pub struct DeploymentResponse {
    /// 200 when the deployment succeeded
    pub status: u16,
    pub deployment: DeploymentExtended,
}

impl DeploymentResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn error(&self) -> Option<&ErrorResponse> {
        self.deployment
            .properties
            .as_ref()
            .and_then(|p| p.error.as_ref())
    }
}

/// Creates resource groups and deploys templates into them
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    /// Create or update a resource group
    async fn create_resource_group(
        &self,
        location: &str,
        name: &str,
    ) -> Result<ResourceGroup, DeployError>;

    /// Validate a deployment in incremental mode
    async fn validate_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentValidateResult, DeployError>;

    /// Run a deployment to completion
    async fn create_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentResponse, DeployError>;

    /// Raw outputs of a finished deployment
    async fn deployment_outputs(
        &self,
        resource_group: &str,
        deploy_id: &str,
    ) -> Result<Option<Map<String, Value>>, DeployError>;

    async fn list_deployment_operations(
        &self,
        resource_group: &str,
        deploy_id: &str,
    ) -> Result<Vec<DeploymentOperation>, DeployError>;
}

/// Strip the `{ "type": ..., "value": ... }` envelope from deployment outputs
pub fn unwrap_outputs(outputs: Map<String, Value>) -> Map<String, Value> {
    outputs
        .into_iter()
        .map(|(name, output)| {
            let value = match output {
                Value::Object(mut envelope) if envelope.contains_key("value") => {
                    envelope.remove("value").unwrap_or(Value::Null)
                }
                other => other,
            };
            (name, value)
        })
        .collect()
}

/// Why a deployment operation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// A resource in the template is not available in the chosen region
    LocationNotSupported,
    Generic,
}

/// A failed deployment operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub kind: FailureKind,
    pub code: String,
    pub message: String,
    pub resource: Option<String>,
}

/// Collect the failed operations of a deployment
pub fn classify_failures(operations: &[DeploymentOperation]) -> Vec<OperationFailure> {
    operations
        .iter()
        .filter_map(|op| {
            let properties = op.properties.as_ref()?;
            let error = properties.status_message.as_ref()?.error.as_ref()?;
            let kind = if error.code == LOCATION_NOT_SUPPORTED_CODE {
                FailureKind::LocationNotSupported
            } else {
                FailureKind::Generic
            };
            Some(OperationFailure {
                kind,
                code: error.code.clone(),
                message: error.message.clone(),
                resource: properties
                    .target_resource
                    .as_ref()
                    .and_then(|t| t.resource_name.clone()),
            })
        })
        .collect()
}
