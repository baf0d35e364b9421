//! Resource manager client

use async_trait::async_trait;
use azure_models::models::arm::{
    Deployment, DeploymentExtended, DeploymentMode, DeploymentOperation,
    DeploymentOperationsListResult, DeploymentProperties, DeploymentPropertiesExtended,
    DeploymentValidateResult, ErrorResponse, ResourceGroup,
};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::deploy::provision::{DeploymentRequest, DeploymentResponse, ResourceProvisioner};
use crate::deploy::template::read_template;
use crate::errors::DeployError;
use crate::http::client::HttpClient;
use crate::utils::{calc_exp_backoff, CooldownOptions};

pub const RESOURCES_API_VERSION: &str = "2019-10-01";

const TERMINAL_STATES: [&str; 3] = ["Succeeded", "Failed", "Canceled"];

/// Deployment checks before giving up on a deployment that never settles
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 240;

/// Resource manager REST client for one subscription
pub struct ArmClient {
    http: HttpClient,
    subscription_id: String,
    poll: CooldownOptions,
    max_poll_attempts: u32,
}

impl ArmClient {
    pub fn new(http: HttpClient, subscription_id: impl Into<String>) -> Self {
        Self {
            http,
            subscription_id: subscription_id.into(),
            poll: CooldownOptions::default(),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Override how often a running deployment is checked
    pub fn with_poll_options(mut self, poll: CooldownOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    fn group_path(&self, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourcegroups/{}",
            self.subscription_id, resource_group
        )
    }

    fn deployment_path(&self, resource_group: &str, deploy_id: &str) -> String {
        format!(
            "{}/providers/Microsoft.Resources/deployments/{}",
            self.group_path(resource_group),
            deploy_id
        )
    }

    fn versioned(path: &str) -> String {
        format!("{}?api-version={}", path, RESOURCES_API_VERSION)
    }

    async fn deployment_body(&self, request: &DeploymentRequest) -> Result<Deployment, DeployError> {
        let template = read_template(&request.template_file).await?;
        Ok(Deployment {
            location: None,
            properties: DeploymentProperties {
                template,
                parameters: request.parameters.to_value()?,
                mode: DeploymentMode::Incremental,
            },
        })
    }

    async fn get_deployment(
        &self,
        resource_group: &str,
        deploy_id: &str,
    ) -> Result<DeploymentExtended, DeployError> {
        self.http
            .get(&Self::versioned(&self.deployment_path(resource_group, deploy_id)))
            .await
    }

    /// Turn an absolute `nextLink` into a path relative to the client base URL
    fn relative_link<'a>(&self, link: &'a str) -> &'a str {
        link.strip_prefix(self.http.base_url()).unwrap_or(link)
    }
}

fn provisioning_state(deployment: &DeploymentExtended) -> Option<&str> {
    deployment
        .properties
        .as_ref()
        .and_then(|p| p.provisioning_state.as_deref())
}

#[async_trait]
impl ResourceProvisioner for ArmClient {
    async fn create_resource_group(
        &self,
        location: &str,
        name: &str,
    ) -> Result<ResourceGroup, DeployError> {
        let body = ResourceGroup {
            location: location.to_string(),
            id: None,
            name: None,
            properties: None,
        };
        self.http
            .put(&Self::versioned(&self.group_path(name)), &body)
            .await
    }

    async fn validate_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentValidateResult, DeployError> {
        let body = self.deployment_body(request).await?;
        let path = format!(
            "{}/validate",
            self.deployment_path(&request.resource_group, &request.deploy_id)
        );
        let response = self
            .http
            .send_raw(Method::POST, &Self::versioned(&path), Some(&body))
            .await?;

        // A rejected template comes back as 400 with an error payload
        if response.status.is_success() || response.status == StatusCode::BAD_REQUEST {
            let result: Option<DeploymentValidateResult> = response.json()?;
            return Ok(result.unwrap_or_default());
        }
        Err(DeployError::ApiError {
            status: response.status.as_u16(),
            body: response.body,
        })
    }

    async fn create_deployment(
        &self,
        request: &DeploymentRequest,
    ) -> Result<DeploymentResponse, DeployError> {
        let body = self.deployment_body(request).await?;
        let path = self.deployment_path(&request.resource_group, &request.deploy_id);
        let response = self
            .http
            .send_raw(Method::PUT, &Self::versioned(&path), Some(&body))
            .await?;

        if !response.status.is_success() {
            let rejected: Option<DeploymentValidateResult> = response.json().unwrap_or_default();
            return Ok(DeploymentResponse {
                status: response.status.as_u16(),
                deployment: DeploymentExtended {
                    properties: Some(DeploymentPropertiesExtended {
                        error: rejected.and_then(|r| r.error),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            });
        }

        let mut deployment: DeploymentExtended = response.json::<Option<_>>()?.unwrap_or_default();
        let mut attempt = 0;
        while !provisioning_state(&deployment)
            .map(|s| TERMINAL_STATES.contains(&s))
            .unwrap_or(false)
        {
            if attempt >= self.max_poll_attempts {
                let state = provisioning_state(&deployment).unwrap_or("unknown").to_string();
                warn!(
                    "Deployment {} still {} after {} checks, giving up",
                    request.deploy_id, state, attempt
                );
                let properties = deployment.properties.get_or_insert_with(Default::default);
                properties.error = Some(ErrorResponse {
                    code: "DeploymentNotSettled".to_string(),
                    message: format!("deployment still {} after {} checks", state, attempt),
                    details: Vec::new(),
                });
                return Ok(DeploymentResponse {
                    status: 500,
                    deployment,
                });
            }
            let delay = calc_exp_backoff(&self.poll, attempt);
            debug!(
                "Deployment {} is {:?}, checking again in {:?}",
                request.deploy_id,
                provisioning_state(&deployment),
                delay
            );
            tokio::time::sleep(delay).await;
            deployment = self
                .get_deployment(&request.resource_group, &request.deploy_id)
                .await?;
            attempt += 1;
        }

        let state = provisioning_state(&deployment).unwrap_or_default().to_string();
        info!("Deployment {} finished: {}", request.deploy_id, state);
        Ok(DeploymentResponse {
            status: if state == "Succeeded" { 200 } else { 500 },
            deployment,
        })
    }

    async fn deployment_outputs(
        &self,
        resource_group: &str,
        deploy_id: &str,
    ) -> Result<Option<Map<String, Value>>, DeployError> {
        let deployment = self.get_deployment(resource_group, deploy_id).await?;
        Ok(deployment.properties.and_then(|p| p.outputs))
    }

    async fn list_deployment_operations(
        &self,
        resource_group: &str,
        deploy_id: &str,
    ) -> Result<Vec<DeploymentOperation>, DeployError> {
        let mut operations = Vec::new();
        let mut next = Some(Self::versioned(&format!(
            "{}/operations",
            self.deployment_path(resource_group, deploy_id)
        )));

        while let Some(path) = next {
            let page: DeploymentOperationsListResult = self.http.get(&path).await?;
            operations.extend(page.value);
            next = page
                .next_link
                .as_deref()
                .map(|link| self.relative_link(link).to_string());
        }
        Ok(operations)
    }
}
