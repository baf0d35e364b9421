//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::DeployError;
use crate::utils::basic_auth_header;

/// How requests authenticate
#[derive(Debug, Clone)]
pub enum Credential {
    None,
    Bearer(SecretString),
    Basic {
        username: String,
        password: SecretString,
    },
}

/// Raw status and body, for endpoints whose error responses carry meaning
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DeployError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        Ok(serde_json::from_str(body)?)
    }
}

/// HTTP client bound to one service base URL
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credential: Credential,
    headers: Vec<(String, String)>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DeployError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: Credential::None,
            headers: Vec::new(),
        })
    }

    /// Authenticate every request with `credential`
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url);
        match &self.credential {
            Credential::None => {}
            Credential::Bearer(token) => {
                request = request.header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", token.expose_secret()),
                );
            }
            Credential::Basic { username, password } => {
                request = request.header(
                    header::AUTHORIZATION,
                    basic_auth_header(username, password.expose_secret()),
                );
            }
        }
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeployError> {
        let response = self.request(Method::GET, path).send().await?;
        Self::parse(response, "GET").await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::parse(response, "POST").await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeployError> {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        Self::parse(response, "PUT").await
    }

    /// Send a JSON request and return the status and body without judging them
    pub async fn send_raw<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<RawResponse, DeployError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    /// POST a binary body
    pub async fn post_bytes(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<StatusCode, DeployError> {
        let response = self
            .request(Method::POST, path)
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP POST failed: {} - {}", status, body);
            return Err(DeployError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(status)
    }

    async fn parse<T: DeserializeOwned>(response: Response, verb: &str) -> Result<T, DeployError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("HTTP {} failed: {} - {}", verb, status, body);
            return Err(DeployError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        RawResponse { status, body }.json()
    }
}
