use async_trait::async_trait;
use fleet_models::{
    ActionRequest, ActionResponse, ConfigFile, ConfigFileContent, ImageOption, Instance,
    LifecycleAction, LoginResponse, PlatformVersion, PortPoolStatus, SystemStatus,
    UpdateInstanceRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::payload::{code_upload_parts, config_upload_parts, CreateInstancePayload, FilePart, FormPart};

/// Header carrying a per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Control plane operations
// ============================================================================

/// Operations the console issues against the control plane.
///
/// Every call is a single request; nothing here caches or merges calls.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;

    async fn list_instances(&self) -> Result<Vec<Instance>>;

    async fn get_instance(&self, id: &str) -> Result<Instance>;

    async fn create_instance(&self, payload: CreateInstancePayload) -> Result<Instance>;

    async fn update_instance(&self, id: &str, update: &UpdateInstanceRequest) -> Result<Instance>;

    async fn delete_instance(&self, id: &str) -> Result<()>;

    async fn upload_code(&self, id: &str, file: FilePart) -> Result<()>;

    async fn upload_config(&self, id: &str, files: Vec<FilePart>) -> Result<()>;

    async fn instance_action(&self, id: &str, action: LifecycleAction) -> Result<ActionResponse>;

    async fn list_images(&self) -> Result<Vec<ImageOption>>;

    async fn system_status(&self) -> Result<SystemStatus>;

    async fn port_pool_status(&self) -> Result<PortPoolStatus>;

    async fn list_config_files(&self, id: &str) -> Result<Vec<ConfigFile>>;

    async fn add_config_file(&self, id: &str, file: &ConfigFileContent) -> Result<ConfigFile>;

    async fn update_config_file(
        &self,
        id: &str,
        config_id: i64,
        file: &ConfigFileContent,
    ) -> Result<ConfigFile>;

    async fn delete_config_file(&self, id: &str, config_id: i64) -> Result<()>;
}

// ============================================================================
// Retry policy
// ============================================================================

/// Retry policy for idempotent reads. Mutating calls are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(250),
        }
    }

    /// Linear backoff: the n-th retry waits n times the base delay
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

// ============================================================================
// HTTP client
// ============================================================================

/// `reqwest`-backed control plane client
#[derive(Debug, Clone)]
pub struct ControlPlaneClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl ControlPlaneClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        match reqwest::Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ClientError::InvalidUrl(base_url)),
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            token: None,
            retry: RetryPolicy::none(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Platform identification; does not require a session
    pub async fn version(&self) -> Result<PlatformVersion> {
        self.get_json("/api/system/version").await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        tracing::debug!(%method, path, request_id = %request_id, "Control plane request");

        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(REQUEST_ID_HEADER, request_id);

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ClientError::from_response(status, &body);
        tracing::debug!(status = status.as_u16(), error = %err, "Control plane returned an error");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut retry = 0;
        loop {
            match self.send_json(self.request(Method::GET, path)).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.delay_for(retry);
                    tracing::warn!(
                        path,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// `/api/servers/{id}` with the id encoded as a single path segment
    fn instance_path(id: &str) -> Result<String> {
        let mut url = reqwest::Url::parse("http://control-plane/api/servers")
            .map_err(|_| ClientError::InvalidUrl(id.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(id.to_string()))?
            .push(id);
        Ok(url.path().to_string())
    }
}

fn to_form(parts: Vec<FormPart>) -> Form {
    parts.into_iter().fold(Form::new(), |form, part| match part {
        FormPart::Text { name, value } => form.text(name, value),
        FormPart::File { name, file } => {
            form.part(name, Part::bytes(file.bytes).file_name(file.filename))
        }
    })
}

#[async_trait]
impl ControlPlane for ControlPlaneClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let builder = self
            .request(Method::POST, "/api/auth/token")
            .form(&[("username", username), ("password", password)]);
        self.send_json(builder).await
    }

    async fn list_instances(&self) -> Result<Vec<Instance>> {
        self.get_json("/api/servers").await
    }

    async fn get_instance(&self, id: &str) -> Result<Instance> {
        self.get_json(&Self::instance_path(id)?).await
    }

    async fn create_instance(&self, payload: CreateInstancePayload) -> Result<Instance> {
        let form = to_form(payload.into_parts()?);
        let builder = self.request(Method::POST, "/api/servers").multipart(form);
        self.send_json(builder).await
    }

    async fn update_instance(&self, id: &str, update: &UpdateInstanceRequest) -> Result<Instance> {
        let builder = self
            .request(Method::PUT, &Self::instance_path(id)?)
            .json(update);
        self.send_json(builder).await
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &Self::instance_path(id)?))
            .await?;
        Ok(())
    }

    async fn upload_code(&self, id: &str, file: FilePart) -> Result<()> {
        let path = format!("{}/upload-code", Self::instance_path(id)?);
        let builder = self
            .request(Method::POST, &path)
            .multipart(to_form(code_upload_parts(file)));
        self.send(builder).await?;
        Ok(())
    }

    async fn upload_config(&self, id: &str, files: Vec<FilePart>) -> Result<()> {
        let path = format!("{}/upload-config", Self::instance_path(id)?);
        let builder = self
            .request(Method::POST, &path)
            .multipart(to_form(config_upload_parts(files)));
        self.send(builder).await?;
        Ok(())
    }

    async fn instance_action(&self, id: &str, action: LifecycleAction) -> Result<ActionResponse> {
        let path = format!("{}/action", Self::instance_path(id)?);
        let builder = self
            .request(Method::POST, &path)
            .json(&ActionRequest { action });
        self.send_json(builder).await
    }

    async fn list_images(&self) -> Result<Vec<ImageOption>> {
        self.get_json("/api/images").await
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        self.get_json("/api/system/status").await
    }

    async fn port_pool_status(&self) -> Result<PortPoolStatus> {
        self.get_json("/api/system/ports").await
    }

    async fn list_config_files(&self, id: &str) -> Result<Vec<ConfigFile>> {
        self.get_json(&format!("{}/config-files", Self::instance_path(id)?))
            .await
    }

    async fn add_config_file(&self, id: &str, file: &ConfigFileContent) -> Result<ConfigFile> {
        let path = format!("{}/config-files", Self::instance_path(id)?);
        self.send_json(self.request(Method::POST, &path).json(file))
            .await
    }

    async fn update_config_file(
        &self,
        id: &str,
        config_id: i64,
        file: &ConfigFileContent,
    ) -> Result<ConfigFile> {
        let path = format!("{}/config-files/{}", Self::instance_path(id)?, config_id);
        self.send_json(self.request(Method::PUT, &path).json(file))
            .await
    }

    async fn delete_config_file(&self, id: &str, config_id: i64) -> Result<()> {
        let path = format!("{}/config-files/{}", Self::instance_path(id)?, config_id);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}
