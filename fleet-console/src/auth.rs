use async_trait::async_trait;
use chrono::Utc;
use fleet_client::{
    ClientError, ControlPlane, CreateInstancePayload, FilePart, Result as ClientResult, Session,
    SessionStore,
};
use fleet_models::{
    ActionResponse, ConfigFile, ConfigFileContent, ImageOption, Instance, LifecycleAction,
    LoginResponse, PortPoolStatus, SystemStatus, UpdateInstanceRequest,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Generic notice for any failed sign-in
pub const LOGIN_FAILED: &str = "Login failed. Check your credentials.";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Sign in required. Run `fleet login` first.")]
    SignInRequired,
    #[error("Session expired. Run `fleet login` to sign in again.")]
    SessionExpired,
    #[error("{}", LOGIN_FAILED)]
    LoginFailed,
    #[error("Could not store session: {0}")]
    Storage(#[source] ClientError),
}

/// Guards every protected command behind a stored session
#[derive(Debug, Clone)]
pub struct AuthGate {
    store: SessionStore,
}

impl AuthGate {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Exchanges credentials for a token and persists the session.
    ///
    /// Every failure, including blank input, yields the same generic error;
    /// the underlying cause only reaches the log.
    pub async fn login(
        &self,
        api: &dyn ControlPlane,
        username: &str,
        password: &str,
    ) -> Result<Session, GateError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            tracing::debug!("Rejected blank credentials");
            return Err(GateError::LoginFailed);
        }

        let response = api.login(username, password).await.map_err(|e| {
            tracing::warn!(user = username, error = %e, "Login failed");
            GateError::LoginFailed
        })?;

        let session = Session::new(response.access_token, username, response.expires_in);
        self.store.save(&session).map_err(GateError::Storage)?;
        tracing::info!(user = username, "Signed in");
        Ok(session)
    }

    /// Drops the stored session. Returns the identity that was signed in, if any.
    pub fn logout(&self) -> Result<Option<String>, GateError> {
        let previous = self.current();
        self.store.clear().map_err(GateError::Storage)?;
        if let Some(user) = &previous {
            tracing::info!(user = %user, "Signed out");
        }
        Ok(previous)
    }

    /// Checks for a usable session before any protected work starts
    pub fn require_session(&self) -> Result<Session, GateError> {
        let session = match self.store.load() {
            Ok(Some(session)) => session,
            Ok(None) => return Err(GateError::SignInRequired),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session");
                return Err(GateError::SignInRequired);
            }
        };

        if session.is_expired(Utc::now()) {
            self.expire();
            return Err(GateError::SessionExpired);
        }

        Ok(session)
    }

    /// Called when the control plane rejects the stored token
    pub fn expire(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not clear rejected session");
        } else {
            tracing::info!("Session rejected by control plane, cleared");
        }
    }

    fn current(&self) -> Option<String> {
        self.store.load().ok().flatten().map(|s| s.username)
    }
}

/// Session plus the API handle protected commands work with
pub struct SessionContext {
    pub session: Session,
    pub api: Arc<dyn ControlPlane>,
    rejected: Arc<AtomicBool>,
}

impl SessionContext {
    /// Wraps `api` so that any 401 clears the stored session
    pub fn new<C: ControlPlane + 'static>(gate: AuthGate, session: Session, api: C) -> Self {
        let rejected = Arc::new(AtomicBool::new(false));
        Self {
            session,
            api: Arc::new(GatedControlPlane {
                gate,
                inner: api,
                rejected: rejected.clone(),
            }),
            rejected,
        }
    }

    pub fn api(&self) -> &dyn ControlPlane {
        self.api.as_ref()
    }

    /// Fails once any call made through this context was rejected with a 401,
    /// even when the caller swallowed that error
    pub fn check(&self) -> Result<(), GateError> {
        if self.rejected.load(Ordering::SeqCst) {
            return Err(GateError::SessionExpired);
        }
        Ok(())
    }
}

/// Control plane decorator that expires the session on the first rejection
struct GatedControlPlane<C> {
    gate: AuthGate,
    inner: C,
    rejected: Arc<AtomicBool>,
}

impl<C> GatedControlPlane<C> {
    fn guard<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.is_unauthorized() && !self.rejected.swap(true, Ordering::SeqCst) {
                self.gate.expire();
            }
        }
        result
    }
}

#[async_trait]
impl<C: ControlPlane> ControlPlane for GatedControlPlane<C> {
    async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        self.inner.login(username, password).await
    }

    async fn list_instances(&self) -> ClientResult<Vec<Instance>> {
        self.guard(self.inner.list_instances().await)
    }

    async fn get_instance(&self, id: &str) -> ClientResult<Instance> {
        self.guard(self.inner.get_instance(id).await)
    }

    async fn create_instance(&self, payload: CreateInstancePayload) -> ClientResult<Instance> {
        self.guard(self.inner.create_instance(payload).await)
    }

    async fn update_instance(
        &self,
        id: &str,
        update: &UpdateInstanceRequest,
    ) -> ClientResult<Instance> {
        self.guard(self.inner.update_instance(id, update).await)
    }

    async fn delete_instance(&self, id: &str) -> ClientResult<()> {
        self.guard(self.inner.delete_instance(id).await)
    }

    async fn upload_code(&self, id: &str, file: FilePart) -> ClientResult<()> {
        self.guard(self.inner.upload_code(id, file).await)
    }

    async fn upload_config(&self, id: &str, files: Vec<FilePart>) -> ClientResult<()> {
        self.guard(self.inner.upload_config(id, files).await)
    }

    async fn instance_action(
        &self,
        id: &str,
        action: LifecycleAction,
    ) -> ClientResult<ActionResponse> {
        self.guard(self.inner.instance_action(id, action).await)
    }

    async fn list_images(&self) -> ClientResult<Vec<ImageOption>> {
        self.guard(self.inner.list_images().await)
    }

    async fn system_status(&self) -> ClientResult<SystemStatus> {
        self.guard(self.inner.system_status().await)
    }

    async fn port_pool_status(&self) -> ClientResult<PortPoolStatus> {
        self.guard(self.inner.port_pool_status().await)
    }

    async fn list_config_files(&self, id: &str) -> ClientResult<Vec<ConfigFile>> {
        self.guard(self.inner.list_config_files(id).await)
    }

    async fn add_config_file(
        &self,
        id: &str,
        file: &ConfigFileContent,
    ) -> ClientResult<ConfigFile> {
        self.guard(self.inner.add_config_file(id, file).await)
    }

    async fn update_config_file(
        &self,
        id: &str,
        config_id: i64,
        file: &ConfigFileContent,
    ) -> ClientResult<ConfigFile> {
        self.guard(self.inner.update_config_file(id, config_id, file).await)
    }

    async fn delete_config_file(&self, id: &str, config_id: i64) -> ClientResult<()> {
        self.guard(self.inner.delete_config_file(id, config_id).await)
    }
}
