//! In-memory control plane used by the console's unit tests

use async_trait::async_trait;
use fleet_client::{ClientError, ControlPlane, CreateInstancePayload, FilePart, Result};
use fleet_models::{
    ActionResponse, ConfigFile, ConfigFileContent, ImageOption, ImageSize, Instance,
    InstanceStatus, LifecycleAction, LoginResponse, PortAssignment, PortPoolStatus, SystemStatus,
    UpdateInstanceRequest,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login(String),
    ListInstances,
    GetInstance(String),
    CreateInstance(CreateInstancePayload),
    UpdateInstance(String, UpdateInstanceRequest),
    DeleteInstance(String),
    UploadCode(String, String),
    UploadConfig(String, Vec<String>),
    Action(String, LifecycleAction),
    ListImages,
    SystemStatus,
    PortPoolStatus,
    ListConfigFiles(String),
    AddConfigFile(String, ConfigFileContent),
    UpdateConfigFile(String, i64, ConfigFileContent),
    DeleteConfigFile(String, i64),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    instances: Vec<Instance>,
    fail_actions: bool,
    fail_mutations: bool,
    fail_system_status: bool,
    reject_token: bool,
}

#[derive(Clone, Default)]
pub struct RecordingControlPlane {
    state: Arc<Mutex<State>>,
}

pub fn instance(id: &str, name: &str, status: InstanceStatus) -> Instance {
    Instance {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        entry_object: "mcp".to_string(),
        ports: Some("30001".to_string()),
        host_port: status.is_running().then_some(30001),
        host_ports: None,
        command: None,
        args: None,
        image: Some("corp/mcp-base:latest".to_string()),
        status,
        sse_url: None,
        created_at: Some("2025-03-01T10:00:00".to_string()),
        updated_at: None,
        env_vars: Vec::new(),
        config_files: Vec::new(),
    }
}

impl RecordingControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances(instances: Vec<Instance>) -> Self {
        let api = Self::new();
        api.state.lock().unwrap().instances = instances;
        api
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_actions(&self) {
        self.state.lock().unwrap().fail_actions = true;
    }

    pub fn fail_mutations(&self) {
        self.state.lock().unwrap().fail_mutations = true;
    }

    pub fn fail_system_status(&self) {
        self.state.lock().unwrap().fail_system_status = true;
    }

    pub fn reject_token(&self) {
        self.state.lock().unwrap().reject_token = true;
    }

    /// Records the call and applies the configured failure switches
    fn enter(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.reject_token {
            return Err(ClientError::Unauthorized);
        }
        Ok(state)
    }

    fn mutation(&self, call: Call) -> Result<std::sync::MutexGuard<'_, State>> {
        let state = self.enter(call)?;
        if state.fail_mutations {
            return Err(unavailable());
        }
        Ok(state)
    }
}

fn unavailable() -> ClientError {
    ClientError::Api {
        status: 503,
        message: "engine unavailable".to_string(),
    }
}

fn not_found() -> ClientError {
    ClientError::NotFound("Server not found".to_string())
}

#[async_trait]
impl ControlPlane for RecordingControlPlane {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Login(username.to_string()));
        if username != "admin" || password != "secret" {
            return Err(ClientError::Unauthorized);
        }
        Ok(LoginResponse {
            access_token: "tok-admin".to_string(),
            token_type: Some("bearer".to_string()),
            expires_in: None,
        })
    }

    async fn list_instances(&self) -> Result<Vec<Instance>> {
        let state = self.enter(Call::ListInstances)?;
        Ok(state.instances.clone())
    }

    async fn get_instance(&self, id: &str) -> Result<Instance> {
        let state = self.enter(Call::GetInstance(id.to_string()))?;
        state
            .instances
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create_instance(&self, payload: CreateInstancePayload) -> Result<Instance> {
        let name = payload.name.clone();
        let mut state = self.mutation(Call::CreateInstance(payload))?;
        let created = instance(
            &format!("srv-{}", state.instances.len() + 1),
            &name,
            InstanceStatus::Stopped,
        );
        state.instances.push(created.clone());
        Ok(created)
    }

    async fn update_instance(&self, id: &str, update: &UpdateInstanceRequest) -> Result<Instance> {
        let mut state = self.mutation(Call::UpdateInstance(id.to_string(), update.clone()))?;
        let inst = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(not_found)?;
        if let Some(description) = &update.description {
            inst.description = Some(description.clone());
        }
        Ok(inst.clone())
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        let mut state = self.mutation(Call::DeleteInstance(id.to_string()))?;
        state.instances.retain(|i| i.id != id);
        Ok(())
    }

    async fn upload_code(&self, id: &str, file: FilePart) -> Result<()> {
        self.mutation(Call::UploadCode(id.to_string(), file.filename))?;
        Ok(())
    }

    async fn upload_config(&self, id: &str, files: Vec<FilePart>) -> Result<()> {
        let names = files.into_iter().map(|f| f.filename).collect();
        self.mutation(Call::UploadConfig(id.to_string(), names))?;
        Ok(())
    }

    async fn instance_action(&self, id: &str, action: LifecycleAction) -> Result<ActionResponse> {
        let mut state = self.enter(Call::Action(id.to_string(), action))?;
        if state.fail_actions {
            return Err(unavailable());
        }

        let inst = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(not_found)?;
        match action {
            LifecycleAction::Start | LifecycleAction::Restart | LifecycleAction::Rebuild => {
                inst.status = InstanceStatus::Running;
                inst.host_port = Some(30001);
            }
            LifecycleAction::Stop | LifecycleAction::RemoveContainer => {
                inst.status = InstanceStatus::Stopped;
                inst.host_port = None;
            }
        }

        Ok(ActionResponse {
            message: format!("{} done", action),
            details: None,
        })
    }

    async fn list_images(&self) -> Result<Vec<ImageOption>> {
        self.enter(Call::ListImages)?;
        Ok(vec![
            ImageOption {
                name: "python:3.11-slim".to_string(),
                size: Some(ImageSize::Text("48.2MB".to_string())),
            },
            ImageOption {
                name: "corp/mcp-base:latest".to_string(),
                size: Some(ImageSize::Bytes(157_286_400)),
            },
        ])
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        let state = self.enter(Call::SystemStatus)?;
        if state.fail_system_status {
            return Err(unavailable());
        }
        Ok(SystemStatus {
            docker_available: true,
            docker_version: Some("24.0.7".to_string()),
            api_version: Some("1.43".to_string()),
            platform_version: Some("1.0.0".to_string()),
            ..Default::default()
        })
    }

    async fn port_pool_status(&self) -> Result<PortPoolStatus> {
        self.enter(Call::PortPoolStatus)?;
        Ok(PortPoolStatus {
            port_pool_start: 30000,
            port_pool_end: 30200,
            total_ports: 200,
            allocated_ports_count: 15,
            available_ports_count: 185,
            allocated_ports: vec![30001],
            port_assignments: vec![PortAssignment {
                port: 30001,
                server_id: Some("srv-1".to_string()),
                server_name: "weather".to_string(),
                status: "running".to_string(),
                container_port: Some(8000),
                is_allocated: true,
                is_running: true,
            }],
            sample_available_ports: (30002..30040).collect(),
        })
    }

    async fn list_config_files(&self, id: &str) -> Result<Vec<ConfigFile>> {
        self.enter(Call::ListConfigFiles(id.to_string()))?;
        Ok(vec![ConfigFile {
            id: 7,
            filename: "settings.json".to_string(),
            content: "{}".to_string(),
            created_at: None,
            updated_at: None,
        }])
    }

    async fn add_config_file(&self, id: &str, file: &ConfigFileContent) -> Result<ConfigFile> {
        self.mutation(Call::AddConfigFile(id.to_string(), file.clone()))?;
        Ok(ConfigFile {
            id: 8,
            filename: file.filename.clone(),
            content: file.content.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    async fn update_config_file(
        &self,
        id: &str,
        config_id: i64,
        file: &ConfigFileContent,
    ) -> Result<ConfigFile> {
        self.mutation(Call::UpdateConfigFile(id.to_string(), config_id, file.clone()))?;
        Ok(ConfigFile {
            id: config_id,
            filename: file.filename.clone(),
            content: file.content.clone(),
            created_at: None,
            updated_at: None,
        })
    }

    async fn delete_config_file(&self, id: &str, config_id: i64) -> Result<()> {
        self.mutation(Call::DeleteConfigFile(id.to_string(), config_id))?;
        Ok(())
    }
}
