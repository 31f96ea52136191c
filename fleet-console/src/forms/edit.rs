use fleet_client::{ControlPlane, FilePart};
use fleet_models::{Instance, UpdateInstanceRequest, DEFAULT_ENTRY_OBJECT};

use super::ValidationError;
use crate::notify::Notice;

pub const RESTART_WARNING: &str =
    "Code and config changes take effect only after the instance is restarted.";

/// Editable fields of an existing instance
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditInstanceForm {
    pub description: String,
    pub entry_object: String,
    pub port: String,
    pub command: String,
    pub args: String,
}

impl EditInstanceForm {
    /// Prefills from the instance; the runtime host port stands in for the
    /// configured one
    pub fn from_instance(instance: &Instance) -> Self {
        let entry_object = if instance.entry_object.trim().is_empty() {
            DEFAULT_ENTRY_OBJECT.to_string()
        } else {
            instance.entry_object.clone()
        };

        Self {
            description: instance.description.clone().unwrap_or_default(),
            entry_object,
            port: instance
                .host_port
                .map(|p| p.to_string())
                .unwrap_or_default(),
            command: instance.command.clone().unwrap_or_default(),
            args: instance.args.clone().unwrap_or_default(),
        }
    }

    /// Partial update carrying only the editable fields. A blank port is
    /// left out; anything else must be a valid port number.
    pub fn to_update(&self) -> Result<UpdateInstanceRequest, ValidationError> {
        let port = match self.port.trim() {
            "" => None,
            raw => match raw.parse::<u16>() {
                Ok(port) if port > 0 => Some(port),
                _ => return Err(ValidationError::InvalidPort(raw.to_string())),
            },
        };

        let entry_object = match self.entry_object.trim() {
            "" => DEFAULT_ENTRY_OBJECT.to_string(),
            value => value.to_string(),
        };

        Ok(UpdateInstanceRequest {
            description: Some(self.description.clone()),
            entry_object: Some(entry_object),
            command: Some(self.command.clone()),
            args: Some(self.args.clone()),
            port,
        })
    }
}

/// Edit dialog for one instance. Saving fields, replacing code and uploading
/// config files are independent calls with their own busy flags.
#[derive(Debug)]
pub struct EditInstanceDialog {
    instance_id: String,
    pub form: EditInstanceForm,
    saving: bool,
    uploading_code: bool,
    uploading_config: bool,
}

impl EditInstanceDialog {
    pub fn new(instance: &Instance) -> Self {
        Self {
            instance_id: instance.id.clone(),
            form: EditInstanceForm::from_instance(instance),
            saving: false,
            uploading_code: false,
            uploading_config: false,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn warning(&self) -> &'static str {
        RESTART_WARNING
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn is_uploading_code(&self) -> bool {
        self.uploading_code
    }

    pub fn is_uploading_config(&self) -> bool {
        self.uploading_config
    }

    pub async fn save(&mut self, api: &dyn ControlPlane) -> Notice {
        if self.saving {
            return Notice::info("Save already in progress");
        }

        let update = match self.form.to_update() {
            Ok(update) => update,
            Err(e) => return Notice::error(e.to_string()),
        };

        self.saving = true;
        let result = api.update_instance(&self.instance_id, &update).await;
        self.saving = false;

        match result {
            Ok(instance) => {
                tracing::info!(id = %instance.id, "Instance updated");
                self.form = EditInstanceForm::from_instance(&instance);
                Notice::success("Instance updated")
            }
            Err(e) => {
                tracing::error!(id = %self.instance_id, error = %e, "Failed to update instance");
                Notice::error("Failed to update instance")
            }
        }
    }

    pub async fn upload_code(&mut self, api: &dyn ControlPlane, file: FilePart) -> Notice {
        if self.uploading_code {
            return Notice::info("Code upload already in progress");
        }

        let filename = file.filename.clone();
        self.uploading_code = true;
        let result = api.upload_code(&self.instance_id, file).await;
        self.uploading_code = false;

        match result {
            Ok(()) => {
                tracing::info!(id = %self.instance_id, file = %filename, "Code uploaded");
                Notice::success(format!("Uploaded {}. {}", filename, RESTART_WARNING))
            }
            Err(e) => {
                tracing::error!(id = %self.instance_id, error = %e, "Failed to upload code");
                Notice::error("Failed to upload code")
            }
        }
    }

    pub async fn upload_config(&mut self, api: &dyn ControlPlane, files: Vec<FilePart>) -> Notice {
        if self.uploading_config {
            return Notice::info("Config upload already in progress");
        }
        if files.is_empty() {
            return Notice::error(ValidationError::NoConfigFiles.to_string());
        }

        let count = files.len();
        self.uploading_config = true;
        let result = api.upload_config(&self.instance_id, files).await;
        self.uploading_config = false;

        match result {
            Ok(()) => {
                tracing::info!(id = %self.instance_id, count, "Config files uploaded");
                Notice::success(format!(
                    "Uploaded {} config file(s). {}",
                    count, RESTART_WARNING
                ))
            }
            Err(e) => {
                tracing::error!(id = %self.instance_id, error = %e, "Failed to upload config files");
                Notice::error("Failed to upload config files")
            }
        }
    }
}
