use fleet_client::{ConfigEntry, ControlPlane, CreateInstancePayload, FilePart};
use fleet_models::{EnvVar, ImageOption, DEFAULT_ENTRY_OBJECT};

use super::ValidationError;
use crate::notify::Notice;

/// How an env value input is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Password,
    Text,
}

/// One editable environment variable row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvVarEntry {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
    revealed: bool,
}

impl EnvVarEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, is_secret: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_secret,
            revealed: false,
        }
    }

    /// Secret values are masked until revealed; plain values are always shown
    pub fn input_type(&self) -> InputType {
        if self.is_secret && !self.revealed {
            InputType::Password
        } else {
            InputType::Text
        }
    }

    pub fn toggle_visibility(&mut self) {
        self.revealed = !self.revealed;
    }

    fn to_env_var(&self) -> EnvVar {
        EnvVar::new(self.key.trim(), self.value.clone(), self.is_secret)
    }
}

/// State of the create-instance form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstanceForm {
    pub name: String,
    pub description: String,
    pub entry_object: String,
    /// Blank for automatic assignment, else a port or comma list
    pub ports: String,
    pub command: String,
    pub args: String,
    pub image: Option<String>,
    pub env_vars: Vec<EnvVarEntry>,
    pub config_files: Vec<ConfigEntry>,
    pub code: Option<FilePart>,
}

impl Default for CreateInstanceForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            entry_object: DEFAULT_ENTRY_OBJECT.to_string(),
            ports: String::new(),
            command: String::new(),
            args: String::new(),
            image: None,
            env_vars: Vec::new(),
            config_files: Vec::new(),
            code: None,
        }
    }
}

impl CreateInstanceForm {
    pub fn add_env_var(&mut self, entry: EnvVarEntry) {
        self.env_vars.push(entry);
    }

    pub fn remove_env_var(&mut self, index: usize) {
        if index < self.env_vars.len() {
            self.env_vars.remove(index);
        }
    }

    pub fn add_config_file(&mut self, entry: ConfigEntry) {
        self.config_files.push(entry);
    }

    pub fn remove_config_file(&mut self, index: usize) {
        if index < self.config_files.len() {
            self.config_files.remove(index);
        }
    }

    /// Preselects the platform default image when offered, else the first one.
    /// An explicit choice is kept.
    pub fn apply_image_options(&mut self, images: &[ImageOption], platform_default: &str) {
        if self.image.is_some() {
            return;
        }
        self.image = images
            .iter()
            .find(|image| image.name == platform_default)
            .or_else(|| images.first())
            .map(|image| image.name.clone());
    }

    /// First failing rule, checked in the order name, env keys, config
    /// filenames, code file
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::NameRequired);
        }

        if let Some(index) = self.env_vars.iter().position(|e| e.key.trim().is_empty()) {
            return Err(ValidationError::EnvKeyRequired(index + 1));
        }

        if let Some(index) = self
            .config_files
            .iter()
            .position(|c| c.filename().trim().is_empty())
        {
            return Err(ValidationError::ConfigFilenameRequired(index + 1));
        }

        if self.code.is_none() {
            return Err(ValidationError::CodeFileRequired);
        }

        Ok(())
    }

    pub fn to_payload(&self) -> Result<CreateInstancePayload, ValidationError> {
        self.validate()?;
        let code = self.code.clone().ok_or(ValidationError::CodeFileRequired)?;

        let optional = |value: &str| Some(value.to_string()).filter(|v| !v.trim().is_empty());

        Ok(CreateInstancePayload {
            name: self.name.trim().to_string(),
            description: optional(&self.description),
            entry_object: self.entry_object.clone(),
            ports: optional(&self.ports),
            command: optional(&self.command),
            args: optional(&self.args),
            image: self.image.clone(),
            env_vars: self.env_vars.iter().map(EnvVarEntry::to_env_var).collect(),
            config_files: self.config_files.clone(),
            code,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Create dialog: the form plus its open and submitting state
#[derive(Debug, Default)]
pub struct CreateInstanceDialog {
    pub form: CreateInstanceForm,
    open: bool,
    submitting: bool,
}

impl CreateInstanceDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Validates and submits the form.
    ///
    /// On success the dialog closes, the form resets and `on_created` runs
    /// once. On failure the dialog stays open with the form untouched.
    pub async fn submit<F>(&mut self, api: &dyn ControlPlane, on_created: F) -> Notice
    where
        F: FnOnce(),
    {
        if self.submitting {
            return Notice::info("Creation already in progress");
        }

        let payload = match self.form.to_payload() {
            Ok(payload) => payload,
            Err(e) => return Notice::error(e.to_string()),
        };

        self.submitting = true;
        let result = api.create_instance(payload).await;
        self.submitting = false;

        match result {
            Ok(instance) => {
                tracing::info!(id = %instance.id, name = %instance.name, "Instance created");
                self.form.reset();
                self.open = false;
                on_created();
                Notice::success(format!("Instance '{}' created", instance.name))
            }
            Err(e) => {
                tracing::error!(name = %self.form.name, error = %e, "Failed to create instance");
                Notice::error("Failed to create instance")
            }
        }
    }
}
