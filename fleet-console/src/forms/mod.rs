pub mod create;
pub mod edit;

use thiserror::Error;

pub use create::{CreateInstanceDialog, CreateInstanceForm, EnvVarEntry, InputType};
pub use edit::{EditInstanceDialog, EditInstanceForm, RESTART_WARNING};

/// Local checks that stop a submission before any call is made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Environment variable #{0} needs a key")]
    EnvKeyRequired(usize),
    #[error("Config file #{0} needs a filename")]
    ConfigFilenameRequired(usize),
    #[error("Select a code file (.py or .zip)")]
    CodeFileRequired,
    #[error("Port must be a number between 1 and 65535, got '{0}'")]
    InvalidPort(String),
    #[error("Select at least one config file")]
    NoConfigFiles,
}
