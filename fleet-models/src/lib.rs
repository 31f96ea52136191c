use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod instance;
pub mod lifecycle;
pub mod system;

pub use instance::{
    BadgeColor, ConfigFile, EnvVar, FleetStats, Instance, InstanceStatus, PortState,
    DEFAULT_ENTRY_OBJECT,
};
pub use lifecycle::{ActionMenu, ActionRequest, ActionResponse, LifecycleAction, ParseActionError};
pub use system::{
    format_bytes, ContainerSummary, ImageOption, ImageSize, ImageSummary, PlatformVersion,
    PortAssignment, PortPoolStatus, SystemStatus,
};

/// Response from the token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, when the control plane reports one
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Partial update of an instance. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateInstanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_object: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Inline configuration file, as created or replaced through the config-file API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigFileContent {
    pub filename: String,
    pub content: String,
}

/// Parses the timestamps the control plane emits.
///
/// Accepts RFC 3339 as well as naive ISO datetimes (with or without
/// fractional seconds), which are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
