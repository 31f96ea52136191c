//! Managed instance records as reported by the control plane

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entry object used when the operator leaves it blank
pub const DEFAULT_ENTRY_OBJECT: &str = "mcp";

fn default_entry_object() -> String {
    DEFAULT_ENTRY_OBJECT.to_string()
}

/// Lifecycle status of an instance. Owned by the control plane; the console
/// only ever displays what the last fetch returned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Stopped,
    Running,
    Building,
    Error,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 4] = [
        InstanceStatus::Stopped,
        InstanceStatus::Running,
        InstanceStatus::Building,
        InstanceStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Running => "running",
            InstanceStatus::Building => "building",
            InstanceStatus::Error => "error",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceStatus::Running)
    }

    /// Colour of the status badge on an instance card
    pub fn badge_color(&self) -> BadgeColor {
        match self {
            InstanceStatus::Running => BadgeColor::Green,
            InstanceStatus::Error => BadgeColor::Red,
            InstanceStatus::Building => BadgeColor::Yellow,
            InstanceStatus::Stopped => BadgeColor::Slate,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Red,
    Yellow,
    Slate,
}

impl BadgeColor {
    /// SGR foreground code for terminals
    pub fn ansi_code(&self) -> &'static str {
        match self {
            BadgeColor::Green => "32",
            BadgeColor::Red => "31",
            BadgeColor::Yellow => "33",
            BadgeColor::Slate => "90",
        }
    }
}

/// Environment variable attached to an instance.
///
/// `id` is only present on records read back from the control plane and is
/// never sent on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub is_secret: bool,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>, is_secret: bool) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: value.into(),
            is_secret,
        }
    }

    /// Value as it may be shown to the operator
    pub fn display_value(&self) -> &str {
        if self.is_secret {
            "********"
        } else {
            &self.value
        }
    }
}

/// Stored configuration file of an instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigFile {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub content: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A managed, containerized deployment of operator-supplied code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_entry_object")]
    pub entry_object: String,
    /// Requested port specification, a single port or a comma list
    pub ports: Option<String>,
    /// Primary host port, present once the container runs
    pub host_port: Option<u16>,
    /// JSON object mapping container ports to host ports
    pub host_ports: Option<String>,
    pub command: Option<String>,
    pub args: Option<String>,
    pub image: Option<String>,
    pub status: InstanceStatus,
    pub sse_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
    #[serde(default)]
    pub config_files: Vec<ConfigFile>,
}

/// What the console can say about an instance's network reachability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortState {
    /// Container is up and bound to this host port
    Running(u16),
    /// A port specification is reserved but nothing listens yet
    AssignedNotStarted(String),
    Unassigned,
}

impl Instance {
    pub fn description_or_placeholder(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => "No description",
        }
    }

    pub fn port_state(&self) -> PortState {
        if self.status.is_running() {
            return match self.host_port {
                Some(port) => PortState::Running(port),
                None => PortState::Unassigned,
            };
        }

        match self.ports.as_deref().map(str::trim) {
            Some(spec) if !spec.is_empty() => PortState::AssignedNotStarted(spec.to_string()),
            _ => PortState::Unassigned,
        }
    }

    /// Reachable endpoint of a running instance.
    ///
    /// Prefers the URL reported by the control plane and falls back to
    /// `http://{gateway_host}:{host_port}/sse`.
    pub fn endpoint_url(&self, gateway_host: &str) -> Option<String> {
        let PortState::Running(port) = self.port_state() else {
            return None;
        };

        match self.sse_url.as_deref() {
            Some(url) if !url.is_empty() => Some(url.to_string()),
            _ => Some(format!("http://{}:{}/sse", gateway_host, port)),
        }
    }

    /// Container-port to host-port bindings. Unparseable data yields an empty map.
    pub fn host_port_map(&self) -> BTreeMap<u16, u16> {
        let Some(raw) = self.host_ports.as_deref() else {
            return BTreeMap::new();
        };

        serde_json::from_str::<BTreeMap<String, u16>>(raw)
            .map(|map| {
                map.into_iter()
                    .filter_map(|(container, host)| {
                        let container = container.split('/').next()?.parse().ok()?;
                        Some((container, host))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Instance counts shown on the overview page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetStats {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub building: usize,
    pub error: usize,
}

impl FleetStats {
    pub fn from_instances(instances: &[Instance]) -> Self {
        let mut stats = FleetStats {
            total: instances.len(),
            ..Default::default()
        };

        for instance in instances {
            match instance.status {
                InstanceStatus::Running => stats.running += 1,
                InstanceStatus::Stopped => stats.stopped += 1,
                InstanceStatus::Building => stats.building += 1,
                InstanceStatus::Error => stats.error += 1,
            }
        }

        stats
    }
}
