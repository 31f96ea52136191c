//! Read-only snapshots of the container engine and the port pool

use serde::{Deserialize, Serialize};
use std::fmt;

/// Container engine status as seen by the control plane
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SystemStatus {
    pub docker_available: bool,
    pub docker_version: Option<String>,
    pub api_version: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub containers: Vec<ContainerSummary>,
    #[serde(default)]
    pub images: Vec<ImageSummary>,
    pub platform_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    #[serde(default)]
    pub created: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSummary {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub created: String,
}

/// Snapshot of the host-port allocator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PortPoolStatus {
    pub port_pool_start: u16,
    pub port_pool_end: u16,
    pub total_ports: u32,
    pub allocated_ports_count: u32,
    pub available_ports_count: u32,
    #[serde(default)]
    pub allocated_ports: Vec<u16>,
    #[serde(default)]
    pub port_assignments: Vec<PortAssignment>,
    #[serde(default)]
    pub sample_available_ports: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortAssignment {
    pub port: u16,
    pub server_id: Option<String>,
    pub server_name: String,
    pub status: String,
    pub container_port: Option<u16>,
    #[serde(default)]
    pub is_allocated: bool,
    #[serde(default)]
    pub is_running: bool,
}

impl PortPoolStatus {
    /// Share of the pool in use, in percent
    pub fn usage_percent(&self) -> f64 {
        if self.total_ports == 0 {
            return 0.0;
        }
        self.allocated_ports_count as f64 / self.total_ports as f64 * 100.0
    }

    /// Usage rendered with two decimals, e.g. `7.50%`
    pub fn usage_display(&self) -> String {
        format!("{:.2}%", self.usage_percent())
    }

    /// At most `limit` free ports from the sample
    pub fn free_port_preview(&self, limit: usize) -> &[u16] {
        let end = self.sample_available_ports.len().min(limit);
        &self.sample_available_ports[..end]
    }
}

/// Entry of the base-image picker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageOption {
    pub name: String,
    pub size: Option<ImageSize>,
}

/// Image size as the control plane reports it: raw bytes or preformatted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ImageSize {
    Bytes(u64),
    Text(String),
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSize::Bytes(bytes) => f.write_str(&format_bytes(*bytes)),
            ImageSize::Text(text) => f.write_str(text),
        }
    }
}

/// Unauthenticated platform identification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformVersion {
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Human-readable byte count with binary units and at most two decimals
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
