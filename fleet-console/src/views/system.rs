use fleet_client::ControlPlane;
use fleet_models::{format_bytes, parse_timestamp, PortPoolStatus, SystemStatus};
use std::fmt;

/// Free ports listed in the port-pool summary
pub const FREE_PORT_PREVIEW: usize = 20;

/// Engine and port-pool snapshots, fetched together and replaced together
#[derive(Debug, Default)]
pub struct SystemView {
    status: Option<SystemStatus>,
    ports: Option<PortPoolStatus>,
}

impl SystemView {
    pub fn new() -> Self {
        Self::default()
    }

    /// View holding only a port-pool snapshot
    pub fn with_ports(ports: PortPoolStatus) -> Self {
        Self {
            status: None,
            ports: Some(ports),
        }
    }

    pub fn status(&self) -> Option<&SystemStatus> {
        self.status.as_ref()
    }

    pub fn ports(&self) -> Option<&PortPoolStatus> {
        self.ports.as_ref()
    }

    /// Fetches both snapshots concurrently. A failed half is left empty.
    pub async fn refresh(&mut self, api: &dyn ControlPlane) {
        let (status, ports) = tokio::join!(api.system_status(), api.port_pool_status());

        self.status = status
            .map_err(|e| tracing::warn!(error = %e, "Failed to fetch system status"))
            .ok();
        self.ports = ports
            .map_err(|e| tracing::warn!(error = %e, "Failed to fetch port pool status"))
            .ok();
    }

    pub fn render(&self) -> String {
        format!("{}\n{}", self.render_engine(), self.render_ports())
    }

    pub fn render_engine(&self) -> String {
        EngineReport(self.status.as_ref()).to_string()
    }

    pub fn render_ports(&self) -> String {
        PortReport(self.ports.as_ref()).to_string()
    }
}

struct EngineReport<'a>(Option<&'a SystemStatus>);

impl fmt::Display for EngineReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Container Engine")?;
        writeln!(f, "{}", "=".repeat(80))?;

        let Some(status) = self.0 else {
            return writeln!(f, "Status unavailable");
        };

        if status.docker_available {
            writeln!(f, "  Available:       ✓ yes")?;
            writeln!(
                f,
                "  Engine Version:  {}",
                status.docker_version.as_deref().unwrap_or("-")
            )?;
            writeln!(
                f,
                "  API Version:     {}",
                status.api_version.as_deref().unwrap_or("-")
            )?;
        } else {
            writeln!(f, "  Available:       ✗ no")?;
            if let Some(error) = &status.error {
                writeln!(f, "  Error:           {}", error)?;
            }
        }
        if let Some(platform) = &status.platform_version {
            writeln!(f, "  Platform:        {}", platform)?;
        }
        writeln!(f)?;

        writeln!(f, "Containers ({})", status.containers.len())?;
        if status.containers.is_empty() {
            writeln!(f, "  No containers found")?;
        } else {
            writeln!(
                f,
                "  {:<14} {:<24} {:<28} {:<10} {:<20}",
                "ID", "NAME", "IMAGE", "STATUS", "CREATED"
            )?;
            for c in &status.containers {
                writeln!(
                    f,
                    "  {:<14} {:<24} {:<28} {:<10} {:<20}",
                    short_id(&c.id),
                    c.name,
                    c.image,
                    c.status,
                    format_date(&c.created)
                )?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Images ({})", status.images.len())?;
        if status.images.is_empty() {
            return writeln!(f, "  No images found");
        }
        writeln!(
            f,
            "  {:<14} {:<40} {:<10} {:<20}",
            "ID", "TAGS", "SIZE", "CREATED"
        )?;
        for image in &status.images {
            let tags = if image.tags.is_empty() {
                "<none>".to_string()
            } else {
                image.tags.join(", ")
            };
            writeln!(
                f,
                "  {:<14} {:<40} {:<10} {:<20}",
                short_id(&image.id),
                tags,
                format_bytes(image.size),
                format_date(&image.created)
            )?;
        }
        Ok(())
    }
}

struct PortReport<'a>(Option<&'a PortPoolStatus>);

impl fmt::Display for PortReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Port Pool")?;
        writeln!(f, "{}", "=".repeat(80))?;

        let Some(pool) = self.0 else {
            return writeln!(f, "Status unavailable");
        };

        writeln!(f, "  Range:           {}-{}", pool.port_pool_start, pool.port_pool_end)?;
        writeln!(f, "  Total:           {}", pool.total_ports)?;
        writeln!(f, "  Allocated:       {}", pool.allocated_ports_count)?;
        writeln!(f, "  Available:       {}", pool.available_ports_count)?;
        writeln!(
            f,
            "  Usage:           {} {}",
            gauge(pool.usage_percent()),
            pool.usage_display()
        )?;
        writeln!(f)?;

        writeln!(f, "Allocations ({})", pool.port_assignments.len())?;
        if pool.port_assignments.is_empty() {
            writeln!(f, "  No ports allocated")?;
        } else {
            writeln!(
                f,
                "  {:<8} {:<24} {:<10} {:<14}",
                "PORT", "INSTANCE", "STATUS", "CONTAINER PORT"
            )?;
            for a in &pool.port_assignments {
                let container_port = a
                    .container_port
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    f,
                    "  {:<8} {:<24} {:<10} {:<14}",
                    a.port, a.server_name, a.status, container_port
                )?;
            }
        }
        writeln!(f)?;

        let preview = pool.free_port_preview(FREE_PORT_PREVIEW);
        writeln!(f, "Free ports (first {})", preview.len())?;
        let listed = preview
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "  {}", if listed.is_empty() { "-" } else { listed.as_str() })
    }
}

fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}

/// Local-time rendering of a control plane timestamp, or the raw text
pub fn format_date(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None if raw.is_empty() => "-".to_string(),
        None => raw.to_string(),
    }
}

fn gauge(percent: f64) -> String {
    const WIDTH: usize = 20;
    let filled = ((percent / 100.0) * WIDTH as f64).round().clamp(0.0, WIDTH as f64) as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(WIDTH - filled))
}
