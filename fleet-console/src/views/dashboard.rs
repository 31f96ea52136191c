use fleet_client::{ClientError, ControlPlane};
use fleet_models::{ActionMenu, Instance, LifecycleAction, PortState};
use std::fmt;

use crate::notify::Notice;

/// Instance list. Every successful fetch replaces the list wholesale; a
/// failed fetch keeps what was there.
#[derive(Debug, Default)]
pub struct InstanceListView {
    instances: Vec<Instance>,
    fetches: usize,
}

impl InstanceListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Number of list fetches issued so far
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Looks an instance up by id, then by name
    pub fn find(&self, key: &str) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|i| i.id == key)
            .or_else(|| self.instances.iter().find(|i| i.name == key))
    }

    pub async fn refresh(&mut self, api: &dyn ControlPlane) -> Result<(), ClientError> {
        self.fetches += 1;
        match api.list_instances().await {
            Ok(instances) => {
                tracing::debug!(count = instances.len(), "Instance list refreshed");
                self.instances = instances;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch instances");
                Err(e)
            }
        }
    }

    /// Issues one action, then refetches the list whatever the outcome
    pub async fn run_action(
        &mut self,
        api: &dyn ControlPlane,
        id: &str,
        action: LifecycleAction,
    ) -> Notice {
        let notice = match api.instance_action(id, action).await {
            Ok(response) => {
                tracing::info!(id, %action, message = %response.message, "Action completed");
                Notice::success(action.success_message())
            }
            Err(e) => {
                tracing::error!(id, %action, error = %e, "Action failed");
                Notice::error(action.failure_message())
            }
        };

        // Fetch errors are already logged; the previous list stays.
        let _ = self.refresh(api).await;
        notice
    }

    pub fn render_table(&self) -> String {
        InstanceTable(&self.instances).to_string()
    }

    pub fn render_cards(&self, gateway_host: &str, color: bool) -> String {
        self.instances
            .iter()
            .map(|inst| render_card(inst, gateway_host, color))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct InstanceTable<'a>(&'a [Instance]);

impl fmt::Display for InstanceTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<38} {:<20} {:<10} {:<12} {:<22}",
            "ID", "NAME", "STATUS", "ENTRY", "PORT"
        )?;
        writeln!(f, "{}", "-".repeat(104))?;

        for inst in self.0 {
            writeln!(
                f,
                "{:<38} {:<20} {:<10} {:<12} {:<22}",
                inst.id,
                inst.name,
                inst.status,
                inst.entry_object,
                port_label(&inst.port_state())
            )?;
        }

        writeln!(f)?;
        write!(f, "{} instance(s) found", self.0.len())
    }
}

fn port_label(state: &PortState) -> String {
    match state {
        PortState::Running(port) => format!("{} (running)", port),
        PortState::AssignedNotStarted(spec) => format!("{} (assigned, not started)", spec),
        PortState::Unassigned => "auto-assigned on start".to_string(),
    }
}

fn badge(inst: &Instance, color: bool) -> String {
    if color {
        format!(
            "\x1b[{}m[{}]\x1b[0m",
            inst.status.badge_color().ansi_code(),
            inst.status
        )
    } else {
        format!("[{}]", inst.status)
    }
}

fn join_actions(actions: &[LifecycleAction]) -> String {
    actions
        .iter()
        .map(LifecycleAction::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text card for one instance
struct InstanceCard<'a> {
    inst: &'a Instance,
    gateway_host: &'a str,
    color: bool,
}

impl fmt::Display for InstanceCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inst = self.inst;
        writeln!(f, "{} {}", inst.name, badge(inst, self.color))?;
        writeln!(f, "  ID:          {}", inst.id)?;
        writeln!(f, "  Description: {}", inst.description_or_placeholder())?;
        writeln!(f, "  Entry:       {}", inst.entry_object)?;
        writeln!(f, "  Port:        {}", port_label(&inst.port_state()))?;

        if let Some(url) = inst.endpoint_url(self.gateway_host) {
            writeln!(f, "  Endpoint:    {}", url)?;
        }

        let menu = ActionMenu::for_status(inst.status);
        write!(f, "  Actions:     {}", join_actions(menu.primary))?;
        if !menu.secondary.is_empty() {
            write!(f, " | more: {}", join_actions(menu.secondary))?;
        }
        writeln!(f)
    }
}

pub fn render_card(inst: &Instance, gateway_host: &str, color: bool) -> String {
    InstanceCard {
        inst,
        gateway_host,
        color,
    }
    .to_string()
}
