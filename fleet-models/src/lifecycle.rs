//! Lifecycle actions and which of them a given status offers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::instance::InstanceStatus;

/// Command issued against one instance through the control plane
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
    /// Drops the container; code, config and data stay on the control plane
    RemoveContainer,
    /// Discards the container and recreates it from the current configuration
    Rebuild,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 5] = [
        LifecycleAction::Start,
        LifecycleAction::Stop,
        LifecycleAction::Restart,
        LifecycleAction::RemoveContainer,
        LifecycleAction::Rebuild,
    ];

    /// Wire tag sent as `{"action": ...}`
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Restart => "restart",
            LifecycleAction::RemoveContainer => "remove_container",
            LifecycleAction::Rebuild => "rebuild",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, LifecycleAction::RemoveContainer)
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "Instance started successfully",
            LifecycleAction::Stop => "Instance stopped successfully",
            LifecycleAction::Restart => "Instance restarted successfully",
            LifecycleAction::RemoveContainer => "Container removed successfully",
            LifecycleAction::Rebuild => "Instance rebuilt successfully",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "Failed to start instance",
            LifecycleAction::Stop => "Failed to stop instance",
            LifecycleAction::Restart => "Failed to restart instance",
            LifecycleAction::RemoveContainer => "Failed to remove container",
            LifecycleAction::Rebuild => "Failed to rebuild instance",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}' (expected one of: start, stop, restart, remove_container, rebuild)")]
pub struct ParseActionError(String);

impl FromStr for LifecycleAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        LifecycleAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}

/// Actions offered for one status. `primary` actions are shown prominently,
/// `secondary` ones only in the overflow list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMenu {
    pub primary: &'static [LifecycleAction],
    pub secondary: &'static [LifecycleAction],
}

use LifecycleAction::{Rebuild, RemoveContainer, Restart, Start, Stop};

const RUNNING_MENU: ActionMenu = ActionMenu {
    primary: &[Stop, Restart],
    secondary: &[Rebuild, RemoveContainer],
};

const STOPPED_MENU: ActionMenu = ActionMenu {
    primary: &[Start, Rebuild, RemoveContainer],
    secondary: &[],
};

const ERROR_MENU: ActionMenu = ActionMenu {
    primary: &[Start, Rebuild, RemoveContainer],
    secondary: &[],
};

const BUILDING_MENU: ActionMenu = ActionMenu {
    primary: &[Start],
    secondary: &[Rebuild, RemoveContainer],
};

impl ActionMenu {
    pub fn for_status(status: InstanceStatus) -> Self {
        match status {
            InstanceStatus::Running => RUNNING_MENU,
            InstanceStatus::Stopped => STOPPED_MENU,
            InstanceStatus::Error => ERROR_MENU,
            InstanceStatus::Building => BUILDING_MENU,
        }
    }

    pub fn offers(&self, action: LifecycleAction) -> bool {
        self.primary.contains(&action) || self.secondary.contains(&action)
    }

    pub fn is_prominent(&self, action: LifecycleAction) -> bool {
        self.primary.contains(&action)
    }

    pub fn actions(&self) -> impl Iterator<Item = LifecycleAction> + '_ {
        self.primary.iter().chain(self.secondary.iter()).copied()
    }
}

/// Request body of the action endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: LifecycleAction,
}

/// Response of the action endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResponse {
    #[serde(default)]
    pub message: String,
    pub details: Option<serde_json::Value>,
}
