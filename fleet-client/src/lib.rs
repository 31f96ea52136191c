//! Fleet Client - typed access to the fleet control plane
//!
//! This crate wraps the control plane's HTTP API (instances, lifecycle
//! actions, uploads, system and port-pool snapshots) behind the
//! [`ControlPlane`] trait, and persists the operator session between runs.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fleet_client::{ControlPlane, ControlPlaneClient};
//! use fleet_models::LifecycleAction;
//!
//! # async fn example() -> fleet_client::Result<()> {
//! let client = ControlPlaneClient::new("http://localhost:8000")?;
//! let login = client.login("admin", "admin").await?;
//!
//! let client = client.with_token(login.access_token);
//! for instance in client.list_instances().await? {
//!     client.instance_action(&instance.id, LifecycleAction::Restart).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod payload;
pub mod session;

// Re-export key types for convenience
pub use client::{ControlPlane, ControlPlaneClient, RetryPolicy, DEFAULT_TIMEOUT, REQUEST_ID_HEADER};
pub use error::{ClientError, Result};
pub use payload::{ConfigEntry, CreateInstancePayload, FilePart, FormPart};
pub use session::{Session, SessionStore};
