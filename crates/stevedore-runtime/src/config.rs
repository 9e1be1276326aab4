//! Declarative container configuration.
//!
//! [`ContainerConfig`] describes what to run and [`HostConfig`] how the host
//! should run it. Both are owned by the container and read-only to the
//! launch spec assembly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stevedore_common::types::{ImageId, IsolationMode, ResourceLimits};

/// Per-run description of the container process and its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Entrypoint override. When non-empty its first element is executed.
    pub entrypoint: Vec<String>,
    /// Command, appended to the entrypoint or executed directly.
    pub cmd: Vec<String>,
    /// Environment in `KEY=value` form.
    pub env: Vec<String>,
    /// Whether a pseudo-terminal is attached.
    pub tty: bool,
    /// User the process runs as.
    pub user: String,
    /// Working directory inside the container.
    pub working_dir: String,
    /// Leaf image of the container's filesystem, if any.
    pub image: Option<ImageId>,
    /// Disables all networking.
    pub network_disabled: bool,
    /// MAC address for the container interface.
    pub mac_address: String,
    /// Container hostname.
    pub hostname: String,
}

/// A host address a container port is published on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortBinding {
    /// Host IP to bind, empty for all addresses.
    pub host_ip: String,
    /// Host port to bind.
    pub host_port: String,
}

/// Published ports keyed by container port (`"80/tcp"`).
pub type PortMap = BTreeMap<String, Vec<PortBinding>>;

/// Console geometry in characters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSize {
    /// Rows.
    pub height: u32,
    /// Columns.
    pub width: u32,
}

/// Host-supplied runtime policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Network mode, `mode` or `mode:detail`.
    pub network_mode: String,
    /// Resource constraints.
    pub resources: ResourceLimits,
    /// Published ports.
    pub port_bindings: PortMap,
    /// Initial console size; absent means driver default.
    pub console_size: Option<ConsoleSize>,
    /// Runs the process with extended privileges.
    pub privileged: bool,
    /// Containment strategy.
    pub isolation: IsolationMode,
    /// Network namespace key handed to the network stack.
    pub network_namespace_key: String,
}
