//! Resource limits handed to the execution driver.

use serde::{Deserialize, Serialize};

use crate::config::HostConfig;

/// Execution driver resource structure.
///
/// Zero means "use the driver default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// CPU shares (relative weight).
    pub cpu_shares: u64,
    /// Memory limit in bytes.
    pub memory_bytes: u64,
}

/// Maps host resource policy to the driver's resource structure.
#[must_use]
pub fn resources_for(host: &HostConfig) -> Resources {
    Resources {
        cpu_shares: host.resources.cpu_shares.unwrap_or(0),
        memory_bytes: host.resources.memory_bytes.unwrap_or(0),
    }
}
