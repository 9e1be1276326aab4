//! Network mode dispatch.
//!
//! Turns a host network-mode string into the network descriptor the
//! execution driver attaches. The network stack itself is external; this
//! module only decides what to ask it for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stevedore_common::constants::CONTAINER_NETWORK_PREFIX;
use stevedore_common::error::{Result, StevedoreError};

use crate::config::{ContainerConfig, HostConfig, PortMap};

/// Parsed network mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkMode {
    /// No network descriptor at all.
    None,
    /// Attach to the default bridge. The empty string also parses here so
    /// containers created before modes were recorded keep working.
    Default,
    /// Join another container's network stack.
    Container(String),
}

impl FromStr for NetworkMode {
    type Err = StevedoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (mode, detail) = s.split_once(':').unwrap_or((s, ""));
        match mode {
            "none" => Ok(Self::None),
            "default" | "" => Ok(Self::Default),
            CONTAINER_NETWORK_PREFIX if !detail.is_empty() => Ok(Self::Container(detail.into())),
            _ => Err(StevedoreError::InvalidNetworkMode { mode: s.into() }),
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Default => write!(f, "default"),
            Self::Container(id) => write!(f, "{CONTAINER_NETWORK_PREFIX}:{id}"),
        }
    }
}

/// Interface attached to the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// MAC address, empty to let the stack choose.
    pub mac_address: String,
    /// Bridge (virtual switch) the interface joins.
    pub bridge: String,
    /// Published ports.
    pub port_bindings: PortMap,
}

/// Network descriptor handed to the execution driver.
///
/// A descriptor whose `interface` is `None` means networking was requested
/// but disabled for this container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Interface to attach, if networking is enabled.
    pub interface: Option<NetworkInterface>,
}

/// Resolves the network descriptor for a container.
///
/// Returns `None` for mode `none`.
///
/// # Errors
///
/// Returns [`StevedoreError::InvalidNetworkMode`] carrying the full mode
/// string if it is not recognized or not supported on this platform.
pub fn network_for(
    config: &ContainerConfig,
    host: &HostConfig,
    bridge: &str,
) -> Result<Option<Network>> {
    match host.network_mode.parse::<NetworkMode>()? {
        NetworkMode::None => Ok(None),
        NetworkMode::Default if config.network_disabled => Ok(Some(Network::default())),
        NetworkMode::Default => Ok(Some(Network {
            interface: Some(NetworkInterface {
                mac_address: config.mac_address.clone(),
                bridge: bridge.to_string(),
                port_bindings: host.port_bindings.clone(),
            }),
        })),
        NetworkMode::Container(_) => Err(StevedoreError::InvalidNetworkMode {
            mode: host.network_mode.clone(),
        }),
    }
}
