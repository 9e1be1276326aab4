//! Process specification handed to the execution driver.

use serde::{Deserialize, Serialize};
use stevedore_common::constants::DEFAULT_PATH_ENV;

use crate::config::{ConsoleSize, ContainerConfig, HostConfig};

/// Execution driver process structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Runs with extended privileges.
    pub privileged: bool,
    /// Executable to launch.
    pub entrypoint: String,
    /// Arguments passed to the executable.
    pub arguments: Vec<String>,
    /// Whether a pseudo-terminal is attached.
    pub tty: bool,
    /// User the process runs as.
    pub user: String,
    /// Initial console size, `0x0` for the driver default.
    pub console_size: ConsoleSize,
    /// Environment in `KEY=value` form.
    pub env: Vec<String>,
}

/// Splits the configured entrypoint and command into executable and
/// arguments.
///
/// A non-empty entrypoint wins and the command is appended to its
/// arguments. Otherwise the command runs on its own.
#[must_use]
pub fn split_command(config: &ContainerConfig) -> (String, Vec<String>) {
    let mut parts = config.entrypoint.iter().chain(&config.cmd).cloned();
    let entrypoint = parts.next().unwrap_or_default();
    (entrypoint, parts.collect())
}

/// Environment the process starts with.
///
/// No containers are linked on this platform, so this is the container's
/// own environment. A `PATH` is only added when [`DEFAULT_PATH_ENV`] is set.
#[must_use]
pub fn daemon_environment(config: &ContainerConfig) -> Vec<String> {
    let mut env = config.env.clone();
    if !DEFAULT_PATH_ENV.is_empty() && !env.iter().any(|e| e.starts_with("PATH=")) {
        env.insert(0, format!("PATH={DEFAULT_PATH_ENV}"));
    }
    env
}

/// Maps container and host configuration to a process spec.
#[must_use]
pub fn process_spec_for(config: &ContainerConfig, host: &HostConfig, env: Vec<String>) -> ProcessSpec {
    let (entrypoint, arguments) = split_command(config);
    ProcessSpec {
        privileged: host.privileged,
        entrypoint,
        arguments,
        tty: config.tty,
        user: config.user.clone(),
        console_size: host.console_size.unwrap_or_default(),
        env,
    }
}
