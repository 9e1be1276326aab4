//! Core container struct and lifecycle state transitions.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerId, ContainerState};

use crate::config::{ContainerConfig, HostConfig};

/// A container instance with its configuration and runtime state.
#[derive(Debug, Clone)]
pub struct Container {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name.
    pub name: String,
    /// Process-level configuration.
    pub config: ContainerConfig,
    /// Host runtime policy.
    pub host_config: HostConfig,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Path the container's root filesystem is mounted at.
    pub rootfs: PathBuf,
    /// Security label applied to mounts.
    pub mount_label: String,
    /// Security label applied to the process.
    pub process_label: String,
    /// PID of the container's init process (if running).
    pub pid: Option<u32>,
    /// Time of the first successful start.
    pub started_at: Option<DateTime<Utc>>,
}

impl Container {
    /// Creates a new container in the `Created` state.
    #[must_use]
    pub fn new(
        id: ContainerId,
        name: impl Into<String>,
        config: ContainerConfig,
        host_config: HostConfig,
        rootfs: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            config,
            host_config,
            state: ContainerState::Created,
            rootfs: rootfs.into(),
            mount_label: String::new(),
            process_label: String::new(),
            pid: None,
            started_at: None,
        }
    }

    /// Whether the container has successfully started at least once.
    #[must_use]
    pub const fn has_been_started_before(&self) -> bool {
        self.started_at.is_some()
    }

    /// Moves the container into `Starting`.
    ///
    /// # Errors
    ///
    /// Returns an error unless the container is `Created`, `Stopped`, or `Failed`.
    pub fn begin_start(&mut self) -> Result<()> {
        match self.state {
            ContainerState::Created | ContainerState::Stopped | ContainerState::Failed => {
                self.state = ContainerState::Starting;
                Ok(())
            }
            ContainerState::Starting | ContainerState::Running => {
                Err(self.invalid_state("start"))
            }
        }
    }

    /// Records a successful start.
    pub fn mark_running(&mut self, pid: u32) {
        self.state = ContainerState::Running;
        self.pid = Some(pid);
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        tracing::info!(id = %self.id, pid, "container running");
    }

    /// Records a failed start.
    pub fn mark_failed(&mut self) {
        self.state = ContainerState::Failed;
        self.pid = None;
    }

    /// Moves a running container into `Stopped` ahead of cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error unless the container is `Running`.
    pub fn begin_cleanup(&mut self) -> Result<()> {
        if self.state != ContainerState::Running {
            return Err(self.invalid_state("clean up"));
        }
        self.state = ContainerState::Stopped;
        self.pid = None;
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> StevedoreError {
        StevedoreError::InvalidState {
            id: self.id.to_string(),
            state: self.state.to_string(),
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        Container::new(
            ContainerId::new("c1"),
            "web",
            ContainerConfig::default(),
            HostConfig::default(),
            "/rootfs",
        )
    }

    #[test]
    fn new_container_has_created_state() {
        let c = container();
        assert_eq!(c.state, ContainerState::Created);
        assert!(c.pid.is_none());
        assert!(!c.has_been_started_before());
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut c = container();
        c.begin_start().expect("first start");
        let err = c.begin_start().unwrap_err();
        assert!(matches!(err, StevedoreError::InvalidState { .. }));
    }

    #[test]
    fn running_records_first_start_once() {
        let mut c = container();
        c.begin_start().expect("start");
        c.mark_running(42);
        let first = c.started_at;
        assert!(c.has_been_started_before());

        c.begin_cleanup().expect("cleanup");
        c.begin_start().expect("restart");
        c.mark_running(43);
        assert_eq!(c.started_at, first);
        assert_eq!(c.pid, Some(43));
    }

    #[test]
    fn cleanup_requires_running() {
        let mut c = container();
        assert!(c.begin_cleanup().is_err());
    }

    #[test]
    fn failed_container_can_retry_start() {
        let mut c = container();
        c.begin_start().expect("start");
        c.mark_failed();
        assert_eq!(c.state, ContainerState::Failed);
        c.begin_start().expect("retry");
    }
}
