//! Isolation-dependent filesystem lifecycle.
//!
//! Process-isolated containers share the host kernel, so their filesystem
//! is mounted on the host before start and unmounted on cleanup.
//! Hypervisor-isolated containers run in a utility VM that attaches its own
//! storage, so the host never mounts for them.
//!
//! The controller takes no locks. Callers guarantee each event fires once
//! per lifecycle by checking the container state before invoking it.

use std::fmt;

use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerId, IsolationMode};
use stevedore_core::filesystem::ContainerFilesystem;

/// What start-preparation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The filesystem was mounted.
    Mounted,
    /// Mounting is not this host's job.
    Skipped,
}

/// What cleanup did.
#[derive(Debug)]
pub enum CleanupOutcome {
    /// The filesystem was unmounted.
    Unmounted,
    /// Unmounting is not this host's job.
    Skipped,
    /// The unmount failed; cleanup carried on regardless.
    UnmountFailed(StevedoreError),
}

impl CleanupOutcome {
    /// Returns the unmount error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&StevedoreError> {
        match self {
            Self::UnmountFailed(e) => Some(e),
            Self::Unmounted | Self::Skipped => None,
        }
    }
}

/// Filesystem handling for one isolation mode.
pub trait FilesystemLifecycle: fmt::Debug + Send + Sync {
    /// Runs before the container starts.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::MountFailed`] if mounting fails.
    fn prepare_start(
        &self,
        container: &ContainerId,
        fs: &mut dyn ContainerFilesystem,
    ) -> Result<StartOutcome>;

    /// Runs during container cleanup. Never fails.
    fn cleanup(&self, container: &ContainerId, fs: &mut dyn ContainerFilesystem)
    -> CleanupOutcome;
}

/// Host mounts the container filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIsolation;

impl FilesystemLifecycle for ProcessIsolation {
    fn prepare_start(
        &self,
        container: &ContainerId,
        fs: &mut dyn ContainerFilesystem,
    ) -> Result<StartOutcome> {
        fs.mount().map_err(|e| StevedoreError::MountFailed {
            container: container.to_string(),
            source: Box::new(e),
        })?;
        tracing::debug!(id = %container, "container filesystem mounted");
        Ok(StartOutcome::Mounted)
    }

    fn cleanup(
        &self,
        container: &ContainerId,
        fs: &mut dyn ContainerFilesystem,
    ) -> CleanupOutcome {
        match fs.unmount() {
            Ok(()) => {
                tracing::debug!(id = %container, "container filesystem unmounted");
                CleanupOutcome::Unmounted
            }
            Err(e) => {
                let err = StevedoreError::UnmountFailed {
                    container: container.to_string(),
                    source: Box::new(e),
                };
                tracing::error!(id = %container, error = %err, "failed to unmount filesystem");
                CleanupOutcome::UnmountFailed(err)
            }
        }
    }
}

/// The utility VM attaches storage itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct HypervisorIsolation;

impl FilesystemLifecycle for HypervisorIsolation {
    fn prepare_start(
        &self,
        container: &ContainerId,
        _fs: &mut dyn ContainerFilesystem,
    ) -> Result<StartOutcome> {
        tracing::debug!(id = %container, "hypervisor isolation, skipping mount");
        Ok(StartOutcome::Skipped)
    }

    fn cleanup(
        &self,
        container: &ContainerId,
        _fs: &mut dyn ContainerFilesystem,
    ) -> CleanupOutcome {
        tracing::debug!(id = %container, "hypervisor isolation, skipping unmount");
        CleanupOutcome::Skipped
    }
}

/// Returns the lifecycle for an isolation mode.
#[must_use]
pub fn lifecycle_for(mode: IsolationMode) -> &'static dyn FilesystemLifecycle {
    match mode {
        IsolationMode::Process => &ProcessIsolation,
        IsolationMode::HyperV => &HypervisorIsolation,
    }
}

/// Brackets a container's start and cleanup with the filesystem events
/// its isolation mode requires.
#[derive(Debug, Clone)]
pub struct MountLifecycleController {
    container: ContainerId,
    lifecycle: &'static dyn FilesystemLifecycle,
}

impl MountLifecycleController {
    /// Creates a controller for one container.
    #[must_use]
    pub fn new(container: ContainerId, mode: IsolationMode) -> Self {
        Self {
            container,
            lifecycle: lifecycle_for(mode),
        }
    }

    /// Start-preparation event.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::MountFailed`] if the mount fails. The start
    /// attempt must not proceed.
    pub fn on_start_preparation(&self, fs: &mut dyn ContainerFilesystem) -> Result<StartOutcome> {
        self.lifecycle.prepare_start(&self.container, fs)
    }

    /// Cleanup event. Unmount failures are logged and reported in the
    /// outcome, never raised.
    pub fn on_cleanup(&self, fs: &mut dyn ContainerFilesystem) -> CleanupOutcome {
        self.lifecycle.cleanup(&self.container, fs)
    }
}
