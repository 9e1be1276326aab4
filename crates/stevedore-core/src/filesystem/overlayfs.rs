//! `OverlayFS` management for layered container filesystems.
//!
//! Stacks the read-only image layers under the container's writable layer
//! folder and exposes the merged view at the container's rootfs path.

use std::path::{Path, PathBuf};

use stevedore_common::error::{Result, StevedoreError};

use super::ContainerFilesystem;

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layers, uppermost first.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Builds an overlay config from a leaf-to-root layer list and the
    /// container's writable layer folder.
    ///
    /// The upper and work directories live inside `layer_folder`.
    #[must_use]
    pub fn for_layers(layer_paths: &[PathBuf], layer_folder: &Path, rootfs: &Path) -> Self {
        Self {
            lower_dirs: layer_paths.to_vec(),
            upper_dir: layer_folder.join("upper"),
            work_dir: layer_folder.join("work"),
            merged_dir: rootfs.to_path_buf(),
        }
    }

    /// Renders the `mount(2)` data string.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no lower layers.
    pub fn mount_options(&self) -> Result<String> {
        if self.lower_dirs.is_empty() {
            return Err(StevedoreError::Config {
                message: "overlay mount needs at least one lower layer".into(),
            });
        }
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        Ok(format!(
            "lowerdir={},upperdir={},workdir={}",
            lowers,
            self.upper_dir.display(),
            self.work_dir.display()
        ))
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// Creates the upper, work, and merged directories if they do not exist,
/// then issues the `mount(2)` syscall with overlay-specific options.
///
/// # Errors
///
/// Returns an error if directory creation fails or if the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_overlay(config: &OverlayConfig) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let opts = config.mount_options()?;
    for dir in [&config.upper_dir, &config.work_dir, &config.merged_dir] {
        std::fs::create_dir_all(dir).map_err(|e| StevedoreError::Io {
            path: dir.clone(),
            source: e,
        })?;
    }

    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| StevedoreError::Io {
        path: config.merged_dir.clone(),
        source: e.into(),
    })?;

    tracing::info!(
        merged = %config.merged_dir.display(),
        layers = config.lower_dirs.len(),
        "overlayfs mounted"
    );
    Ok(())
}

/// Overlay mounting requires Linux.
///
/// # Errors
///
/// Always returns [`StevedoreError::Unsupported`].
#[cfg(not(target_os = "linux"))]
pub fn mount_overlay(_config: &OverlayConfig) -> Result<()> {
    Err(StevedoreError::Unsupported {
        operation: "overlay mount",
    })
}

/// Unmounts an `OverlayFS` at the given path.
///
/// Uses `MNT_DETACH` to lazily detach the filesystem.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount_overlay(merged_dir: &Path) -> Result<()> {
    nix::mount::umount2(merged_dir, nix::mount::MntFlags::MNT_DETACH).map_err(|e| {
        StevedoreError::Io {
            path: merged_dir.to_path_buf(),
            source: e.into(),
        }
    })?;
    tracing::info!(path = %merged_dir.display(), "overlayfs unmounted");
    Ok(())
}

/// Overlay unmounting requires Linux.
///
/// # Errors
///
/// Always returns [`StevedoreError::Unsupported`].
#[cfg(not(target_os = "linux"))]
pub fn unmount_overlay(_merged_dir: &Path) -> Result<()> {
    Err(StevedoreError::Unsupported {
        operation: "overlay unmount",
    })
}

/// A container rootfs assembled as an `OverlayFS` over its image layers.
#[derive(Debug, Clone)]
pub struct OverlayFilesystem {
    config: OverlayConfig,
}

impl OverlayFilesystem {
    /// Creates an overlay filesystem from a prepared config.
    #[must_use]
    pub const fn new(config: OverlayConfig) -> Self {
        Self { config }
    }

    /// Returns the overlay configuration.
    #[must_use]
    pub const fn config(&self) -> &OverlayConfig {
        &self.config
    }
}

impl ContainerFilesystem for OverlayFilesystem {
    fn mount(&mut self) -> Result<()> {
        mount_overlay(&self.config)
    }

    fn unmount(&mut self) -> Result<()> {
        unmount_overlay(&self.config.merged_dir)
    }
}
