//! Filesystem management for container isolation.
//!
//! The runtime never mounts directly. It asks a [`ContainerFilesystem`]
//! to attach or detach itself, which keeps host syscalls in this crate and
//! lets lifecycle tests substitute a recording fake.

pub mod overlayfs;

use stevedore_common::error::Result;

/// A container root filesystem that can be attached to and detached from
/// the host.
pub trait ContainerFilesystem {
    /// Attaches the filesystem to the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    fn mount(&mut self) -> Result<()>;

    /// Detaches the filesystem from the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount fails.
    fn unmount(&mut self) -> Result<()>;
}
