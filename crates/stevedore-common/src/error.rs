//! Unified error types for the Stevedore workspace.
//!
//! Every assembly-phase failure aborts the start attempt with no partial
//! launch spec. Variants carry enough context (mode string, layer id, driver
//! name) to diagnose a failed start without inspecting internals.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Storage-driver call that failed while resolving a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerAction {
    /// Acquiring the layer path (`get`).
    Get,
    /// Releasing the layer reference (`put`).
    Put,
}

impl fmt::Display for LayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StevedoreError {
    /// The network mode string is not recognized on this platform.
    #[error("invalid network mode: {mode:?}")]
    InvalidNetworkMode {
        /// The offending mode string, verbatim.
        mode: String,
    },

    /// The storage driver could not resolve or release a layer.
    #[error("{driver}: failed to {action} layer {layer}: {source}")]
    LayerResolutionFailed {
        /// Name of the storage driver.
        driver: String,
        /// Layer that failed.
        layer: String,
        /// Driver call that failed.
        action: LayerAction,
        /// Underlying driver error.
        source: Box<StevedoreError>,
    },

    /// The container's writable-layer metadata is unavailable.
    #[error("failed to get layer metadata for container {container}: {reason}")]
    MetadataResolutionFailed {
        /// Container whose metadata was requested.
        container: String,
        /// Description of the failure.
        reason: String,
    },

    /// The image graph could not produce a node.
    #[error("failed to look up image {image} in graph: {reason}")]
    ImageLookupFailed {
        /// Image that could not be found.
        image: String,
        /// Description of the failure.
        reason: String,
    },

    /// The image graph is inconsistent.
    #[error("corrupt image graph at {image}: {reason}")]
    CorruptImageGraph {
        /// Image where the corruption was detected.
        image: String,
        /// Description of the corruption.
        reason: String,
    },

    /// Mounting the container filesystem failed.
    #[error("failed to mount filesystem for container {container}: {source}")]
    MountFailed {
        /// Container whose filesystem was being mounted.
        container: String,
        /// Underlying mount error.
        source: Box<StevedoreError>,
    },

    /// Unmounting the container filesystem failed.
    #[error("failed to unmount filesystem for container {container}: {source}")]
    UnmountFailed {
        /// Container whose filesystem was being unmounted.
        container: String,
        /// Underlying unmount error.
        source: Box<StevedoreError>,
    },

    /// The operation is not supported on this platform or build.
    #[error("{operation} is not supported on this platform")]
    Unsupported {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A container is in the wrong lifecycle state for an operation.
    #[error("container {id} is {state}, cannot {operation}")]
    InvalidState {
        /// Container identifier.
        id: String,
        /// Current lifecycle state.
        state: String,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StevedoreError>;
