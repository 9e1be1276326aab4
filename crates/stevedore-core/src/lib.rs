//! # stevedore-core
//!
//! Host filesystem primitives for the Stevedore runtime.
//!
//! This crate provides:
//! - **Filesystem**: the [`filesystem::ContainerFilesystem`] seam that the
//!   mount lifecycle drives, and an `OverlayFS` implementation that stacks
//!   resolved image layers under a container's writable folder.
//!
//! Mount syscalls are only issued on Linux. Other builds return
//! [`stevedore_common::error::StevedoreError::Unsupported`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
