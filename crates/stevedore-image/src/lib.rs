//! # stevedore-image
//!
//! Image graph and layer management for the Stevedore runtime.
//!
//! Handles:
//! - **Graph**: parent-linked image nodes and the leaf-to-root walk.
//! - **Driver**: the storage driver contract and a directory-backed driver
//!   with per-layer reference counts.
//! - **Layers**: scoped layer leases and resolution of an image chain into
//!   ordered on-disk layer paths.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod driver;
pub mod graph;
pub mod layer;
