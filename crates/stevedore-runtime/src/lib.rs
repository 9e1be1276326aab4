//! Launch specification assembly and container lifecycle for the
//! Stevedore runtime.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod config;
pub mod container;
pub mod engine;
pub mod launch;
pub mod lifecycle;
pub mod network;
pub mod process;
pub mod resources;
