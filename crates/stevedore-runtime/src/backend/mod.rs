//! Execution driver abstraction.
//!
//! The execution driver owns process creation. Stevedore hands it a fully
//! assembled [`LaunchSpec`] and records the PID it reports.

use stevedore_common::error::Result;

use crate::launch::LaunchSpec;

/// Process launcher that consumes launch specs.
///
/// Implementors create and start the OS entity (process or utility VM)
/// described by the spec.
pub trait ExecDriver: Send + Sync {
    /// Driver name, used in logs.
    fn name(&self) -> &str;

    /// Launches the container, returning its init PID.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn run(&self, spec: &LaunchSpec) -> Result<u32>;
}

/// Driver that logs the spec and reports PID `0` without starting anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunDriver;

impl ExecDriver for DryRunDriver {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn run(&self, spec: &LaunchSpec) -> Result<u32> {
        tracing::info!(
            id = %spec.id,
            entrypoint = %spec.process.entrypoint,
            layers = spec.layer_paths.len(),
            "dry run, not launching"
        );
        Ok(0)
    }
}
