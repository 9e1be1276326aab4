//! Runtime engine that drives one container's start and cleanup.

use stevedore_common::config::DaemonConfig;
use stevedore_common::error::Result;
use stevedore_core::filesystem::ContainerFilesystem;
use stevedore_core::filesystem::overlayfs::{OverlayConfig, OverlayFilesystem};
use stevedore_image::driver::StorageDriver;
use stevedore_image::graph::ImageGraph;
use stevedore_image::layer::LayerResolver;

use crate::backend::ExecDriver;
use crate::container::Container;
use crate::launch::{LaunchSpec, LaunchSpecAssembler};
use crate::lifecycle::{CleanupOutcome, MountLifecycleController, StartOutcome};

/// Coordinates the filesystem lifecycle, launch spec assembly, and the
/// execution driver.
///
/// Each call is a single attempt. The engine never retries.
pub struct Engine<G, D> {
    graph: G,
    driver: D,
    exec: Box<dyn ExecDriver>,
    config: DaemonConfig,
}

impl<G: ImageGraph, D: StorageDriver> Engine<G, D> {
    /// Creates an engine.
    #[must_use]
    pub fn new(graph: G, driver: D, exec: Box<dyn ExecDriver>, config: DaemonConfig) -> Self {
        Self {
            graph,
            driver,
            exec,
            config,
        }
    }

    /// Assembles the launch spec for a container without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if network dispatch or layer resolution fails.
    pub fn assemble(&self, container: &Container) -> Result<LaunchSpec> {
        LaunchSpecAssembler::new(&self.graph, &self.driver, &self.config).assemble(container)
    }

    /// Builds the overlay filesystem for a process-isolated container.
    ///
    /// # Errors
    ///
    /// Returns an error if the layers or the writable folder cannot be resolved.
    pub fn overlay_filesystem(&self, container: &Container) -> Result<OverlayFilesystem> {
        let layers = LayerResolver::new(&self.graph, &self.driver);
        let layer_paths = layers.layer_paths(container.config.image.as_ref())?;
        let layer_folder = layers.layer_folder(&container.id)?;
        Ok(OverlayFilesystem::new(OverlayConfig::for_layers(
            &layer_paths,
            &layer_folder,
            &container.rootfs,
        )))
    }

    /// Starts a container.
    ///
    /// Prepares the filesystem, assembles the launch spec, and hands it to
    /// the execution driver. If anything after a successful mount fails, the
    /// filesystem is unmounted again before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is not startable, the mount fails,
    /// assembly fails, or the execution driver fails.
    pub fn start(&self, container: &mut Container, fs: &mut dyn ContainerFilesystem) -> Result<u32> {
        container.begin_start()?;
        tracing::info!(id = %container.id, driver = self.exec.name(), "starting container");

        let lifecycle =
            MountLifecycleController::new(container.id.clone(), container.host_config.isolation);
        let prepared = match lifecycle.on_start_preparation(fs) {
            Ok(outcome) => outcome,
            Err(e) => {
                container.mark_failed();
                return Err(e);
            }
        };

        match self.assemble(container).and_then(|spec| self.exec.run(&spec)) {
            Ok(pid) => {
                container.mark_running(pid);
                Ok(pid)
            }
            Err(e) => {
                tracing::warn!(id = %container.id, error = %e, "start attempt failed");
                if prepared == StartOutcome::Mounted {
                    let _ = lifecycle.on_cleanup(fs);
                }
                container.mark_failed();
                Err(e)
            }
        }
    }

    /// Cleans up a running container.
    ///
    /// Unmount failures do not abort cleanup; they are returned in the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only if the container is not running.
    pub fn cleanup(
        &self,
        container: &mut Container,
        fs: &mut dyn ContainerFilesystem,
    ) -> Result<CleanupOutcome> {
        container.begin_cleanup()?;
        let outcome = MountLifecycleController::new(
            container.id.clone(),
            container.host_config.isolation,
        )
        .on_cleanup(fs);
        tracing::info!(id = %container.id, "container cleaned up");
        Ok(outcome)
    }

    /// Returns the storage driver.
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }
}
