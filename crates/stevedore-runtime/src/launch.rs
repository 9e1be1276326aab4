//! Launch specification assembly.
//!
//! Combines network, resource, process, and layer resolution into the one
//! immutable [`LaunchSpec`] the execution driver consumes. Assembly runs
//! once per start attempt, stops at the first error, and never returns a
//! partially filled spec. Retrying is the caller's decision.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use stevedore_common::config::DaemonConfig;
use stevedore_common::error::Result;
use stevedore_common::types::ContainerId;
use stevedore_image::driver::StorageDriver;
use stevedore_image::graph::ImageGraph;
use stevedore_image::layer::LayerResolver;

use crate::container::Container;
use crate::network::{self, Network};
use crate::process::{self, ProcessSpec};
use crate::resources::{self, Resources};

/// Fully resolved execution request for one container start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LaunchSpec {
    /// Container identifier.
    pub id: ContainerId,
    /// Root filesystem path.
    pub rootfs: PathBuf,
    /// Working directory inside the container.
    pub working_dir: String,
    /// Network descriptor, `None` for network mode `none`.
    pub network: Option<Network>,
    /// Resource limits.
    pub resources: Resources,
    /// Process to launch.
    pub process: ProcessSpec,
    /// Security label for mounts.
    pub mount_label: String,
    /// Security label for the process.
    pub process_label: String,
    /// Writable layer folder.
    pub layer_folder: PathBuf,
    /// Read-only layer paths, leaf first.
    pub layer_paths: Vec<PathBuf>,
    /// Container hostname.
    pub hostname: String,
    /// Whether this is the container's first start.
    pub first_start: bool,
    /// Whether the container runs under hypervisor isolation.
    pub isolated: bool,
}

/// Builds launch specs against an image graph and storage driver.
#[derive(Debug)]
pub struct LaunchSpecAssembler<'a, G: ?Sized, D: ?Sized> {
    layers: LayerResolver<'a, G, D>,
    config: &'a DaemonConfig,
}

impl<'a, G, D> LaunchSpecAssembler<'a, G, D>
where
    G: ImageGraph + ?Sized,
    D: StorageDriver + ?Sized,
{
    /// Creates an assembler.
    #[must_use]
    pub const fn new(graph: &'a G, driver: &'a D, config: &'a DaemonConfig) -> Self {
        Self {
            layers: LayerResolver::new(graph, driver),
            config,
        }
    }

    /// Assembles the launch spec for `container`.
    ///
    /// # Errors
    ///
    /// Returns the first failure among network dispatch, layer resolution,
    /// and writable-layer metadata lookup.
    pub fn assemble(&self, container: &Container) -> Result<LaunchSpec> {
        let config = &container.config;
        let host = &container.host_config;

        let network =
            network::network_for(config, host, &self.config.bridge.virtual_switch_name)?;
        let resources = resources::resources_for(host);
        let process =
            process::process_spec_for(config, host, process::daemon_environment(config));

        let layer_paths = self.layers.layer_paths(config.image.as_ref())?;
        let layer_folder = self.layers.layer_folder(&container.id)?;

        let spec = LaunchSpec {
            id: container.id.clone(),
            rootfs: container.rootfs.clone(),
            working_dir: config.working_dir.clone(),
            network,
            resources,
            process,
            mount_label: container.mount_label.clone(),
            process_label: container.process_label.clone(),
            layer_folder,
            layer_paths,
            hostname: config.hostname.clone(),
            first_start: !container.has_been_started_before(),
            isolated: host.isolation.is_hyperv(),
        };

        tracing::info!(
            id = %spec.id,
            layers = spec.layer_paths.len(),
            isolated = spec.isolated,
            first_start = spec.first_start,
            "launch spec assembled"
        );
        Ok(spec)
    }
}
