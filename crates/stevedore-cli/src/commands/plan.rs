//! `stvd plan` — Print the launch spec a container would start with.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Args;
use serde::Deserialize;
use stevedore_common::types::ContainerId;
use stevedore_runtime::config::{ContainerConfig, HostConfig};
use stevedore_runtime::container::Container;
use stevedore_runtime::launch::LaunchSpecAssembler;

use super::Context;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the container description (JSON).
    pub file: PathBuf,
}

/// Container description read by `create` and `plan`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContainerDocument {
    /// Container ID, generated by `create` when absent.
    pub id: Option<ContainerId>,
    /// Human-readable name.
    pub name: String,
    /// Process-level configuration.
    pub config: ContainerConfig,
    /// Host runtime policy.
    pub host_config: HostConfig,
    /// Root filesystem path, defaults to `<writable folder>/rootfs`.
    pub rootfs: Option<PathBuf>,
}

impl ContainerDocument {
    /// Reads a document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Turns the document into a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no `id` or the id is not a
    /// valid storage name.
    pub fn into_container(self, ctx: &Context) -> anyhow::Result<Container> {
        let Some(id) = self.id else {
            anyhow::bail!(
                "container description has no id; add the id printed by `stvd create` as \"id\""
            );
        };
        let rootfs = match self.rootfs {
            Some(rootfs) => rootfs,
            None => ctx.driver.container_folder(&id)?.join("rootfs"),
        };
        Ok(Container::new(id, self.name, self.config, self.host_config, rootfs))
    }
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if the document is invalid or assembly fails.
pub fn execute(ctx: &Context, args: &PlanArgs) -> anyhow::Result<()> {
    let container = ContainerDocument::load(&args.file)?.into_container(ctx)?;
    let spec = LaunchSpecAssembler::new(&ctx.graph, &ctx.driver, &ctx.config)
        .assemble(&container)?;
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
