//! CLI command definitions and dispatch.

pub mod create;
pub mod images;
pub mod layers;
pub mod plan;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stevedore_common::config::DaemonConfig;
use stevedore_image::driver::DirectoryDriver;
use stevedore_image::graph::CatalogGraph;

/// Stevedore — container launch spec assembly.
#[derive(Parser, Debug)]
#[command(name = "stvd", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to a JSON daemon configuration file.
    #[arg(long, global = true, env = "STEVEDORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the data directory from the configuration.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List or register images in the local graph.
    Images(images::ImagesArgs),
    /// Print the resolved layer paths of an image, leaf first.
    Layers(layers::LayersArgs),
    /// Create a container's writable layer folder.
    Create(create::CreateArgs),
    /// Print the launch spec for a container description.
    Plan(plan::PlanArgs),
}

/// Daemon state shared by every command.
pub struct Context {
    /// Effective daemon configuration.
    pub config: DaemonConfig,
    /// Local image graph.
    pub graph: CatalogGraph,
    /// Layer storage driver.
    pub driver: DirectoryDriver,
}

impl Context {
    /// Loads configuration and opens the image graph and storage driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the data
    /// directory cannot be opened.
    pub fn open(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => DaemonConfig::load(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(dir) = &cli.data_dir {
            config.data_dir.clone_from(dir);
        }
        tracing::debug!(data_dir = %config.data_dir.display(), "using data directory");

        let graph = CatalogGraph::open(&config.data_dir)?;
        let driver =
            DirectoryDriver::open(config.storage_driver.clone(), config.data_dir.join("storage"))?;
        Ok(Self {
            config,
            graph,
            driver,
        })
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::open(&cli)?;
    match cli.command {
        Command::Images(args) => images::execute(&ctx, args),
        Command::Layers(args) => layers::execute(&ctx, &args),
        Command::Create(args) => create::execute(&ctx, &args),
        Command::Plan(args) => plan::execute(&ctx, &args),
    }
}
