//! `stvd create` — Create a container's writable layer folder.

use std::path::PathBuf;

use clap::Args;
use stevedore_common::types::ContainerId;

use super::Context;
use super::plan::ContainerDocument;

/// Arguments for the `create` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path to the container description (JSON).
    pub file: PathBuf,
}

/// Executes the `create` command.
///
/// Uses the document's `id` when present, otherwise generates one. Prints
/// the container ID.
///
/// # Errors
///
/// Returns an error if the document cannot be read or the folder cannot be
/// created.
pub fn execute(ctx: &Context, args: &CreateArgs) -> anyhow::Result<()> {
    let doc = ContainerDocument::load(&args.file)?;
    let id = doc.id.unwrap_or_else(ContainerId::generate);
    let folder = ctx.driver.create_container_folder(&id)?;
    tracing::info!(id = %id, folder = %folder.display(), "container folder created");
    println!("{id}");
    Ok(())
}
