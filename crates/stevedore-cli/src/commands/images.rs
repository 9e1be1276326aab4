//! `stvd images` — List or register images in the local graph.

use clap::Args;
use stevedore_common::types::ImageId;
use stevedore_image::graph::ImageNode;

use super::Context;
use crate::output::format_parent;

/// Arguments for the `images` command.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Register a new image with this ID and create its layer directory.
    #[arg(long)]
    pub add: Option<String>,

    /// Parent of the image being registered.
    #[arg(long, requires = "add")]
    pub parent: Option<String>,
}

/// Executes the `images` command.
///
/// # Errors
///
/// Returns an error if catalog or storage operations fail.
pub fn execute(ctx: &Context, args: ImagesArgs) -> anyhow::Result<()> {
    if let Some(id) = args.add {
        let node = ImageNode {
            id: ImageId::new(id),
            parent: args.parent.map(ImageId::new),
        };
        let path = ctx.driver.create_layer(&node.id)?;
        tracing::info!(image = %node.id, layer = %path.display(), "image registered");
        ctx.graph.register(node)?;
        return Ok(());
    }

    println!("IMAGE ID\tPARENT");
    for node in ctx.graph.list()? {
        println!("{}\t{}", node.id, format_parent(node.parent.as_ref()));
    }
    Ok(())
}
