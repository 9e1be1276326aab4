//! `stvd layers` — Print the resolved layer chain of an image.

use clap::Args;
use stevedore_common::types::ImageId;
use stevedore_image::layer::LayerResolver;

use super::Context;
use crate::output::layer_row;

/// Arguments for the `layers` command.
#[derive(Args, Debug)]
pub struct LayersArgs {
    /// Leaf image ID.
    pub image: String,
}

/// Executes the `layers` command.
///
/// # Errors
///
/// Returns an error if the chain cannot be walked or a layer cannot be
/// resolved.
pub fn execute(ctx: &Context, args: &LayersArgs) -> anyhow::Result<()> {
    let image = ImageId::new(args.image.as_str());
    let paths = LayerResolver::new(&ctx.graph, &ctx.driver).layer_paths(Some(&image))?;
    for (depth, path) in paths.iter().enumerate() {
        println!("{}", layer_row(depth, path));
    }
    Ok(())
}
