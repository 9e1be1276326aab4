//! Formatted output helpers for CLI commands.

use std::path::Path;

use stevedore_common::types::ImageId;

/// Formats an image's parent column, `<none>` at the root.
#[must_use]
pub fn format_parent(parent: Option<&ImageId>) -> String {
    parent.map_or_else(|| "<none>".to_string(), ToString::to_string)
}

/// Formats one row of a layer listing. Depth 0 is the leaf.
#[must_use]
pub fn layer_row(depth: usize, path: &Path) -> String {
    format!("{depth:>3}  {}", path.display())
}
