//! Layer resolution.
//!
//! Turns an image chain into the ordered list of on-disk layer paths a
//! container's union filesystem is built from. Paths are produced leaf
//! first, one storage-driver round-trip per image, strictly in sequence:
//! drivers are not required to handle concurrent references to the same
//! layer.

use std::path::{Path, PathBuf};

use stevedore_common::constants::LAYER_FOLDER_KEY;
use stevedore_common::error::{LayerAction, Result, StevedoreError};
use stevedore_common::types::{ContainerId, ImageId};

use crate::driver::StorageDriver;
use crate::graph::{self, ImageGraph};

/// A reference on a layer held against a storage driver.
///
/// Release it with [`LayerLease::release`] to observe release errors. A
/// lease dropped without an explicit release (early return, unwinding)
/// releases itself and logs any failure.
#[derive(Debug)]
pub struct LayerLease<'a, D: StorageDriver + ?Sized> {
    driver: &'a D,
    layer: ImageId,
    path: PathBuf,
    released: bool,
}

impl<'a, D: StorageDriver + ?Sized> LayerLease<'a, D> {
    /// Acquires a reference on `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::LayerResolutionFailed`] if the driver
    /// cannot resolve the layer.
    pub fn acquire(driver: &'a D, layer: &ImageId) -> Result<Self> {
        let path = driver
            .get(layer)
            .map_err(|e| resolution_error(driver, layer, LayerAction::Get, e))?;
        Ok(Self {
            driver,
            layer: layer.clone(),
            path,
            released: false,
        })
    }

    /// Path of the leased layer.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the reference and returns the layer path.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::LayerResolutionFailed`] if the driver
    /// rejects the release.
    pub fn release(mut self) -> Result<PathBuf> {
        self.released = true;
        let path = std::mem::take(&mut self.path);
        self.driver
            .put(&self.layer)
            .map_err(|e| resolution_error(self.driver, &self.layer, LayerAction::Put, e))?;
        Ok(path)
    }
}

impl<D: StorageDriver + ?Sized> Drop for LayerLease<'_, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.driver.put(&self.layer) {
            tracing::warn!(
                driver = self.driver.name(),
                layer = %self.layer,
                error = %e,
                "failed to release dropped layer lease"
            );
        }
    }
}

fn resolution_error<D: StorageDriver + ?Sized>(
    driver: &D,
    layer: &ImageId,
    action: LayerAction,
    source: StevedoreError,
) -> StevedoreError {
    StevedoreError::LayerResolutionFailed {
        driver: driver.name().to_string(),
        layer: layer.to_string(),
        action,
        source: Box::new(source),
    }
}

/// Resolves image chains to layer paths through a storage driver.
#[derive(Debug)]
pub struct LayerResolver<'a, G: ?Sized, D: ?Sized> {
    graph: &'a G,
    driver: &'a D,
}

impl<'a, G, D> LayerResolver<'a, G, D>
where
    G: ImageGraph + ?Sized,
    D: StorageDriver + ?Sized,
{
    /// Creates a resolver over the given graph and driver.
    #[must_use]
    pub const fn new(graph: &'a G, driver: &'a D) -> Self {
        Self { graph, driver }
    }

    /// Resolves the layer paths of `image`, leaf first.
    ///
    /// A container without an image has no layers and yields an empty list.
    /// Each layer is acquired and released before its parent is looked up;
    /// the first failure aborts the walk.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph lookup fails, the chain is corrupt, or
    /// the driver fails to get or put a layer.
    pub fn layer_paths(&self, image: Option<&ImageId>) -> Result<Vec<PathBuf>> {
        let Some(leaf) = image else {
            return Ok(Vec::new());
        };

        let mut paths = Vec::new();
        for node in graph::walk(self.graph, leaf) {
            let node = node?;
            let lease = LayerLease::acquire(self.driver, &node.id)?;
            paths.push(lease.path().to_path_buf());
            let _ = lease.release()?;
        }

        tracing::debug!(
            image = %leaf,
            driver = self.driver.name(),
            layers = paths.len(),
            "resolved layer chain"
        );
        Ok(paths)
    }

    /// Resolves the writable layer folder of a container.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::MetadataResolutionFailed`] if the driver
    /// has no metadata for the container or the metadata lacks a folder.
    pub fn layer_folder(&self, container: &ContainerId) -> Result<PathBuf> {
        let metadata = self.driver.metadata(container).map_err(|e| {
            StevedoreError::MetadataResolutionFailed {
                container: container.to_string(),
                reason: e.to_string(),
            }
        })?;
        match metadata.get(LAYER_FOLDER_KEY) {
            Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
            _ => Err(StevedoreError::MetadataResolutionFailed {
                container: container.to_string(),
                reason: format!("driver {} reported no {LAYER_FOLDER_KEY:?} entry", self.driver.name()),
            }),
        }
    }
}
