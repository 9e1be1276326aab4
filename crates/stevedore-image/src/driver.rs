//! Storage driver contract and a directory-backed implementation.
//!
//! A storage driver owns the on-disk layer representation. Callers lease a
//! layer path with [`StorageDriver::get`] and must hand it back with
//! [`StorageDriver::put`]. The driver keeps a reference count per layer and
//! is responsible for its own synchronization.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use stevedore_common::constants::LAYER_FOLDER_KEY;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerId, ImageId};

/// Image and layer storage driver.
pub trait StorageDriver {
    /// Driver name, used in error reports.
    fn name(&self) -> &str;

    /// Acquires a reference on a layer and returns its on-disk path.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist or cannot be referenced.
    fn get(&self, layer: &ImageId) -> Result<PathBuf>;

    /// Releases a reference previously acquired with [`StorageDriver::get`].
    ///
    /// # Errors
    ///
    /// Returns an error if the layer holds no reference.
    fn put(&self, layer: &ImageId) -> Result<()>;

    /// Returns driver metadata for a container's writable layer.
    ///
    /// The mapping contains a [`LAYER_FOLDER_KEY`] entry with the folder path.
    ///
    /// # Errors
    ///
    /// Returns an error if the container has no writable layer.
    fn metadata(&self, container: &ContainerId) -> Result<HashMap<String, String>>;
}

/// Storage driver that keeps each layer in its own directory.
///
/// Layout under `root`:
/// - `layers/<image-id>/` for read-only layers
/// - `containers/<container-id>/` for writable layer folders
#[derive(Debug)]
pub struct DirectoryDriver {
    name: String,
    root: PathBuf,
    refs: Mutex<HashMap<ImageId, usize>>,
}

impl DirectoryDriver {
    /// Opens the driver at the given root.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or container directories cannot be created.
    pub fn open(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [root.join("layers"), root.join("containers")] {
            std::fs::create_dir_all(&dir).map_err(|e| StevedoreError::Io {
                path: dir.clone(),
                source: e,
            })?;
        }
        let name = name.into();
        tracing::info!(driver = %name, path = %root.display(), "opening storage driver");
        Ok(Self {
            name,
            root,
            refs: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the path to a layer's directory.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::Config`] if the id is not a single path
    /// component.
    pub fn layer_path(&self, layer: &ImageId) -> Result<PathBuf> {
        Ok(self.root.join("layers").join(path_component("image", layer.as_str())?))
    }

    /// Returns the path to a container's writable layer folder.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::Config`] if the id is not a single path
    /// component.
    pub fn container_folder(&self, container: &ContainerId) -> Result<PathBuf> {
        Ok(self
            .root
            .join("containers")
            .join(path_component("container", container.as_str())?))
    }

    /// Creates an empty layer directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_layer(&self, layer: &ImageId) -> Result<PathBuf> {
        let path = self.layer_path(layer)?;
        std::fs::create_dir_all(&path).map_err(|e| StevedoreError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Creates a container's writable layer folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_container_folder(&self, container: &ContainerId) -> Result<PathBuf> {
        let path = self.container_folder(container)?;
        std::fs::create_dir_all(&path).map_err(|e| StevedoreError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Returns the number of outstanding references on a layer.
    #[must_use]
    pub fn references(&self, layer: &ImageId) -> usize {
        self.refs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(layer)
            .copied()
            .unwrap_or(0)
    }
}

impl StorageDriver for DirectoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, layer: &ImageId) -> Result<PathBuf> {
        let path = self.layer_path(layer)?;
        if !path.is_dir() {
            return Err(StevedoreError::NotFound {
                kind: "layer",
                id: layer.to_string(),
            });
        }
        let mut refs = self.refs.lock().unwrap_or_else(PoisonError::into_inner);
        let count = refs.entry(layer.clone()).or_insert(0);
        *count += 1;
        tracing::trace!(layer = %layer, count = *count, "layer referenced");
        Ok(path)
    }

    fn put(&self, layer: &ImageId) -> Result<()> {
        let mut refs = self.refs.lock().unwrap_or_else(PoisonError::into_inner);
        match refs.get_mut(layer) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                let _ = refs.remove(layer);
            }
            None => {
                return Err(StevedoreError::NotFound {
                    kind: "layer reference",
                    id: layer.to_string(),
                });
            }
        }
        tracing::trace!(layer = %layer, "layer released");
        Ok(())
    }

    fn metadata(&self, container: &ContainerId) -> Result<HashMap<String, String>> {
        let folder = self.container_folder(container)?;
        if !folder.is_dir() {
            return Err(StevedoreError::NotFound {
                kind: "container layer",
                id: container.to_string(),
            });
        }
        Ok(HashMap::from([(
            LAYER_FOLDER_KEY.to_string(),
            folder.to_string_lossy().into_owned(),
        )]))
    }
}

/// Checks that an id names exactly one directory under the driver root.
fn path_component<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(StevedoreError::Config {
            message: format!("invalid {kind} id {id:?}: must be a single path component"),
        });
    }
    Ok(id)
}
