//! Parent-linked image graph.
//!
//! Each image node names at most one parent, so an image's filesystem is a
//! simple chain from the leaf image down to a root with no parent. This
//! module only reads the graph. [`CatalogGraph`] is a JSON index used by
//! the CLI and tests; daemons plug their own store in through
//! [`ImageGraph`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stevedore_common::constants::MAX_IMAGE_LAYERS;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::ImageId;

/// A node in the image graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNode {
    /// Identifier of this image (and of the layer it contributes).
    pub id: ImageId,
    /// Parent image, absent at the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ImageId>,
}

impl ImageNode {
    /// Creates a root node with no parent.
    #[must_use]
    pub fn root(id: impl Into<String>) -> Self {
        Self {
            id: ImageId::new(id),
            parent: None,
        }
    }

    /// Creates a node on top of `parent`.
    #[must_use]
    pub fn child(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            id: ImageId::new(id),
            parent: Some(ImageId::new(parent)),
        }
    }
}

/// Read access to an image graph.
pub trait ImageGraph {
    /// Fetches a node by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or the graph cannot be read.
    fn get(&self, id: &ImageId) -> Result<ImageNode>;

    /// Fetches the parent of `node`, `None` for a root.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is recorded but cannot be fetched.
    fn parent(&self, node: &ImageNode) -> Result<Option<ImageNode>> {
        node.parent.as_ref().map(|id| self.get(id)).transpose()
    }
}

/// Walks from `leaf` to the root of its chain.
#[must_use]
pub fn walk<'a, G: ImageGraph + ?Sized>(graph: &'a G, leaf: &ImageId) -> ImageChain<'a, G> {
    ImageChain {
        graph,
        leaf: Some(leaf.clone()),
        current: None,
        depth: 0,
    }
}

/// Iterator over an image chain, leaf first.
///
/// Nodes are fetched lazily: the parent of a node is only looked up once
/// the caller asks for it. Iteration stops after the first error.
#[derive(Debug)]
pub struct ImageChain<'a, G: ?Sized> {
    graph: &'a G,
    leaf: Option<ImageId>,
    current: Option<ImageNode>,
    depth: usize,
}

impl<G: ImageGraph + ?Sized> Iterator for ImageChain<'_, G> {
    type Item = Result<ImageNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, lookup) = if let Some(leaf) = self.leaf.take() {
            let lookup = self.graph.get(&leaf).map(Some);
            (leaf, lookup)
        } else {
            let current = self.current.take()?;
            let id = current.parent.clone()?;
            if self.depth >= MAX_IMAGE_LAYERS {
                return Some(Err(StevedoreError::CorruptImageGraph {
                    image: id.to_string(),
                    reason: format!("chain exceeds {MAX_IMAGE_LAYERS} layers"),
                }));
            }
            let lookup = self.graph.parent(&current);
            (id, lookup)
        };

        let node = match lookup {
            Ok(node) => node?,
            Err(e) => {
                return Some(Err(StevedoreError::ImageLookupFailed {
                    image: id.to_string(),
                    reason: e.to_string(),
                }));
            }
        };

        if node.parent.as_ref() == Some(&node.id) {
            return Some(Err(StevedoreError::CorruptImageGraph {
                image: node.id.to_string(),
                reason: "image is its own parent".into(),
            }));
        }

        self.depth += 1;
        self.current = Some(node.clone());
        Some(Ok(node))
    }
}

/// In-memory image graph.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<ImageId, ImageNode>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a node.
    pub fn insert(&mut self, node: ImageNode) {
        let _ = self.nodes.insert(node.id.clone(), node);
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<ImageNode> for MemoryGraph {
    fn from_iter<T: IntoIterator<Item = ImageNode>>(iter: T) -> Self {
        let mut graph = Self::new();
        for node in iter {
            graph.insert(node);
        }
        graph
    }
}

impl ImageGraph for MemoryGraph {
    fn get(&self, id: &ImageId) -> Result<ImageNode> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| StevedoreError::NotFound {
                kind: "image",
                id: id.to_string(),
            })
    }
}

/// Image graph backed by a JSON file under the data directory.
#[derive(Debug)]
pub struct CatalogGraph {
    catalog_path: PathBuf,
}

impl CatalogGraph {
    /// Opens or creates the catalog under `data_dir/images/graph.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog directory cannot be created.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let catalog_path = data_dir.join("images").join("graph.json");
        if let Some(parent) = catalog_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StevedoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Ok(Self { catalog_path })
    }

    /// Lists every node in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog file cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<ImageNode>> {
        if !self.catalog_path.exists() {
            return Ok(Vec::new());
        }
        let content =
            std::fs::read_to_string(&self.catalog_path).map_err(|e| StevedoreError::Io {
                path: self.catalog_path.clone(),
                source: e,
            })?;
        let nodes: Vec<ImageNode> = serde_json::from_str(&content)?;
        Ok(nodes)
    }

    /// Registers a new node.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same id already exists or the
    /// catalog cannot be read or written.
    pub fn register(&self, node: ImageNode) -> Result<()> {
        let mut nodes = self.list()?;
        if nodes.iter().any(|n| n.id == node.id) {
            return Err(StevedoreError::Config {
                message: format!("image {} is already registered", node.id),
            });
        }
        tracing::debug!(image = %node.id, parent = ?node.parent, "registering image");
        nodes.push(node);
        let json = serde_json::to_string_pretty(&nodes)?;
        std::fs::write(&self.catalog_path, json).map_err(|e| StevedoreError::Io {
            path: self.catalog_path.clone(),
            source: e,
        })
    }
}

impl ImageGraph for CatalogGraph {
    fn get(&self, id: &ImageId) -> Result<ImageNode> {
        self.list()?
            .into_iter()
            .find(|n| n.id == *id)
            .ok_or_else(|| StevedoreError::NotFound {
                kind: "image",
                id: id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(graph: &MemoryGraph, leaf: &str) -> Vec<String> {
        walk(graph, &ImageId::new(leaf))
            .map(|n| n.map(|n| n.id.to_string()))
            .collect::<Result<Vec<_>>>()
            .expect("walk")
    }

    #[test]
    fn walk_yields_leaf_to_root() {
        let graph: MemoryGraph = [
            ImageNode::root("base"),
            ImageNode::child("mid", "base"),
            ImageNode::child("leaf", "mid"),
        ]
        .into_iter()
        .collect();
        assert_eq!(ids(&graph, "leaf"), ["leaf", "mid", "base"]);
        assert_eq!(ids(&graph, "base"), ["base"]);
    }

    #[test]
    fn walk_follows_parent_links_through_the_graph() {
        struct CountingGraph {
            inner: MemoryGraph,
            parents: std::cell::Cell<usize>,
        }

        impl ImageGraph for CountingGraph {
            fn get(&self, id: &ImageId) -> Result<ImageNode> {
                self.inner.get(id)
            }

            fn parent(&self, node: &ImageNode) -> Result<Option<ImageNode>> {
                self.parents.set(self.parents.get() + 1);
                self.inner.parent(node)
            }
        }

        let graph = CountingGraph {
            inner: [
                ImageNode::root("base"),
                ImageNode::child("mid", "base"),
                ImageNode::child("leaf", "mid"),
            ]
            .into_iter()
            .collect(),
            parents: std::cell::Cell::new(0),
        };
        let chain: Vec<_> = walk(&graph, &ImageId::new("leaf"))
            .map(|node| node.unwrap().id)
            .collect();
        assert_eq!(chain.len(), 3);
        assert_eq!(graph.parents.get(), 2);
    }

    #[test]
    fn walk_rejects_self_parent() {
        let graph: MemoryGraph = [ImageNode::child("loop", "loop")].into_iter().collect();
        let results: Vec<_> = walk(&graph, &ImageId::new("loop")).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(StevedoreError::CorruptImageGraph { .. })
        ));
    }

    #[test]
    fn walk_stops_longer_cycles_at_layer_limit() {
        let graph: MemoryGraph = [ImageNode::child("a", "b"), ImageNode::child("b", "a")]
            .into_iter()
            .collect();
        let results: Vec<_> = walk(&graph, &ImageId::new("a")).collect();
        assert_eq!(results.len(), MAX_IMAGE_LAYERS + 1);
        assert!(matches!(
            results.last(),
            Some(Err(StevedoreError::CorruptImageGraph { .. }))
        ));
    }

    #[test]
    fn walk_reports_missing_parent() {
        let graph: MemoryGraph = [ImageNode::child("leaf", "gone")].into_iter().collect();
        let results: Vec<_> = walk(&graph, &ImageId::new("leaf")).collect();
        assert!(results[0].is_ok());
        match &results[1] {
            Err(StevedoreError::ImageLookupFailed { image, .. }) => assert_eq!(image, "gone"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn parent_of_root_is_none() {
        let graph: MemoryGraph = [ImageNode::root("base"), ImageNode::child("app", "base")]
            .into_iter()
            .collect();
        let app = graph.get(&ImageId::new("app")).unwrap();
        let base = graph.parent(&app).unwrap().expect("parent");
        assert_eq!(base.id, ImageId::new("base"));
        assert!(graph.parent(&base).unwrap().is_none());
    }

    #[test]
    fn catalog_register_and_get() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = CatalogGraph::open(dir.path()).expect("open");
        catalog.register(ImageNode::root("base")).expect("register base");
        catalog
            .register(ImageNode::child("app", "base"))
            .expect("register app");

        let node = catalog.get(&ImageId::new("app")).expect("get");
        assert_eq!(node.parent, Some(ImageId::new("base")));
        assert_eq!(catalog.list().expect("list").len(), 2);
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = CatalogGraph::open(dir.path()).expect("open");
        catalog.register(ImageNode::root("base")).expect("register");
        assert!(catalog.register(ImageNode::root("base")).is_err());
    }

    #[test]
    fn catalog_missing_image_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = CatalogGraph::open(dir.path()).expect("open");
        assert!(matches!(
            catalog.get(&ImageId::new("nope")),
            Err(StevedoreError::NotFound { kind: "image", .. })
        ));
    }
}
