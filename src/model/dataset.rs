//! Multi-layer datasets and the read/write seams the masker works against.

use std::collections::BTreeMap;

use crate::error::{HfError, Result};
use crate::model::layer::{Layer, LayerInfo};

/// A readable multi-layer dataset.
pub trait LayerSource {
    /// Schema of every layer, without reading rows.
    fn layers(&self) -> Result<Vec<LayerInfo>>;

    /// Read one layer in full.
    fn read_layer(&self, name: &str) -> Result<Layer>;
}

/// A destination for processed layers.
pub trait LayerSink {
    /// Store `layer` under its own name, replacing any previous layer of that name.
    fn write_layer(&mut self, layer: Layer) -> Result<()>;

    /// Whether writes reach durable storage.
    ///
    /// Persistent sinks receive layers strictly one at a time, in processing order.
    fn is_persistent(&self) -> bool {
        true
    }
}

/// In-memory layer collection keyed by layer name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSet {
    layers: BTreeMap<String, Layer>,
}

impl LayerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: Layer) -> Option<Layer> {
        self.layers.insert(layer.name().to_string(), layer)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Layer> {
        self.layers.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl FromIterator<Layer> for LayerSet {
    fn from_iter<I: IntoIterator<Item = Layer>>(iter: I) -> Self {
        let mut set = Self::new();
        for layer in iter {
            set.insert(layer);
        }
        set
    }
}

impl IntoIterator for LayerSet {
    type Item = Layer;
    type IntoIter = std::collections::btree_map::IntoValues<String, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.into_values()
    }
}

impl LayerSource for LayerSet {
    fn layers(&self) -> Result<Vec<LayerInfo>> {
        Ok(self.layers.values().map(|l| l.info().clone()).collect())
    }

    fn read_layer(&self, name: &str) -> Result<Layer> {
        self.layers
            .get(name)
            .cloned()
            .ok_or_else(|| HfError::LayerNotFound(name.to_string()))
    }
}

impl LayerSink for LayerSet {
    fn write_layer(&mut self, layer: Layer) -> Result<()> {
        self.insert(layer);
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}
