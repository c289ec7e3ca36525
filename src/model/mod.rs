//! In-memory representation of hydrofabric layers.

pub mod dataset;
pub mod layer;
pub mod value;

pub use dataset::{LayerSet, LayerSink, LayerSource};
pub use layer::{Column, Feature, GeometryColumn, Layer, LayerInfo, LayerKind};
pub use value::{FeatureId, Value};
