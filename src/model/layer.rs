//! Layers: named tables of features, with or without geometry.

use geo::{BoundingRect, Geometry, Rect};
use serde::Serialize;

use crate::error::{HfError, Result};
use crate::spatial::{Crs, SpatialRef};
use crate::model::value::{FeatureId, Value};

/// An attribute column as declared in the source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub decl_type: String,
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, decl_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decl_type: decl_type.into(),
            primary_key: false,
        }
    }

    /// An `INTEGER PRIMARY KEY` column, the usual GeoPackage `fid`.
    pub fn primary_key(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decl_type: "INTEGER".to_string(),
            primary_key: true,
        }
    }
}

/// The geometry column of a spatial layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryColumn {
    pub name: String,
    /// GeoPackage geometry type name, e.g. `MULTIPOLYGON`.
    pub geometry_type: String,
    pub srs: SpatialRef,
    /// Position of the geometry column among all table columns.
    pub position: usize,
}

impl GeometryColumn {
    pub fn new(name: impl Into<String>, geometry_type: impl Into<String>, srs: SpatialRef) -> Self {
        Self {
            name: name.into(),
            geometry_type: geometry_type.into(),
            srs,
            position: usize::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Features,
    Attributes,
}

impl LayerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Features => "features",
            Self::Attributes => "attributes",
        }
    }
}

/// Schema-level description of a layer, available without reading its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub name: String,
    pub geometry: Option<GeometryColumn>,
}

impl LayerInfo {
    #[must_use]
    pub const fn kind(&self) -> LayerKind {
        if self.geometry.is_some() {
            LayerKind::Features
        } else {
            LayerKind::Attributes
        }
    }

    #[must_use]
    pub const fn is_spatial(&self) -> bool {
        self.geometry.is_some()
    }

    /// CRS of the geometry column, `None` for attribute layers and undefined SRSs.
    #[must_use]
    pub fn crs(&self) -> Option<Crs> {
        self.geometry.as_ref().and_then(|g| g.srs.crs())
    }
}

/// One row: attribute values aligned with [`Layer::columns`] plus an optional geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub attributes: Vec<Value>,
    pub geometry: Option<Geometry<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    info: LayerInfo,
    columns: Vec<Column>,
    features: Vec<Feature>,
}

impl Layer {
    /// Create an empty attribute (non-spatial) layer.
    pub fn new_attributes(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            info: LayerInfo {
                name: name.into(),
                geometry: None,
            },
            columns,
            features: Vec::new(),
        }
    }

    /// Create an empty spatial layer.
    ///
    /// An unset geometry position places the geometry column after the attributes.
    pub fn new_spatial(
        name: impl Into<String>,
        columns: Vec<Column>,
        mut geometry: GeometryColumn,
    ) -> Self {
        geometry.position = geometry.position.min(columns.len());
        Self {
            info: LayerInfo {
                name: name.into(),
                geometry: Some(geometry),
            },
            columns,
            features: Vec::new(),
        }
    }

    /// Append a feature; the attribute count must match the column count.
    pub fn push(&mut self, attributes: Vec<Value>, geometry: Option<Geometry<f64>>) -> Result<()> {
        if attributes.len() != self.columns.len() {
            return Err(HfError::InvalidArgument(format!(
                "layer '{}' has {} columns but feature has {} values",
                self.info.name,
                self.columns.len(),
                attributes.len()
            )));
        }
        if geometry.is_some() && !self.info.is_spatial() {
            return Err(HfError::InvalidArgument(format!(
                "layer '{}' has no geometry column",
                self.info.name
            )));
        }
        self.features.push(Feature {
            attributes,
            geometry,
        });
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    #[must_use]
    pub const fn info(&self) -> &LayerInfo {
        &self.info
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub const fn is_spatial(&self) -> bool {
        self.info.is_spatial()
    }

    #[must_use]
    pub fn crs(&self) -> Option<Crs> {
        self.info.crs()
    }

    /// Index of the attribute column called `name` (case-sensitive).
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Identifier held by `feature` in column `column`, if present.
    #[must_use]
    pub fn feature_id(feature: &Feature, column: usize) -> Option<FeatureId> {
        feature.attributes.get(column).and_then(Value::feature_id)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Feature) -> bool) {
        self.features.retain(keep);
    }

    /// Extent of all non-null geometries.
    #[must_use]
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref().and_then(|g| g.bounding_rect()))
            .reduce(|acc, rect| {
                Rect::new(
                    (acc.min().x.min(rect.min().x), acc.min().y.min(rect.min().y)),
                    (acc.max().x.max(rect.max().x), acc.max().y.max(rect.max().y)),
                )
            })
    }
}
