//! Mask polygons used as spatial filters.

use std::path::Path;

use geo::{BoundingRect, Geometry, Intersects, MultiPolygon, Polygon, Rect};

use crate::error::{HfError, Result};
use crate::gpkg::GeoPackage;
use crate::model::{Layer, LayerSource};
use crate::spatial::crs::Crs;
use crate::spatial::transform::CoordinateTransform;

/// A mask geometry as supplied by the caller.
///
/// Construction never fails; [`Mask::prepare`] checks that the mask is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    geometry: Geometry<f64>,
    crs: Option<Crs>,
}

impl Mask {
    pub fn new(geometry: impl Into<Geometry<f64>>, crs: Option<Crs>) -> Self {
        Self {
            geometry: geometry.into(),
            crs,
        }
    }

    /// An axis-aligned rectangle mask.
    pub fn from_bbox(xmin: f64, ymin: f64, xmax: f64, ymax: f64, crs: Option<Crs>) -> Result<Self> {
        if !(xmin < xmax && ymin < ymax) {
            return Err(HfError::InvalidMask(format!(
                "bounding box {xmin},{ymin},{xmax},{ymax} is empty or inverted"
            )));
        }
        let rect = Rect::new((xmin, ymin), (xmax, ymax));
        Ok(Self::new(rect.to_polygon(), crs))
    }

    /// All polygons of a spatial layer, in that layer's CRS.
    #[must_use]
    pub fn from_layer(layer: &Layer) -> Self {
        let polygons: Vec<Polygon<f64>> = layer
            .features()
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(|g| areal_parts(g).ok())
            .flat_map(|mp| mp.0)
            .collect();
        Self::new(MultiPolygon::new(polygons), layer.crs())
    }

    /// Load a mask from a GeoPackage layer, or from its first spatial layer when `layer` is `None`.
    pub fn from_geopackage(path: &Path, layer: Option<&str>) -> Result<Self> {
        let gpkg = GeoPackage::open_read_only(path)?;
        let name = match layer {
            Some(name) => name.to_string(),
            None => gpkg
                .layers()?
                .into_iter()
                .find(|info| info.is_spatial())
                .map(|info| info.name)
                .ok_or_else(|| {
                    HfError::InvalidMask(format!("{} has no spatial layer", path.display()))
                })?,
        };
        let layer = gpkg.read_layer(&name)?;
        if !layer.is_spatial() {
            return Err(HfError::InvalidMask(format!(
                "mask layer '{name}' has no geometry column"
            )));
        }
        Ok(Self::from_layer(&layer))
    }

    #[must_use]
    pub const fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    #[must_use]
    pub const fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Validate the mask and build its intersection-ready form.
    pub fn prepare(&self) -> Result<PreparedMask> {
        let crs = self
            .crs
            .clone()
            .ok_or_else(|| HfError::InvalidMask("mask has no CRS".to_string()))?;
        let polygons = areal_parts(&self.geometry).map_err(HfError::InvalidMask)?;
        PreparedMask::new(polygons, crs)
    }
}

/// A validated, non-empty areal mask in a known CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMask {
    geometry: Geometry<f64>,
    bbox: Rect<f64>,
    crs: Crs,
}

impl PreparedMask {
    fn new(polygons: MultiPolygon<f64>, crs: Crs) -> Result<Self> {
        let polygons = MultiPolygon::new(
            polygons
                .0
                .into_iter()
                .filter(|p| !p.exterior().0.is_empty())
                .collect(),
        );
        let bbox = polygons
            .bounding_rect()
            .ok_or_else(|| HfError::InvalidMask("mask has no geometry".to_string()))?;
        Ok(Self {
            geometry: Geometry::MultiPolygon(polygons),
            bbox,
            crs,
        })
    }

    #[must_use]
    pub const fn crs(&self) -> &Crs {
        &self.crs
    }

    #[must_use]
    pub const fn geometry(&self) -> &Geometry<f64> {
        &self.geometry
    }

    /// Non-empty intersection test; touching the boundary counts.
    #[must_use]
    pub fn intersects(&self, geometry: &Geometry<f64>) -> bool {
        match geometry.bounding_rect() {
            Some(rect) if rect.intersects(&self.bbox) => geometry.intersects(&self.geometry),
            _ => false,
        }
    }

    /// A copy of this mask in `to`. The receiver is left untouched.
    pub fn reproject(&self, to: &Crs, transform: &dyn CoordinateTransform) -> Result<Self> {
        if &self.crs == to {
            return Ok(self.clone());
        }
        let projected = transform.transform(&self.geometry, &self.crs, to)?;
        let polygons = areal_parts(&projected).map_err(HfError::Geometry)?;
        Self::new(polygons, to.clone())
    }
}

/// Collect the areal parts of `geometry` as a multipolygon.
fn areal_parts(geometry: &Geometry<f64>) -> std::result::Result<MultiPolygon<f64>, String> {
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Ok(mp.clone()),
        Geometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Ok(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let mut polygons = Vec::new();
            for part in gc.iter() {
                polygons.extend(areal_parts(part)?.0);
            }
            Ok(MultiPolygon::new(polygons))
        }
        other => Err(format!(
            "mask must be a polygon or multipolygon, got {}",
            geometry_name(other)
        )),
    }
}

const fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "point",
        Geometry::Line(_) => "line",
        Geometry::LineString(_) => "linestring",
        Geometry::Polygon(_) => "polygon",
        Geometry::MultiPoint(_) => "multipoint",
        Geometry::MultiLineString(_) => "multilinestring",
        Geometry::MultiPolygon(_) => "multipolygon",
        Geometry::GeometryCollection(_) => "geometrycollection",
        Geometry::Rect(_) => "rect",
        Geometry::Triangle(_) => "triangle",
    }
}
