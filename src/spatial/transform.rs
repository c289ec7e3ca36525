//! Coordinate transforms between the CRSs hydrofabric data ships in.
//!
//! Reprojection is a pure per-vertex transform keyed by CRS identity.
//! [`BuiltinTransform`] resolves any EPSG code through the bundled EPSG
//! definitions and runs the conversion with `proj4rs`. Callers with CRSs
//! from other authorities plug in their own [`CoordinateTransform`].

use geo::{Coord, Geometry, MapCoords};
use proj4rs::Proj;

use crate::error::{HfError, Result};
use crate::spatial::crs::Crs;

/// Reprojects geometries from one CRS into another.
pub trait CoordinateTransform: Send + Sync {
    fn transform(&self, geometry: &Geometry<f64>, from: &Crs, to: &Crs) -> Result<Geometry<f64>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTransform;

impl BuiltinTransform {
    #[must_use]
    pub fn supports(crs: &Crs) -> bool {
        proj4_definition(crs).is_some()
    }
}

/// PROJ.4 string for an EPSG code.
fn proj4_definition(crs: &Crs) -> Option<&'static str> {
    if !crs.is_epsg() {
        return None;
    }
    let code = match crs.code() {
        900_913 => 3857,
        other => u16::try_from(other).ok()?,
    };
    crs_definitions::from_code(code).map(|def| def.proj4)
}

fn projection(crs: &Crs, unsupported: impl Fn() -> HfError) -> Result<Proj> {
    let definition = proj4_definition(crs).ok_or_else(&unsupported)?;
    Proj::from_proj_string(definition).map_err(|err| {
        tracing::debug!(crs = %crs, error = ?err, "projection definition rejected");
        unsupported()
    })
}

impl CoordinateTransform for BuiltinTransform {
    fn transform(&self, geometry: &Geometry<f64>, from: &Crs, to: &Crs) -> Result<Geometry<f64>> {
        if from == to {
            return Ok(geometry.clone());
        }
        let unsupported = || HfError::UnsupportedTransform {
            from: from.to_string(),
            to: to.to_string(),
        };
        let source = projection(from, unsupported)?;
        let target = projection(to, unsupported)?;
        let (source, target) = (&source, &target);

        geometry.try_map_coords(|c: Coord<f64>| {
            // proj4rs works in radians for geographic CRSs.
            let mut point = if source.is_latlong() {
                (c.x.to_radians(), c.y.to_radians(), 0.0)
            } else {
                (c.x, c.y, 0.0)
            };
            proj4rs::transform::transform(source, target, &mut point).map_err(|err| {
                HfError::Geometry(format!("cannot reproject ({}, {}) from {from} to {to}: {err:?}", c.x, c.y))
            })?;
            Ok(if target.is_latlong() {
                Coord {
                    x: point.0.to_degrees(),
                    y: point.1.to_degrees(),
                }
            } else {
                Coord { x: point.0, y: point.1 }
            })
        })
    }
}
