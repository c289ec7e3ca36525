use std::path::{Path, PathBuf};

use geo::{line_string, point, polygon, Geometry};
use tempfile::TempDir;

use crate::gpkg::GeoPackage;
use crate::model::{Column, GeometryColumn, Layer, LayerSet, LayerSink, Value};
use crate::spatial::{Crs, SpatialRef};

/// A synthetic hydrofabric laid out as a row of square catchments.
///
/// Catchment `i` covers `x in [i*size, (i+1)*size]`, `y in [0, size]` and carries:
/// - `divides`: the square, `divide_id = cat-i`, `id = wb-i`
/// - `flowpaths`: a horizontal line across the middle of the square, `id = wb-i`
/// - `nexus`: a point inside the square, `id = nex-i`
/// - `network`: `id = wb-i`, `toid = nex-i`, `divide_id = cat-i`
/// - `flowpath-attributes`: `id = wb-i` with a Manning's n
///
/// `lakes` has no identifier column and holds one row per catchment.
#[must_use]
pub fn synthetic_hydrofabric(crs: &Crs, cells: usize, size: f64) -> LayerSet {
    let srs = SpatialRef::for_crs(crs);
    let mut divides = Layer::new_spatial(
        "divides",
        vec![
            Column::primary_key("fid"),
            Column::new("divide_id", "TEXT"),
            Column::new("id", "TEXT"),
            Column::new("areasqkm", "REAL"),
        ],
        GeometryColumn::new("geom", "POLYGON", srs.clone()),
    );
    let mut flowpaths = Layer::new_spatial(
        "flowpaths",
        vec![
            Column::primary_key("fid"),
            Column::new("id", "TEXT"),
            Column::new("toid", "TEXT"),
            Column::new("lengthkm", "REAL"),
        ],
        GeometryColumn::new("geom", "LINESTRING", srs.clone()),
    );
    let mut nexus = Layer::new_spatial(
        "nexus",
        vec![
            Column::primary_key("fid"),
            Column::new("id", "TEXT"),
            Column::new("toid", "TEXT"),
        ],
        GeometryColumn::new("geom", "POINT", srs),
    );
    let mut network = Layer::new_attributes(
        "network",
        vec![
            Column::new("id", "TEXT"),
            Column::new("toid", "TEXT"),
            Column::new("divide_id", "TEXT"),
        ],
    );
    let mut attributes = Layer::new_attributes(
        "flowpath-attributes",
        vec![Column::new("id", "TEXT"), Column::new("n", "REAL")],
    );
    let mut lakes = Layer::new_attributes(
        "lakes",
        vec![Column::new("lake_id", "INTEGER"), Column::new("name", "TEXT")],
    );

    for i in 0..cells {
        let x0 = i as f64 * size;
        let x1 = x0 + size;
        let fid = Value::Integer(i as i64 + 1);
        let (cat, wb, nex) = (format!("cat-{i}"), format!("wb-{i}"), format!("nex-{i}"));

        push(
            &mut divides,
            vec![fid.clone(), cat.as_str().into(), wb.as_str().into(), 1.0.into()],
            Some(Geometry::Polygon(polygon![
                (x: x0, y: 0.0), (x: x1, y: 0.0), (x: x1, y: size), (x: x0, y: size)
            ])),
        );
        push(
            &mut flowpaths,
            vec![fid.clone(), wb.as_str().into(), nex.as_str().into(), 1.0.into()],
            Some(Geometry::LineString(line_string![
                (x: x0 + 0.1 * size, y: 0.5 * size),
                (x: x0 + 0.9 * size, y: 0.5 * size)
            ])),
        );
        push(
            &mut nexus,
            vec![fid, nex.as_str().into(), format!("wb-{}", i + 1).into()],
            Some(Geometry::Point(point!(x: x0 + 0.5 * size, y: 0.4 * size))),
        );
        push(
            &mut network,
            vec![wb.as_str().into(), nex.as_str().into(), cat.as_str().into()],
            None,
        );
        push(&mut attributes, vec![wb.into(), 0.05.into()], None);
        push(
            &mut lakes,
            vec![Value::Integer(i as i64), format!("lake {i}").into()],
            None,
        );
    }

    [divides, flowpaths, nexus, network, attributes, lakes]
        .into_iter()
        .collect()
}

fn push(layer: &mut Layer, attributes: Vec<Value>, geometry: Option<Geometry<f64>>) {
    layer
        .push(attributes, geometry)
        .expect("fixture row matches its layer schema");
}

/// A synthetic hydrofabric written to a GeoPackage in a temp directory.
pub struct HydrofabricFixture {
    pub temp_dir: TempDir,
    pub path: PathBuf,
    pub crs: Crs,
    pub cells: usize,
    pub size: f64,
}

impl HydrofabricFixture {
    /// `cells` catchments of 0.01 degrees in EPSG:4326.
    #[must_use]
    pub fn new(cells: usize) -> Self {
        Self::with_crs(Crs::epsg(4326), cells, 0.01)
    }

    /// `cells` catchments of `size` units in `crs`.
    #[must_use]
    pub fn with_crs(crs: Crs, cells: usize, size: f64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hydrofabric.gpkg");
        let mut gpkg = GeoPackage::create(&path).expect("Failed to create fixture GeoPackage");
        for layer in synthetic_hydrofabric(&crs, cells, size) {
            gpkg.write_layer(layer).expect("Failed to write fixture layer");
        }
        Self {
            temp_dir,
            path,
            crs,
            cells,
            size,
        }
    }

    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A path inside the fixture directory.
    #[must_use]
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// A box touching catchments `first..=last` and no others.
    #[must_use]
    pub fn cells_bbox(&self, first: usize, last: usize) -> [f64; 4] {
        [
            (first as f64 + 0.25) * self.size,
            0.25 * self.size,
            (last as f64 + 0.75) * self.size,
            0.75 * self.size,
        ]
    }

    /// [`Self::cells_bbox`] formatted for `hf mask --bbox`.
    #[must_use]
    pub fn cells_bbox_arg(&self, first: usize, last: usize) -> String {
        let [xmin, ymin, xmax, ymax] = self.cells_bbox(first, last);
        format!("{xmin},{ymin},{xmax},{ymax}")
    }
}
