use geo::{polygon, Geometry};
use rusqlite::Connection;

use hydrofabric::error::HfError;
use hydrofabric::mask::{mask_hydrofabric, MaskOptions, MaskOutput, MaskWarning, Masker};
use hydrofabric::model::{Column, GeometryColumn, Layer, LayerSink, LayerSource};
use hydrofabric::spatial::{BuiltinTransform, CoordinateTransform, Crs, Mask, SpatialRef};
use hydrofabric::test_utils::{init_test_tracing, HydrofabricFixture};
use hydrofabric::GeoPackage;

use super::fixture::column_values;

fn bbox_mask(fixture: &HydrofabricFixture, first: usize, last: usize) -> Mask {
    let [xmin, ymin, xmax, ymax] = fixture.cells_bbox(first, last);
    Mask::from_bbox(xmin, ymin, xmax, ymax, Some(fixture.crs.clone())).unwrap()
}

#[test]
fn masked_geopackage_keeps_selected_catchments() {
    init_test_tracing();
    let fixture = HydrofabricFixture::new(5);
    let out = fixture.output_path("masked.gpkg");

    let output = mask_hydrofabric(
        &fixture.path,
        &bbox_mask(&fixture, 1, 2),
        Some(&out),
        MaskOptions::default(),
    )
    .unwrap();
    assert!(matches!(output, MaskOutput::Written { ref path, .. } if path == &out));

    assert_eq!(column_values(&out, "divides", "divide_id"), ["cat-1", "cat-2"]);
    assert_eq!(column_values(&out, "flowpaths", "id"), ["wb-1", "wb-2"]);
    assert_eq!(column_values(&out, "nexus", "id"), ["nex-1", "nex-2"]);
    assert_eq!(column_values(&out, "network", "id"), ["wb-1", "wb-2"]);
    assert_eq!(column_values(&out, "flowpath-attributes", "id"), ["wb-1", "wb-2"]);
    assert!(column_values(&out, "lakes", "name").is_empty());

    let summary = output.summary();
    assert_eq!(summary.surviving_ids, 6);
    assert_eq!(
        summary.warnings,
        vec![MaskWarning::IdentifierColumnMissing {
            layer: "lakes".into()
        }]
    );
}

#[test]
fn output_is_a_registered_geopackage() {
    let fixture = HydrofabricFixture::new(3);
    let out = fixture.output_path("masked.gpkg");
    mask_hydrofabric(&fixture.path, &bbox_mask(&fixture, 0, 0), Some(&out), MaskOptions::default())
        .unwrap();

    let conn = Connection::open(&out).unwrap();
    let app_id: i64 = conn
        .query_row("PRAGMA application_id", [], |row| row.get(0))
        .unwrap();
    assert_eq!(app_id, 0x4750_4B47);
    let spatial: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM gpkg_contents WHERE data_type = 'features'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(spatial, 3);

    let gpkg = GeoPackage::open_read_only(&out).unwrap();
    let divides = gpkg.read_layer("divides").unwrap();
    assert_eq!(divides.crs(), Some(Crs::epsg(4326)));
    assert_eq!(divides.len(), 1);
}

#[test]
fn geographic_mask_over_projected_hydrofabric() {
    let fixture = HydrofabricFixture::with_crs(Crs::epsg(5070), 5, 1000.0);
    let [xmin, ymin, xmax, ymax] = fixture.cells_bbox(2, 3);
    let albers_box = Geometry::Polygon(polygon![
        (x: xmin, y: ymin), (x: xmax, y: ymin), (x: xmax, y: ymax), (x: xmin, y: ymax)
    ]);
    let wgs84_box = BuiltinTransform
        .transform(&albers_box, &Crs::epsg(5070), &Crs::epsg(4326))
        .unwrap();

    let output = mask_hydrofabric(
        &fixture.path,
        &Mask::new(wgs84_box, Some(Crs::epsg(4326))),
        None,
        MaskOptions::default(),
    )
    .unwrap();
    let MaskOutput::InMemory { layers, summary } = output else {
        panic!("expected in-memory output");
    };

    let divides = layers.get("divides").unwrap();
    assert_eq!(divides.len(), 2);
    assert_eq!(
        summary.layer("divides").unwrap().reprojected_to,
        Some(Crs::epsg(5070))
    );
    assert_eq!(layers.get("network").unwrap().len(), 2);
}

#[test]
fn invalid_mask_leaves_no_destination() {
    let fixture = HydrofabricFixture::new(2);
    let out = fixture.output_path("never.gpkg");
    let mask = Mask::new(
        Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
        None,
    );

    let err = mask_hydrofabric(&fixture.path, &mask, Some(&out), MaskOptions::default())
        .unwrap_err();
    assert!(matches!(err, HfError::InvalidMask(_)));
    assert!(!out.exists());
}

#[test]
fn destination_cannot_be_the_source() {
    let fixture = HydrofabricFixture::new(2);
    let err = mask_hydrofabric(
        &fixture.path,
        &bbox_mask(&fixture, 0, 0),
        Some(&fixture.path),
        MaskOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, HfError::InvalidArgument(_)));
    assert_eq!(column_values(&fixture.path, "divides", "divide_id").len(), 2);
}

#[test]
fn existing_destination_keeps_unrelated_layers() {
    let fixture = HydrofabricFixture::new(3);
    let out = fixture.output_path("existing.gpkg");
    {
        let mut gpkg = GeoPackage::create(&out).unwrap();
        let mut notes = Layer::new_attributes("notes", vec![Column::new("text", "TEXT")]);
        notes.push(vec!["keep me".into()], None).unwrap();
        gpkg.write_layer(notes).unwrap();
        let mut stale = Layer::new_attributes("network", vec![Column::new("id", "TEXT")]);
        stale.push(vec!["stale".into()], None).unwrap();
        gpkg.write_layer(stale).unwrap();
    }

    mask_hydrofabric(&fixture.path, &bbox_mask(&fixture, 2, 2), Some(&out), MaskOptions::default())
        .unwrap();

    assert_eq!(column_values(&out, "notes", "text"), ["keep me"]);
    assert_eq!(column_values(&out, "network", "id"), ["wb-2"]);
}

#[test]
fn mask_loaded_from_geopackage_layer() {
    let fixture = HydrofabricFixture::with_crs(Crs::epsg(5070), 4, 1000.0);
    let mask_path = fixture.output_path("aoi.gpkg");
    {
        let [xmin, ymin, xmax, ymax] = fixture.cells_bbox(3, 3);
        let mut aoi = Layer::new_spatial(
            "aoi",
            vec![Column::new("name", "TEXT")],
            GeometryColumn::new("geom", "POLYGON", SpatialRef::for_crs(&Crs::epsg(5070))),
        );
        aoi.push(
            vec!["outlet".into()],
            Some(Geometry::Polygon(polygon![
                (x: xmin, y: ymin), (x: xmax, y: ymin), (x: xmax, y: ymax), (x: xmin, y: ymax)
            ])),
        )
        .unwrap();
        GeoPackage::create(&mask_path).unwrap().write_layer(aoi).unwrap();
    }

    let mask = Mask::from_geopackage(&mask_path, None).unwrap();
    assert_eq!(mask.crs(), Some(&Crs::epsg(5070)));

    let source = GeoPackage::open_read_only(&fixture.path).unwrap();
    let output = Masker::default().mask_geopackage(&source, &mask, None).unwrap();
    let MaskOutput::InMemory { layers, .. } = output else {
        panic!("expected in-memory output");
    };
    assert_eq!(layers.get("flowpaths").unwrap().len(), 1);
    assert_eq!(layers.get("flowpath-attributes").unwrap().len(), 1);
}

#[test]
fn disjoint_mask_writes_empty_layers() {
    let fixture = HydrofabricFixture::new(3);
    let out = fixture.output_path("empty.gpkg");
    let mask = Mask::from_bbox(50.0, 50.0, 51.0, 51.0, Some(Crs::epsg(4326))).unwrap();

    let output = mask_hydrofabric(&fixture.path, &mask, Some(&out), MaskOptions::default()).unwrap();
    assert_eq!(output.summary().rows_kept(), 0);

    let gpkg = GeoPackage::open_read_only(&out).unwrap();
    let names: Vec<String> = gpkg.layers().unwrap().into_iter().map(|l| l.name).collect();
    assert_eq!(names.len(), 6);
    for name in names {
        assert_eq!(gpkg.row_count(&name).unwrap(), 0, "{name} should be empty");
    }
}

#[test]
fn passthrough_copies_layer_verbatim() {
    let fixture = HydrofabricFixture::new(4);
    let options = MaskOptions {
        passthrough_layers: vec!["lakes".into()],
        ..MaskOptions::default()
    };
    let output = mask_hydrofabric(&fixture.path, &bbox_mask(&fixture, 0, 0), None, options).unwrap();
    let MaskOutput::InMemory { layers, summary } = output else {
        panic!("expected in-memory output");
    };
    assert_eq!(layers.get("lakes").unwrap().len(), 4);
    assert!(summary.layer("lakes").unwrap().passthrough);
    assert!(summary.warnings.is_empty());
}

#[test]
fn unreadable_layer_aborts_after_earlier_layers_are_written() {
    init_test_tracing();
    let fixture = HydrofabricFixture::new(3);
    Connection::open(&fixture.path)
        .unwrap()
        .execute("UPDATE nexus SET geom = X'00010203' WHERE fid = 2", [])
        .unwrap();
    let out = fixture.output_path("partial.gpkg");

    let err = mask_hydrofabric(&fixture.path, &bbox_mask(&fixture, 0, 2), Some(&out), MaskOptions::default())
        .unwrap_err();
    assert!(matches!(err, HfError::LayerRead { ref layer, .. } if layer == "nexus"));

    // Layers before the failing one in read order are already on disk.
    assert_eq!(column_values(&out, "divides", "divide_id"), ["cat-0", "cat-1", "cat-2"]);
    assert_eq!(column_values(&out, "flowpaths", "id"), ["wb-0", "wb-1", "wb-2"]);
    let conn = Connection::open(&out).unwrap();
    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('nexus', 'network')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 0);
}
