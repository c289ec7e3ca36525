use regex::Regex;
use rusqlite::Connection;

use hydrofabric::gpkg::blob;
use hydrofabric::model::{LayerKind, LayerSource};
use hydrofabric::spatial::Crs;
use hydrofabric::test_utils::HydrofabricFixture;
use hydrofabric::GeoPackage;

#[test]
fn geometry_blobs_carry_gpkg_header_and_srs() {
    let fixture = HydrofabricFixture::with_crs(Crs::epsg(5070), 2, 1000.0);
    let conn = Connection::open(&fixture.path).unwrap();
    let blob: Vec<u8> = conn
        .query_row("SELECT geom FROM divides ORDER BY fid LIMIT 1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(&blob[..2], b"GP");

    assert_eq!(blob[3] & 0b0001_0000, 0, "non-empty");
    let srs_id = i32::from_le_bytes([blob[4], blob[5], blob[6], blob[7]]);
    assert_eq!(srs_id, 5070);
    assert!(blob::decode(&blob).unwrap().is_some());
}

#[test]
fn geometry_columns_are_registered() {
    let fixture = HydrofabricFixture::new(1);
    let conn = Connection::open(&fixture.path).unwrap();
    let mut stmt = conn
        .prepare(
            "SELECT table_name, geometry_type_name, srs_id FROM gpkg_geometry_columns ORDER BY table_name",
        )
        .unwrap();
    let rows: Vec<(String, String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            ("divides".to_string(), "POLYGON".to_string(), 4326),
            ("flowpaths".to_string(), "LINESTRING".to_string(), 4326),
            ("nexus".to_string(), "POINT".to_string(), 4326),
        ]
    );
}

#[test]
fn custom_ignore_pattern_hides_layers() {
    let fixture = HydrofabricFixture::new(1);
    let gpkg = GeoPackage::open_read_only(&fixture.path)
        .unwrap()
        .with_ignore_pattern(Regex::new("^gpkg_|^rtree_|^sqlite_|^lakes$").unwrap());
    let infos = gpkg.layers().unwrap();
    assert_eq!(infos.len(), 5);
    assert!(infos.iter().all(|info| info.name != "lakes"));
    assert_eq!(
        infos.iter().filter(|info| info.kind() == LayerKind::Features).count(),
        3
    );
}

#[test]
fn external_attribute_table_is_read() {
    let fixture = HydrofabricFixture::new(1);
    {
        let conn = Connection::open(&fixture.path).unwrap();
        conn.execute_batch(
            "CREATE TABLE \"hydrolocations\" (hl_id INTEGER, id TEXT, hl_reference TEXT);
             INSERT INTO \"hydrolocations\" VALUES (7, 'wb-0', 'gages');",
        )
        .unwrap();
    }
    let gpkg = GeoPackage::open_read_only(&fixture.path).unwrap();
    let layer = gpkg.read_layer("hydrolocations").unwrap();
    assert!(!layer.is_spatial());
    assert_eq!(layer.len(), 1);
    assert_eq!(layer.column_index("id"), Some(1));
}
