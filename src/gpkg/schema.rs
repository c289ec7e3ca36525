//! GeoPackage core schema

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::spatial::{Crs, SpatialRef};

const CORE_SCHEMA: &str = include_str!("../../migrations/001_gpkg_core.sql");

/// `'GPKG'` as a big-endian 32-bit integer.
pub const APPLICATION_ID: i32 = 0x4750_4B47;

/// GeoPackage 1.3.0.
pub const USER_VERSION: i32 = 10_300;

/// Create the core tables and required SRS rows. Safe to run on an existing GeoPackage.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(CORE_SCHEMA)?;
    register_srs(conn, &SpatialRef::for_crs(&Crs::epsg(4326)))?;
    conn.pragma_update(None, "application_id", APPLICATION_ID)?;
    conn.pragma_update(None, "user_version", USER_VERSION)?;
    Ok(())
}

/// Insert `srs` unless a row with the same `srs_id` already exists.
pub fn register_srs(conn: &Connection, srs: &SpatialRef) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys
             (srs_name, srs_id, organization, organization_coordsys_id, definition)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            srs.srs_name,
            srs.srs_id,
            srs.organization,
            srs.organization_coordsys_id,
            srs.definition
        ],
    )?;
    Ok(())
}

/// Whether the core GeoPackage tables are present.
pub fn has_core_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
             ('gpkg_spatial_ref_sys', 'gpkg_contents', 'gpkg_geometry_columns')",
        [],
        |row| row.get(0),
    )?;
    Ok(count == 3)
}
