//! GeoPackage (SQLite) reading and writing.

pub mod blob;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Transaction};
use tracing::debug;

use crate::error::{HfError, Result};
use crate::model::{Column, GeometryColumn, Layer, LayerInfo, LayerSink, LayerSource, Value};
use crate::spatial::SpatialRef;

/// Tables matching this pattern are GeoPackage/SQLite internals, not layers.
pub const DEFAULT_IGNORE_PATTERN: &str = "gpkg_|rtree_|sqlite_";

static DEFAULT_IGNORE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DEFAULT_IGNORE_PATTERN).unwrap());

/// A GeoPackage file.
pub struct GeoPackage {
    conn: Connection,
    path: PathBuf,
    ignore: Regex,
}

impl std::fmt::Debug for GeoPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoPackage")
            .field("path", &self.path)
            .field("ignore", &self.ignore.as_str())
            .finish_non_exhaustive()
    }
}

impl GeoPackage {
    /// Open an existing GeoPackage for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path)?;
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure_pragmas(&conn)?;
        Ok(Self::from_connection(conn, path))
    }

    /// Open an existing GeoPackage without write access.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        ensure_exists(path)?;
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn, path))
    }

    /// Create a GeoPackage, or open an existing one, and make sure the core tables exist.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        schema::initialize(&conn)?;
        debug!(path = %path.display(), "initialized geopackage");
        Ok(Self::from_connection(conn, path))
    }

    fn from_connection(conn: Connection, path: &Path) -> Self {
        Self {
            conn,
            path: path.to_path_buf(),
            ignore: DEFAULT_IGNORE.clone(),
        }
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    /// Replace the default internal-table filter.
    #[must_use]
    pub fn with_ignore_pattern(mut self, pattern: Regex) -> Self {
        self.ignore = pattern;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_ignored(&self, table: &str) -> bool {
        self.ignore.is_match(table)
    }

    /// Names of all user tables, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for name in rows {
            let name = name?;
            if !self.is_ignored(&name) {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Geometry column registrations keyed by table name.
    fn geometry_columns(&self) -> Result<HashMap<String, GeometryColumn>> {
        if !schema::has_core_tables(&self.conn)? {
            return Ok(HashMap::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT gc.table_name, gc.column_name, gc.geometry_type_name, gc.srs_id,
                    s.srs_name, s.organization, s.organization_coordsys_id, s.definition
             FROM gpkg_geometry_columns gc
             LEFT JOIN gpkg_spatial_ref_sys s ON s.srs_id = gc.srs_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let srs_id: i32 = row.get(3)?;
            let srs = SpatialRef {
                srs_id,
                srs_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                organization: row
                    .get::<_, Option<String>>(5)?
                    .unwrap_or_else(|| "NONE".to_string()),
                organization_coordsys_id: row.get::<_, Option<i32>>(6)?.unwrap_or(srs_id),
                definition: row
                    .get::<_, Option<String>>(7)?
                    .unwrap_or_else(|| "undefined".to_string()),
            };
            let table: String = row.get(0)?;
            Ok((table, GeometryColumn::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?, srs)))
        })?;
        let mut columns = HashMap::new();
        for row in rows {
            let (table, column) = row?;
            columns.insert(table, column);
        }
        Ok(columns)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<Column>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let rows = stmt.query_map([table], |row| {
            Ok(Column {
                name: row.get(0)?,
                decl_type: row.get(1)?,
                primary_key: row.get::<_, i64>(2)? > 0,
            })
        })?;
        let mut columns = Vec::new();
        for column in rows {
            columns.push(column?);
        }
        Ok(columns)
    }

    /// Split table columns into attributes and the geometry column, fixing its position.
    fn layer_schema(
        &self,
        table: &str,
        geometry: Option<GeometryColumn>,
    ) -> Result<(Vec<Column>, Option<GeometryColumn>)> {
        let mut columns = self.table_columns(table)?;
        let geometry = match geometry {
            Some(mut geometry) => match columns.iter().position(|c| c.name == geometry.name) {
                Some(position) => {
                    columns.remove(position);
                    geometry.position = position;
                    Some(geometry)
                }
                None => {
                    return Err(HfError::layer_read(
                        table,
                        format!("registered geometry column '{}' is missing", geometry.name),
                    ));
                }
            },
            None => None,
        };
        Ok((columns, geometry))
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> Result<usize> {
        if !self.table_exists(table)? {
            return Err(HfError::LayerNotFound(table.to_string()));
        }
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn read_rows(&self, layer: &mut Layer, all_columns: &[String], geometry_at: Option<usize>) -> Result<()> {
        let select = format!(
            "SELECT {} FROM {}",
            all_columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            quote_ident(layer.name())
        );
        let mut stmt = self.conn.prepare(&select)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut attributes = Vec::with_capacity(all_columns.len());
            let mut geometry = None;
            for idx in 0..all_columns.len() {
                let value = row.get_ref(idx)?;
                if Some(idx) == geometry_at {
                    geometry = match value {
                        rusqlite::types::ValueRef::Blob(bytes) => blob::decode(bytes)?,
                        rusqlite::types::ValueRef::Null => None,
                        other => {
                            return Err(HfError::Geometry(format!(
                                "geometry stored as {:?}",
                                other.data_type()
                            )));
                        }
                    };
                } else {
                    attributes.push(Value::from(value));
                }
            }
            layer.push(attributes, geometry)?;
        }
        Ok(())
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(HfError::InvalidArgument(format!(
            "GeoPackage {} does not exist",
            path.display()
        )))
    }
}

/// Quote an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl LayerSource for GeoPackage {
    fn layers(&self) -> Result<Vec<LayerInfo>> {
        let mut registered = self.geometry_columns()?;
        let mut infos = Vec::new();
        for name in self.list_tables()? {
            let geometry = registered.remove(&name);
            let (_, geometry) = self.layer_schema(&name, geometry)?;
            infos.push(LayerInfo { name, geometry });
        }
        Ok(infos)
    }

    fn read_layer(&self, name: &str) -> Result<Layer> {
        if !self.table_exists(name)? {
            return Err(HfError::LayerNotFound(name.to_string()));
        }
        let wrap = |err: HfError| match err {
            HfError::LayerRead { .. } => err,
            other => HfError::layer_read(name, other),
        };

        let geometry = self.geometry_columns().map_err(wrap)?.remove(name);
        let (columns, geometry) = self.layer_schema(name, geometry).map_err(wrap)?;
        let mut all_columns: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let geometry_at = geometry.as_ref().map(|g| g.position);
        let mut layer = match geometry {
            Some(geometry) => {
                all_columns.insert(geometry.position, geometry.name.clone());
                Layer::new_spatial(name, columns, geometry)
            }
            None => Layer::new_attributes(name, columns),
        };

        self.read_rows(&mut layer, &all_columns, geometry_at).map_err(wrap)?;
        debug!(layer = name, features = layer.len(), spatial = layer.is_spatial(), "read layer");
        Ok(layer)
    }
}

impl LayerSink for GeoPackage {
    fn write_layer(&mut self, layer: Layer) -> Result<()> {
        let tx = self.conn.transaction()?;
        drop_layer(&tx, layer.name())?;
        create_table(&tx, &layer)?;
        insert_features(&tx, &layer)?;
        register_layer(&tx, &layer)?;
        tx.commit()?;
        debug!(layer = layer.name(), features = layer.len(), path = %self.path.display(), "wrote layer");
        Ok(())
    }
}

fn drop_layer(tx: &Transaction<'_>, name: &str) -> Result<()> {
    tx.execute("DELETE FROM gpkg_geometry_columns WHERE table_name = ?1", [name])?;
    tx.execute("DELETE FROM gpkg_contents WHERE table_name = ?1", [name])?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(name)))?;
    Ok(())
}

fn create_table(tx: &Transaction<'_>, layer: &Layer) -> Result<()> {
    let mut definitions: Vec<String> = layer
        .columns()
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.decl_type).trim_end().to_string())
        .collect();
    if let Some(geometry) = &layer.info().geometry {
        definitions.insert(
            geometry.position,
            format!("{} {}", quote_ident(&geometry.name), geometry.geometry_type),
        );
    }
    let keys: Vec<String> = layer
        .columns()
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();
    if !keys.is_empty() {
        definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }
    tx.execute_batch(&format!(
        "CREATE TABLE {} ({});",
        quote_ident(layer.name()),
        definitions.join(", ")
    ))?;
    Ok(())
}

fn insert_features(tx: &Transaction<'_>, layer: &Layer) -> Result<()> {
    let geometry = layer.info().geometry.as_ref();
    let mut names: Vec<String> = layer.columns().iter().map(|c| quote_ident(&c.name)).collect();
    if let Some(geometry) = geometry {
        names.insert(geometry.position, quote_ident(&geometry.name));
    }
    if names.is_empty() {
        return Ok(());
    }
    let placeholders = (1..=names.len()).map(|i| format!("?{i}")).collect::<Vec<_>>();
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(layer.name()),
        names.join(", "),
        placeholders.join(", ")
    ))?;

    for feature in layer.features() {
        let mut values = feature.attributes.clone();
        if let Some(column) = geometry {
            let blob = match &feature.geometry {
                Some(g) => Value::Blob(blob::encode(g, column.srs.srs_id)?),
                None => Value::Null,
            };
            values.insert(column.position, blob);
        }
        stmt.execute(params_from_iter(values.iter()))?;
    }
    Ok(())
}

fn register_layer(tx: &Transaction<'_>, layer: &Layer) -> Result<()> {
    let info = layer.info();
    let last_change = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let Some(geometry) = &info.geometry else {
        tx.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, last_change)
             VALUES (?1, ?2, ?1, ?3)",
            params![info.name, info.kind().as_str(), last_change],
        )?;
        return Ok(());
    };

    schema::register_srs(tx, &geometry.srs)?;
    let extent = layer.bounding_rect();
    tx.execute(
        "INSERT INTO gpkg_contents
             (table_name, data_type, identifier, last_change, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, ?2, ?1, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            info.name,
            info.kind().as_str(),
            last_change,
            extent.map(|r| r.min().x),
            extent.map(|r| r.min().y),
            extent.map(|r| r.max().x),
            extent.map(|r| r.max().y),
            geometry.srs.srs_id
        ],
    )?;
    tx.execute(
        "INSERT INTO gpkg_geometry_columns
             (table_name, column_name, geometry_type_name, srs_id, z, m)
         VALUES (?1, ?2, ?3, ?4, 0, 0)",
        params![info.name, geometry.name, geometry.geometry_type, geometry.srs.srs_id],
    )?;
    Ok(())
}
