//! Coordinate reference system identity and GeoPackage spatial reference records.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::HfError;

/// A CRS identified by authority and code, e.g. `EPSG:5070`.
///
/// Authorities are normalized to upper case, so `epsg:4326 == EPSG:4326`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Crs {
    authority: String,
    code: i32,
}

impl Crs {
    pub fn new(authority: &str, code: i32) -> Self {
        Self {
            authority: authority.trim().to_ascii_uppercase(),
            code,
        }
    }

    #[must_use]
    pub fn epsg(code: i32) -> Self {
        Self::new("EPSG", code)
    }

    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    #[must_use]
    pub fn is_epsg(&self) -> bool {
        self.authority == "EPSG"
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Crs {
    type Err = HfError;

    /// Accepts `AUTHORITY:CODE` or a bare code, which is taken as EPSG.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (authority, code) = raw.split_once(':').unwrap_or(("EPSG", raw));
        if authority.trim().is_empty() {
            return Err(HfError::InvalidArgument(format!("invalid CRS '{raw}'")));
        }
        let code = code
            .trim()
            .parse::<i32>()
            .map_err(|err| HfError::InvalidArgument(format!("invalid CRS '{raw}': {err}")))?;
        Ok(Self::new(authority, code))
    }
}

/// A row of `gpkg_spatial_ref_sys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpatialRef {
    pub srs_id: i32,
    pub srs_name: String,
    pub organization: String,
    pub organization_coordsys_id: i32,
    pub definition: String,
}

impl SpatialRef {
    /// The CRS this record identifies, `None` for the undefined systems.
    #[must_use]
    pub fn crs(&self) -> Option<Crs> {
        let organization = self.organization.trim();
        if organization.is_empty()
            || organization.eq_ignore_ascii_case("NONE")
            || self.organization_coordsys_id <= 0
        {
            return None;
        }
        Some(Crs::new(organization, self.organization_coordsys_id))
    }

    /// Build a record for `crs`, using a well-known definition when one is bundled.
    #[must_use]
    pub fn for_crs(crs: &Crs) -> Self {
        let (srs_name, definition) = known_definition(crs)
            .map_or_else(|| (crs.to_string(), "undefined"), |(name, wkt)| (name.to_string(), wkt));
        Self {
            srs_id: crs.code(),
            srs_name,
            organization: crs.authority().to_string(),
            organization_coordsys_id: crs.code(),
            definition: definition.to_string(),
        }
    }

    /// The required `-1` record: undefined Cartesian coordinates.
    #[must_use]
    pub fn undefined_cartesian() -> Self {
        Self {
            srs_id: -1,
            srs_name: "Undefined cartesian SRS".to_string(),
            organization: "NONE".to_string(),
            organization_coordsys_id: -1,
            definition: "undefined".to_string(),
        }
    }

    /// The required `0` record: undefined geographic coordinates.
    #[must_use]
    pub fn undefined_geographic() -> Self {
        Self {
            srs_id: 0,
            srs_name: "Undefined geographic SRS".to_string(),
            organization: "NONE".to_string(),
            organization_coordsys_id: 0,
            definition: "undefined".to_string(),
        }
    }
}

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

const NAD83_WKT: &str = r#"GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4269"]]"#;

const WEB_MERCATOR_WKT: &str = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","3857"]]"#;

const CONUS_ALBERS_WKT: &str = r#"PROJCS["NAD83 / Conus Albers",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4269"]],PROJECTION["Albers_Conic_Equal_Area"],PARAMETER["latitude_of_center",23],PARAMETER["longitude_of_center",-96],PARAMETER["standard_parallel_1",29.5],PARAMETER["standard_parallel_2",45.5],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],AUTHORITY["EPSG","5070"]]"#;

fn known_definition(crs: &Crs) -> Option<(&'static str, &'static str)> {
    if !crs.is_epsg() {
        return None;
    }
    match crs.code() {
        4326 => Some(("WGS 84", WGS84_WKT)),
        4269 => Some(("NAD83", NAD83_WKT)),
        3857 => Some(("WGS 84 / Pseudo-Mercator", WEB_MERCATOR_WKT)),
        5070 => Some(("NAD83 / Conus Albers", CONUS_ALBERS_WKT)),
        _ => None,
    }
}
