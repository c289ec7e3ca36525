//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Mask errors
//! - 2xx: Layer errors
//! - 3xx: Geometry and projection errors
//! - 4xx: Config and argument errors
//! - 6xx: Storage errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for JSON output.
///
/// Each variant maps to a numeric code (e.g., `InvalidMask` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Mask errors (1xx)
    // ========================================
    /// E101: Mask has no usable geometry or no CRS
    InvalidMask,

    // ========================================
    // Layer errors (2xx)
    // ========================================
    /// E201: Named layer does not exist in the container
    LayerNotFound,
    /// E202: Layer exists but could not be parsed
    LayerReadError,

    // ========================================
    // Geometry errors (3xx)
    // ========================================
    /// E301: No transform is known between two CRSs
    UnsupportedTransform,
    /// E302: Geometry could not be encoded or decoded
    GeometryError,

    // ========================================
    // Config errors (4xx)
    // ========================================
    /// E401: Config file or value is invalid
    ConfigInvalid,
    /// E402: Required config value is missing
    ConfigMissingRequired,
    /// E403: Command-line argument is invalid
    InvalidArgument,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: SQLite operation failed
    DatabaseError,
    /// E602: Filesystem operation failed
    IoError,
    /// E603: Serialization failed
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `InvalidMask` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::InvalidMask => 101,

            Self::LayerNotFound => 201,
            Self::LayerReadError => 202,

            Self::UnsupportedTransform => 301,
            Self::GeometryError => 302,

            Self::ConfigInvalid => 401,
            Self::ConfigMissingRequired => 402,
            Self::InvalidArgument => 403,

            Self::DatabaseError => 601,
            Self::IoError => 602,
            Self::SerializationError => 603,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::InvalidMask => "Supply a polygon or multipolygon mask with a CRS, e.g. `--bbox xmin,ymin,xmax,ymax --mask-crs EPSG:4326`",
            Self::LayerNotFound => "Run `hf layers <gpkg>` to list the layers available in the GeoPackage",
            Self::LayerReadError => "The layer may be corrupted or use an unsupported geometry encoding. Check it with a GIS tool",
            Self::UnsupportedTransform => "Built-in reprojection covers EPSG codes only. Reproject the mask into the layer CRS first",
            Self::GeometryError => "Check that geometries are valid GeoPackage binary (GP header followed by WKB)",
            Self::ConfigInvalid => "Run `hf config` to see current values. Check TOML syntax in the config file",
            Self::ConfigMissingRequired => "Set the required value in hydrofabric.toml or through its HF_* environment variable",
            Self::InvalidArgument => "Run `hf <command> --help` for the accepted argument formats",
            Self::DatabaseError => "Make sure the file is a valid GeoPackage and is not locked by another process",
            Self::IoError => "Check that the path exists and that you have read/write permission",
            Self::SerializationError => "The output could not be serialized. Please report this with the command used",
        }
    }

    /// Check if this error is potentially recoverable by the user.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidMask
            | Self::LayerNotFound
            | Self::UnsupportedTransform
            | Self::ConfigInvalid
            | Self::ConfigMissingRequired
            | Self::InvalidArgument
            | Self::IoError => true,

            Self::LayerReadError
            | Self::GeometryError
            | Self::DatabaseError
            | Self::SerializationError => false,
        }
    }

    /// Get the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "mask",
            2 => "layer",
            3 => "geometry",
            4 => "config",
            6 => "storage",
            _ => "unknown",
        }
    }

    /// Iterate over all error codes.
    pub fn all() -> impl Iterator<Item = Self> {
        [
            Self::InvalidMask,
            Self::LayerNotFound,
            Self::LayerReadError,
            Self::UnsupportedTransform,
            Self::GeometryError,
            Self::ConfigInvalid,
            Self::ConfigMissingRequired,
            Self::InvalidArgument,
            Self::DatabaseError,
            Self::IoError,
            Self::SerializationError,
        ]
        .into_iter()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
