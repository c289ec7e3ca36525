pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod gpkg;
pub mod mask;
pub mod model;
pub mod spatial;
pub mod test_utils;

pub use error::{HfError, Result};
pub use gpkg::GeoPackage;
pub use mask::{mask_hydrofabric, MaskOptions, MaskOutput, MaskSummary, Masker};
pub use model::{Layer, LayerSet, LayerSink, LayerSource};
pub use spatial::{Crs, Mask};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
