//! Spatial primitives: CRS identity, masks, and coordinate transforms.

pub mod crs;
pub mod mask;
pub mod transform;

pub use crs::{Crs, SpatialRef};
pub use mask::{Mask, PreparedMask};
pub use transform::{BuiltinTransform, CoordinateTransform};
