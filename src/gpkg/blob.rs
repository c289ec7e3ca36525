//! GeoPackage geometry blobs: a `GP` header followed by standard WKB.
//!
//! Header parsing and writing is geozero's GeoPackage WKB dialect. The
//! empty-geometry flag (bit 4 of the flags byte) is handled here since
//! geozero reads past it.

use geo::{BoundingRect, Geometry};
use geozero::wkb::GpkgWkb;
use geozero::{CoordDimensions, ToGeo, ToWkb};

use crate::error::{HfError, Result};

const MAGIC: &[u8; 2] = b"GP";
const HEADER_LEN: usize = 8;
const FLAG_EMPTY: u8 = 0b0001_0000;

fn flags(blob: &[u8]) -> Result<u8> {
    if blob.len() < HEADER_LEN || &blob[..2] != MAGIC {
        return Err(HfError::Geometry("not a GeoPackage geometry blob".to_string()));
    }
    Ok(blob[3])
}

/// Decode a geometry blob. Empty geometries decode to `None`.
pub fn decode(blob: &[u8]) -> Result<Option<Geometry<f64>>> {
    if flags(blob)? & FLAG_EMPTY != 0 {
        return Ok(None);
    }
    let geometry = GpkgWkb(blob)
        .to_geo()
        .map_err(|err| HfError::Geometry(err.to_string()))?;
    Ok(Some(geometry))
}

/// Encode `geometry` as a little-endian 2D blob with an XY envelope.
pub fn encode(geometry: &Geometry<f64>, srs_id: i32) -> Result<Vec<u8>> {
    let rect = geometry.bounding_rect();
    let envelope = rect.map_or_else(Vec::new, |r| vec![r.min().x, r.max().x, r.min().y, r.max().y]);
    let mut blob = geometry
        .to_gpkg_wkb(CoordDimensions::xy(), Some(srs_id), envelope)
        .map_err(|err| HfError::Geometry(err.to_string()))?;
    if rect.is_none() {
        blob[3] |= FLAG_EMPTY;
    }
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point, polygon, MultiPolygon};

    use super::*;

    fn srs_id(blob: &[u8]) -> i32 {
        let bytes = [blob[4], blob[5], blob[6], blob[7]];
        if blob[3] & 1 == 1 {
            i32::from_le_bytes(bytes)
        } else {
            i32::from_be_bytes(bytes)
        }
    }

    #[test]
    fn encode_writes_header_and_envelope() {
        let geometry = Geometry::LineString(line_string![(x: 1.0, y: 2.0), (x: 3.0, y: -4.0)]);
        let blob = encode(&geometry, 5070).unwrap();

        assert_eq!(&blob[..2], b"GP");
        assert_eq!(blob[2], 0);
        assert_eq!((blob[3] >> 1) & 0b111, 1, "xy envelope");
        assert_eq!(blob[3] & FLAG_EMPTY, 0);
        assert_eq!(srs_id(&blob), 5070);
        let min_x = f64::from_le_bytes(blob[8..16].try_into().unwrap());
        let max_y = f64::from_le_bytes(blob[32..40].try_into().unwrap());
        assert!((min_x - 1.0).abs() < f64::EPSILON);
        assert!((max_y - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_restores_polygon() {
        let geometry = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ]);
        let decoded = decode(&encode(&geometry, 4326).unwrap()).unwrap();
        assert_eq!(decoded, Some(geometry));
    }

    #[test]
    fn empty_geometry_sets_flag_and_decodes_to_none() {
        let geometry = Geometry::MultiPolygon(MultiPolygon::<f64>::new(Vec::new()));
        let blob = encode(&geometry, 4326).unwrap();
        assert_ne!(blob[3] & FLAG_EMPTY, 0);
        assert_eq!(decode(&blob).unwrap(), None);
    }

    #[test]
    fn blob_without_envelope_decodes() {
        let point = Geometry::Point(point!(x: -93.5, y: 44.9));
        let blob = point
            .to_gpkg_wkb(CoordDimensions::xy(), Some(4326), Vec::new())
            .unwrap();
        assert_eq!((blob[3] >> 1) & 0b111, 0);
        assert_eq!(decode(&blob).unwrap(), Some(point));
    }

    #[test]
    fn rejects_non_geopackage_blob() {
        assert!(matches!(decode(b"XX\0\x01\0\0\0\0"), Err(HfError::Geometry(_))));
        assert!(decode(b"GP").is_err());
    }

    #[test]
    fn rejects_truncated_envelope() {
        let blob = [b'G', b'P', 0, 0b0000_0011, 0, 0, 0, 0, 1, 2, 3];
        assert!(matches!(decode(&blob), Err(HfError::Geometry(_))));
    }
}
