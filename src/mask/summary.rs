//! Per-run report of what the masker kept.

use serde::Serialize;

use crate::model::LayerKind;
use crate::spatial::Crs;

/// Non-fatal conditions noticed while masking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskWarning {
    /// The layer has none of the identifier columns; it contributes or keeps no IDs.
    IdentifierColumnMissing { layer: String },
    /// The layer's SRS is undefined; the mask was applied without reprojection.
    UndefinedCrs { layer: String },
}

impl std::fmt::Display for MaskWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdentifierColumnMissing { layer } => {
                write!(f, "{layer}: no identifier column present")
            }
            Self::UndefinedCrs { layer } => {
                write!(f, "{layer}: undefined CRS, mask applied as-is")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerReport {
    pub name: String,
    pub kind: LayerKind,
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Identifier column used for IDs (spatial) or matched against (attributes).
    pub id_columns: Vec<String>,
    /// CRS the mask was reprojected into, if it differed from the mask's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprojected_to: Option<Crs>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub passthrough: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaskSummary {
    pub mask_crs: Option<Crs>,
    pub layers: Vec<LayerReport>,
    pub surviving_ids: usize,
    pub warnings: Vec<MaskWarning>,
}

impl MaskSummary {
    #[must_use]
    pub fn layer(&self, name: &str) -> Option<&LayerReport> {
        self.layers.iter().find(|l| l.name == name)
    }

    #[must_use]
    pub fn rows_kept(&self) -> usize {
        self.layers.iter().map(|l| l.rows_kept).sum()
    }

    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.layers.iter().map(|l| l.rows_read).sum()
    }
}
