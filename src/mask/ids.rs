//! Identifier columns and the surviving-ID set.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::{Feature, FeatureId, Layer};

/// Identifier column priority used when none is configured.
pub const DEFAULT_ID_COLUMNS: [&str; 6] = ["COMID", "FEATUREID", "divide_id", "id", "ds_id", "ID"];

/// An identifier column resolved against a layer's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdColumn {
    pub name: String,
    #[serde(skip)]
    pub index: usize,
}

/// The first column from `priority` present in `layer`.
pub fn first_present(layer: &Layer, priority: &[String]) -> Option<IdColumn> {
    priority.iter().find_map(|name| {
        layer.column_index(name).map(|index| IdColumn {
            name: name.clone(),
            index,
        })
    })
}

/// Every column from `priority` present in `layer`, in priority order.
pub fn all_present(layer: &Layer, priority: &[String]) -> Vec<IdColumn> {
    priority
        .iter()
        .filter_map(|name| {
            layer.column_index(name).map(|index| IdColumn {
                name: name.clone(),
                index,
            })
        })
        .collect()
}

/// Identifier values of features that intersected the mask, across all spatial layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurvivingIds {
    ids: HashSet<FeatureId>,
}

impl SurvivingIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the non-missing values of `column` from `layer`'s features.
    #[must_use]
    pub fn from_layer(layer: &Layer, column: &IdColumn) -> Self {
        let ids = layer
            .features()
            .iter()
            .filter_map(|f| Layer::feature_id(f, column.index))
            .collect();
        Self { ids }
    }

    pub fn merge(&mut self, other: Self) {
        self.ids.extend(other.ids);
    }

    #[must_use]
    pub fn contains(&self, id: &FeatureId) -> bool {
        self.ids.contains(id)
    }

    /// Whether any of `columns` holds a surviving identifier for `feature`.
    #[must_use]
    pub fn references(&self, feature: &Feature, columns: &[IdColumn]) -> bool {
        columns
            .iter()
            .filter_map(|c| Layer::feature_id(feature, c.index))
            .any(|id| self.ids.contains(&id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<FeatureId> for SurvivingIds {
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
