//! Hydrofabric masking.
//!
//! A run has two phases. Phase 1 filters every spatial layer to the features
//! intersecting the mask and collects their identifiers from the first
//! identifier column present. Phase 2 starts only once that set is complete and
//! keeps each attribute row that references a surviving identifier through any
//! identifier column.

pub mod ids;
pub mod summary;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::MaskConfig;
use crate::error::{HfError, Result};
use crate::gpkg::GeoPackage;
use crate::model::{Layer, LayerInfo, LayerKind, LayerSet, LayerSink, LayerSource};
use crate::spatial::{BuiltinTransform, CoordinateTransform, Crs, Mask, PreparedMask};

pub use ids::{IdColumn, SurvivingIds, DEFAULT_ID_COLUMNS};
pub use summary::{LayerReport, MaskSummary, MaskWarning};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOptions {
    /// Identifier column names in priority order.
    pub id_columns: Vec<String>,
    /// Filter spatial layers on the rayon pool when the result stays in memory.
    pub parallel: bool,
    /// Attribute layers copied without filtering.
    pub passthrough_layers: Vec<String>,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            id_columns: DEFAULT_ID_COLUMNS.iter().map(ToString::to_string).collect(),
            parallel: true,
            passthrough_layers: Vec::new(),
        }
    }
}

impl From<&MaskConfig> for MaskOptions {
    fn from(config: &MaskConfig) -> Self {
        Self {
            id_columns: config.id_columns.clone(),
            parallel: config.parallel,
            passthrough_layers: config.passthrough_layers.clone(),
        }
    }
}

/// Result of [`Masker::mask_geopackage`].
#[derive(Debug)]
pub enum MaskOutput {
    Written { path: PathBuf, summary: MaskSummary },
    InMemory { layers: LayerSet, summary: MaskSummary },
}

impl MaskOutput {
    #[must_use]
    pub const fn summary(&self) -> &MaskSummary {
        match self {
            Self::Written { summary, .. } | Self::InMemory { summary, .. } => summary,
        }
    }
}

/// Spatial layer after phase 1, before it is handed to the sink.
struct Filtered {
    layer: Layer,
    report: LayerReport,
    ids: SurvivingIds,
    warning: Option<MaskWarning>,
}

impl Filtered {
    /// Fold this layer's report and identifiers into the run totals.
    fn absorb(self, summary: &mut MaskSummary, surviving: &mut SurvivingIds) -> Layer {
        surviving.merge(self.ids);
        summary.warnings.extend(self.warning);
        summary.layers.push(self.report);
        self.layer
    }
}

pub struct Masker {
    options: MaskOptions,
    transform: Box<dyn CoordinateTransform>,
}

impl std::fmt::Debug for Masker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Masker")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Masker {
    fn default() -> Self {
        Self::new(MaskOptions::default())
    }
}

impl Masker {
    #[must_use]
    pub fn new(options: MaskOptions) -> Self {
        Self {
            options,
            transform: Box::new(BuiltinTransform),
        }
    }

    /// Use `transform` for mask reprojection instead of the built-in projections.
    #[must_use]
    pub fn with_transform(mut self, transform: Box<dyn CoordinateTransform>) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub const fn options(&self) -> &MaskOptions {
        &self.options
    }

    /// Mask `source` into `sink`.
    ///
    /// The mask is validated before anything is read or written.
    pub fn run(
        &self,
        source: &dyn LayerSource,
        mask: &Mask,
        sink: &mut dyn LayerSink,
    ) -> Result<MaskSummary> {
        let mask = mask.prepare()?;
        self.run_prepared(source, &mask, sink)
    }

    /// Mask `source` into a new [`LayerSet`].
    pub fn run_in_memory(&self, source: &dyn LayerSource, mask: &Mask) -> Result<(LayerSet, MaskSummary)> {
        let mut layers = LayerSet::new();
        let summary = self.run(source, mask, &mut layers)?;
        Ok((layers, summary))
    }

    /// Mask a GeoPackage, writing to `destination` when given.
    ///
    /// Existing layers in `destination` that the source does not have are left alone.
    pub fn mask_geopackage(
        &self,
        source: &GeoPackage,
        mask: &Mask,
        destination: Option<&Path>,
    ) -> Result<MaskOutput> {
        let prepared = mask.prepare()?;
        let Some(path) = destination else {
            let mut layers = LayerSet::new();
            let summary = self.run_prepared(source, &prepared, &mut layers)?;
            return Ok(MaskOutput::InMemory { layers, summary });
        };

        if same_file(source.path(), path) {
            return Err(HfError::InvalidArgument(format!(
                "destination {} is the source GeoPackage",
                path.display()
            )));
        }
        let mut sink = GeoPackage::create(path)?;
        let summary = self.run_prepared(source, &prepared, &mut sink)?;
        Ok(MaskOutput::Written {
            path: path.to_path_buf(),
            summary,
        })
    }

    fn run_prepared(
        &self,
        source: &dyn LayerSource,
        mask: &PreparedMask,
        sink: &mut dyn LayerSink,
    ) -> Result<MaskSummary> {
        let infos = source.layers()?;
        let (spatial, attributes): (Vec<LayerInfo>, Vec<LayerInfo>) =
            infos.into_iter().partition(LayerInfo::is_spatial);
        info!(
            spatial = spatial.len(),
            attributes = attributes.len(),
            mask_crs = %mask.crs(),
            "masking hydrofabric"
        );

        let masks = self.masks_for(mask, &spatial)?;
        let mut summary = MaskSummary {
            mask_crs: Some(mask.crs().clone()),
            ..MaskSummary::default()
        };
        let mut surviving = SurvivingIds::new();

        if self.options.parallel && !sink.is_persistent() {
            let layers = spatial
                .iter()
                .map(|info| source.read_layer(&info.name))
                .collect::<Result<Vec<_>>>()?;
            let filtered: Vec<Filtered> = layers
                .into_par_iter()
                .map(|layer| self.filter_spatial(layer, mask, &masks))
                .collect();
            for f in filtered {
                sink.write_layer(f.absorb(&mut summary, &mut surviving))?;
            }
        } else {
            for info in &spatial {
                let layer = source.read_layer(&info.name)?;
                let f = self.filter_spatial(layer, mask, &masks);
                sink.write_layer(f.absorb(&mut summary, &mut surviving))?;
            }
        }

        summary.surviving_ids = surviving.len();
        info!(surviving_ids = surviving.len(), "spatial filtering complete");

        let passthrough: HashSet<&str> = self
            .options
            .passthrough_layers
            .iter()
            .map(String::as_str)
            .collect();
        for info in &attributes {
            let layer = source.read_layer(&info.name)?;
            let (layer, report, warning) =
                self.filter_attributes(layer, &surviving, passthrough.contains(info.name.as_str()));
            summary.warnings.extend(warning);
            summary.layers.push(report);
            sink.write_layer(layer)?;
        }

        Ok(summary)
    }

    /// The canonical mask reprojected once per distinct layer CRS.
    fn masks_for(&self, mask: &PreparedMask, spatial: &[LayerInfo]) -> Result<HashMap<Crs, PreparedMask>> {
        let targets: BTreeSet<Crs> = spatial
            .iter()
            .filter_map(LayerInfo::crs)
            .filter(|crs| crs != mask.crs())
            .collect();
        let mut masks = HashMap::new();
        for crs in targets {
            debug!(from = %mask.crs(), to = %crs, "reprojecting mask");
            let projected = mask.reproject(&crs, &*self.transform)?;
            masks.insert(crs, projected);
        }
        Ok(masks)
    }

    fn filter_spatial(
        &self,
        mut layer: Layer,
        mask: &PreparedMask,
        masks: &HashMap<Crs, PreparedMask>,
    ) -> Filtered {
        let name = layer.name().to_string();
        let rows_read = layer.len();
        let mut warning = None;

        let (mask, reprojected_to) = match layer.crs() {
            Some(crs) => match masks.get(&crs) {
                Some(projected) => (projected, Some(crs)),
                None => (mask, None),
            },
            None => {
                warn!(layer = %name, "layer has an undefined CRS; applying mask without reprojection");
                warning = Some(MaskWarning::UndefinedCrs { layer: name.clone() });
                (mask, None)
            }
        };

        layer.retain(|f| f.geometry.as_ref().is_some_and(|g| mask.intersects(g)));

        let id_column = ids::first_present(&layer, &self.options.id_columns);
        let ids = match &id_column {
            Some(column) => SurvivingIds::from_layer(&layer, column),
            None => {
                warn!(layer = %name, "no identifier column; layer contributes no identifiers");
                warning = Some(MaskWarning::IdentifierColumnMissing { layer: name.clone() });
                SurvivingIds::new()
            }
        };

        info!(
            layer = %name,
            read = rows_read,
            kept = layer.len(),
            id_column = id_column.as_ref().map_or("-", |c| c.name.as_str()),
            "filtered spatial layer"
        );

        Filtered {
            report: LayerReport {
                name,
                kind: LayerKind::Features,
                rows_read,
                rows_kept: layer.len(),
                id_columns: id_column.into_iter().map(|c| c.name).collect(),
                reprojected_to,
                passthrough: false,
            },
            layer,
            ids,
            warning,
        }
    }

    fn filter_attributes(
        &self,
        mut layer: Layer,
        surviving: &SurvivingIds,
        passthrough: bool,
    ) -> (Layer, LayerReport, Option<MaskWarning>) {
        let rows_read = layer.len();
        let columns = ids::all_present(&layer, &self.options.id_columns);
        let mut warning = None;

        if passthrough {
            debug!(layer = layer.name(), "copying passthrough layer unfiltered");
        } else {
            if columns.is_empty() {
                warn!(layer = layer.name(), "no identifier column; no rows can match");
                warning = Some(MaskWarning::IdentifierColumnMissing {
                    layer: layer.name().to_string(),
                });
            }
            layer.retain(|f| surviving.references(f, &columns));
        }

        info!(layer = layer.name(), read = rows_read, kept = layer.len(), "filtered attribute layer");
        let report = LayerReport {
            name: layer.name().to_string(),
            kind: LayerKind::Attributes,
            rows_read,
            rows_kept: layer.len(),
            id_columns: columns.into_iter().map(|c| c.name).collect(),
            reprojected_to: None,
            passthrough,
        };
        (layer, report, warning)
    }
}

/// Mask the GeoPackage at `source` with default table filtering.
pub fn mask_hydrofabric(
    source: &Path,
    mask: &Mask,
    destination: Option<&Path>,
    options: MaskOptions,
) -> Result<MaskOutput> {
    mask.prepare()?;
    let source = GeoPackage::open_read_only(source)?;
    Masker::new(options).mask_geopackage(&source, mask, destination)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
