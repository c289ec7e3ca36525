//! hf layers - List the layers of a GeoPackage

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_human, emit_json, json_ok, HumanLayout};
use crate::error::Result;
use crate::model::{LayerKind, LayerSource};

#[derive(Args, Debug)]
pub struct LayersArgs {
    /// GeoPackage to inspect
    pub source: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerRow {
    pub name: String,
    pub kind: LayerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    pub rows: usize,
}

pub fn run(ctx: &AppContext, args: &LayersArgs) -> Result<()> {
    let gpkg = ctx.open_source(&args.source)?;
    let mut rows = Vec::new();
    for info in gpkg.layers()? {
        rows.push(LayerRow {
            rows: gpkg.row_count(&info.name)?,
            kind: info.kind(),
            geometry_type: info.geometry.as_ref().map(|g| g.geometry_type.clone()),
            crs: info.geometry.as_ref().map(|g| {
                g.srs.crs().map_or_else(|| format!("undefined ({})", g.srs.srs_id), |crs| crs.to_string())
            }),
            name: info.name,
        });
    }

    if ctx.json() {
        emit_json(&json_ok(&rows))
    } else {
        emit_human(layout(&args.source, &rows));
        Ok(())
    }
}

fn layout(source: &std::path::Path, rows: &[LayerRow]) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&format!("Layers in {}", source.display()));
    if rows.is_empty() {
        layout.push_line("No layers found");
        return layout;
    }
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(5);
    layout.push_line(format!(
        "{:width$}  {:10}  {:18}  {:12}  {:>8}",
        "LAYER", "KIND", "GEOMETRY", "CRS", "ROWS"
    ));
    for row in rows {
        layout.push_line(format!(
            "{:width$}  {:10}  {:18}  {:12}  {:>8}",
            row.name,
            row.kind.as_str(),
            row.geometry_type.as_deref().unwrap_or("-"),
            row.crs.as_deref().unwrap_or("-"),
            row.rows
        ));
    }
    layout
}
