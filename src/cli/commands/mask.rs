//! hf mask - Clip a hydrofabric to a mask polygon

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_human, emit_json, json_ok, HumanLayout};
use crate::error::{HfError, Result};
use crate::mask::{MaskOptions, MaskOutput, MaskSummary, Masker};
use crate::spatial::{Crs, Mask};

#[derive(Args, Debug)]
pub struct MaskArgs {
    /// Source hydrofabric GeoPackage
    pub source: PathBuf,

    /// Mask rectangle in the mask CRS (EPSG:4326 unless --mask-crs is given)
    #[arg(
        long,
        value_name = "XMIN,YMIN,XMAX,YMAX",
        value_parser = parse_bbox,
        allow_hyphen_values = true,
        conflicts_with = "mask_gpkg",
        required_unless_present = "mask_gpkg"
    )]
    pub bbox: Option<[f64; 4]>,

    /// GeoPackage holding the mask polygons
    #[arg(long, value_name = "PATH")]
    pub mask_gpkg: Option<PathBuf>,

    /// Layer of --mask-gpkg to use (default: first spatial layer)
    #[arg(long, value_name = "NAME", requires = "mask_gpkg")]
    pub mask_layer: Option<String>,

    /// CRS of the mask, e.g. EPSG:5070; overrides the mask layer's own CRS
    #[arg(long, value_name = "AUTH:CODE")]
    pub mask_crs: Option<Crs>,

    /// Write the masked layers to this GeoPackage (default: report only)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Identifier column, repeatable; replaces the configured priority list
    #[arg(long = "id-column", value_name = "NAME")]
    pub id_columns: Vec<String>,

    /// Attribute layer to copy without filtering, repeatable
    #[arg(long, value_name = "LAYER")]
    pub passthrough: Vec<String>,

    /// Filter layers on a single thread
    #[arg(long)]
    pub no_parallel: bool,
}

fn parse_bbox(raw: &str) -> std::result::Result<[f64; 4], String> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid number in bbox: {err}"))?;
    <[f64; 4]>::try_from(values)
        .map_err(|values| format!("bbox needs 4 values, got {}", values.len()))
}

#[derive(Debug, Serialize)]
struct MaskReport<'a> {
    source: &'a std::path::Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a std::path::Path>,
    #[serde(flatten)]
    summary: &'a MaskSummary,
}

pub fn run(ctx: &AppContext, args: &MaskArgs) -> Result<()> {
    let mask = build_mask(args)?;
    let options = options(ctx, args);
    let source = ctx.open_source(&args.source)?;

    let output = Masker::new(options).mask_geopackage(&source, &mask, args.output.as_deref())?;
    let (written, summary) = match &output {
        MaskOutput::Written { path, summary } => (Some(path.as_path()), summary),
        MaskOutput::InMemory { summary, .. } => (None, summary),
    };

    if ctx.json() {
        let report = MaskReport {
            source: &args.source,
            output: written,
            summary,
        };
        let warnings = summary.warnings.iter().map(ToString::to_string).collect();
        emit_json(&json_ok(report).with_warnings(warnings))
    } else {
        emit_human(layout(&args.source, written, summary));
        Ok(())
    }
}

fn build_mask(args: &MaskArgs) -> Result<Mask> {
    if let Some([xmin, ymin, xmax, ymax]) = args.bbox {
        let crs = args.mask_crs.clone().unwrap_or_else(|| Crs::epsg(4326));
        return Mask::from_bbox(xmin, ymin, xmax, ymax, Some(crs));
    }
    let path = args
        .mask_gpkg
        .as_deref()
        .ok_or_else(|| HfError::InvalidArgument("one of --bbox or --mask-gpkg is required".into()))?;
    let mask = Mask::from_geopackage(path, args.mask_layer.as_deref())?;
    Ok(match &args.mask_crs {
        Some(crs) => Mask::new(mask.geometry().clone(), Some(crs.clone())),
        None => mask,
    })
}

fn options(ctx: &AppContext, args: &MaskArgs) -> MaskOptions {
    let mut options = MaskOptions::from(&ctx.config.mask);
    if !args.id_columns.is_empty() {
        options.id_columns.clone_from(&args.id_columns);
    }
    for layer in &args.passthrough {
        if !options.passthrough_layers.contains(layer) {
            options.passthrough_layers.push(layer.clone());
        }
    }
    if args.no_parallel {
        options.parallel = false;
    }
    options
}

fn layout(source: &std::path::Path, output: Option<&std::path::Path>, summary: &MaskSummary) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title(&format!("Masked {}", source.display()));
    layout.kv(
        "Mask CRS",
        &summary.mask_crs.as_ref().map_or_else(|| "-".to_string(), ToString::to_string),
    );
    layout.kv("Surviving IDs", &summary.surviving_ids.to_string());
    layout.kv(
        "Rows kept",
        &format!("{} of {}", summary.rows_kept(), summary.rows_read()),
    );
    layout.kv(
        "Output",
        &output.map_or_else(|| "not written (use -o)".to_string(), |p| p.display().to_string()),
    );
    layout.blank();
    layout.section("Layers");
    for report in &summary.layers {
        let mut line = format!(
            "{:<28} {:<10} {:>8} / {:<8}",
            report.name,
            report.kind.as_str(),
            report.rows_kept,
            report.rows_read
        );
        if !report.id_columns.is_empty() {
            line.push_str(&format!(" by {}", report.id_columns.join(", ")));
        }
        if let Some(crs) = &report.reprojected_to {
            line.push_str(&format!(" (mask reprojected to {crs})"));
        }
        if report.passthrough {
            line.push_str(" (passthrough)");
        }
        layout.push_line(line);
    }
    if !summary.warnings.is_empty() {
        layout.blank();
        layout.section("Warnings");
        for warning in &summary.warnings {
            layout.bullet(&warning.to_string());
        }
    }
    layout
}
