use super::fixture::{column_values, CliFixture};
use crate::{assert_command_success, assert_stderr_contains};

#[test]
fn test_layers_lists_kinds_and_counts() {
    let fixture = CliFixture::new("test_layers_lists_kinds_and_counts", 3);
    let output = fixture.run_hf(&["--json", "layers", fixture.source()]);
    assert_command_success!(output);

    let json = output.json();
    assert_eq!(json["status"], "ok");
    let layers = json["data"].as_array().unwrap();
    assert_eq!(layers.len(), 6);
    let divides = layers.iter().find(|l| l["name"] == "divides").unwrap();
    assert_eq!(divides["kind"], "features");
    assert_eq!(divides["crs"], "EPSG:4326");
    assert_eq!(divides["rows"], 3);
    let network = layers.iter().find(|l| l["name"] == "network").unwrap();
    assert_eq!(network["kind"], "attributes");
    assert!(network.get("crs").is_none());
}

#[test]
fn test_mask_bbox_writes_output() {
    let fixture = CliFixture::new("test_mask_bbox_writes_output", 4);
    let out = fixture.output("aoi.gpkg");
    let bbox = fixture.hydrofabric.cells_bbox_arg(1, 1);
    let output = fixture.run_hf(&[
        "--json",
        "mask",
        fixture.source(),
        "--bbox",
        &bbox,
        "-o",
        out.to_str().unwrap(),
    ]);
    assert_command_success!(output);

    let json = output.json();
    assert_eq!(json["data"]["surviving_ids"], 3);
    assert_eq!(json["data"]["mask_crs"], "EPSG:4326");
    assert!(json["warnings"][0].as_str().unwrap().contains("lakes"));
    assert_eq!(column_values(&out, "network", "id"), ["wb-1"]);
}

#[test]
fn test_mask_crs_flag_selects_projected_mask() {
    let fixture = CliFixture::albers("test_mask_crs_flag_selects_projected_mask", 3);
    let bbox = fixture.hydrofabric.cells_bbox_arg(0, 1);
    let output = fixture.run_hf(&[
        "--json",
        "mask",
        fixture.source(),
        "--bbox",
        &bbox,
        "--mask-crs",
        "EPSG:5070",
        "--no-parallel",
    ]);
    assert_command_success!(output);

    let json = output.json();
    let divides = json["data"]["layers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["name"] == "divides")
        .unwrap();
    assert_eq!(divides["rows_kept"], 2);
    assert!(divides.get("reprojected_to").is_none());
}

#[test]
fn test_mask_human_output() {
    let fixture = CliFixture::new("test_mask_human_output", 2);
    let bbox = fixture.hydrofabric.cells_bbox_arg(0, 0);
    let output = fixture.run_hf(&["mask", fixture.source(), "--bbox", &bbox, "--passthrough", "lakes"]);
    assert_command_success!(output);
    assert!(output.stdout.contains("not written (use -o)"));
    assert!(output.stdout.contains("(passthrough)"));
}

#[test]
fn test_missing_layer_source_is_an_error() {
    let fixture = CliFixture::new("test_missing_layer_source_is_an_error", 1);
    let output = fixture.run_hf(&["layers", "does-not-exist.gpkg"]);
    assert!(!output.success);
    assert_stderr_contains!(output, "Error:");
    assert_stderr_contains!(output, "Hint:");
}

#[test]
fn test_json_error_envelope() {
    let fixture = CliFixture::new("test_json_error_envelope", 1);
    let output = fixture.run_hf(&[
        "--json",
        "mask",
        fixture.source(),
        "--bbox",
        "1,1,0,0",
    ]);
    assert!(!output.success);
    let json = output.json();
    assert_eq!(json["status"]["error"]["code"], "INVALID_MASK");
    assert_eq!(json["status"]["error"]["numeric_code"], 101);
}

#[test]
fn test_project_config_sets_id_columns() {
    let fixture = CliFixture::new("test_project_config_sets_id_columns", 2);
    fixture.write_project_config("[mask]\nid_columns = [\"lake_id\"]\n");

    let output = fixture.run_hf(&["--json", "config", "mask.id_columns"]);
    assert_command_success!(output);
    assert_eq!(output.json()["data"], serde_json::json!(["lake_id"]));
}

#[test]
fn test_env_overrides_project_config() {
    let fixture = CliFixture::new("test_env_overrides_project_config", 2);
    fixture.write_project_config("[mask]\nparallel = true\n");

    let output = fixture.run_hf_with_env(&["config", "mask.parallel"], &[("HF_PARALLEL", "false")]);
    assert_command_success!(output);
    assert_eq!(output.stdout.trim(), "false");
}
