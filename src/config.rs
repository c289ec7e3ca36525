use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HfError, Result};
use crate::gpkg::DEFAULT_IGNORE_PATTERN;
use crate::mask::DEFAULT_ID_COLUMNS;

/// Project-level config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "hydrofabric.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mask: MaskConfig,
    #[serde(default)]
    pub geopackage: GeoPackageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load defaults, then the global and project files (or only `explicit_path`), then env overrides.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let global = dirs::config_dir().map(|dir| dir.join("hydrofabric/config.toml"));
        Self::load_with(explicit_path, global.as_deref(), project_root, |key| {
            std::env::var(key).ok()
        })
    }

    fn load_with(
        explicit_path: Option<&Path>,
        global_path: Option<&Path>,
        project_root: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| env("HF_CONFIG").map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                HfError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(path) = global_path {
                if let Some(global) = Self::load_patch(path)? {
                    config.merge_patch(global);
                }
            }
            if let Some(project) = Self::load_patch(&project_root.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides(&env)?;
        config.validate()?;

        Ok(config)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| HfError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| HfError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.mask {
            self.mask.merge(patch);
        }
        if let Some(patch) = patch.geopackage {
            self.geopackage.merge(patch);
        }
        if let Some(patch) = patch.output {
            self.output.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(values) = env_list(env, "HF_ID_COLUMNS") {
            self.mask.id_columns = values;
        }
        if let Some(value) = env_bool(env, "HF_PARALLEL")? {
            self.mask.parallel = value;
        }
        if let Some(values) = env_list(env, "HF_PASSTHROUGH_LAYERS") {
            self.mask.passthrough_layers = merge_unique(values, &self.mask.passthrough_layers);
        }
        if let Some(value) = env("HF_IGNORE_PATTERN") {
            self.geopackage.ignore_pattern = value;
        }
        if let Some(value) = env("HF_OUTPUT_FORMAT") {
            self.output.format = OutputFormat::from_str(&value, true)
                .map_err(|_| HfError::Config(format!("invalid HF_OUTPUT_FORMAT value {value}")))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.mask.id_columns.is_empty() {
            return Err(HfError::Config(
                "mask.id_columns must name at least one column".to_string(),
            ));
        }
        self.geopackage.ignore_regex()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Identifier columns in priority order; a patch replaces the list.
    #[serde(default)]
    pub id_columns: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub passthrough_layers: Vec<String>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            id_columns: DEFAULT_ID_COLUMNS.iter().map(ToString::to_string).collect(),
            parallel: true,
            passthrough_layers: Vec::new(),
        }
    }
}

impl MaskConfig {
    fn merge(&mut self, patch: MaskPatch) {
        if let Some(values) = patch.id_columns {
            self.id_columns = values;
        }
        if let Some(value) = patch.parallel {
            self.parallel = value;
        }
        if let Some(values) = patch.passthrough_layers {
            self.passthrough_layers = merge_unique(values, &self.passthrough_layers);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPackageConfig {
    /// Tables whose names match are never treated as layers.
    #[serde(default)]
    pub ignore_pattern: String,
}

impl Default for GeoPackageConfig {
    fn default() -> Self {
        Self {
            ignore_pattern: DEFAULT_IGNORE_PATTERN.to_string(),
        }
    }
}

impl GeoPackageConfig {
    fn merge(&mut self, patch: GeoPackagePatch) {
        if let Some(value) = patch.ignore_pattern {
            self.ignore_pattern = value;
        }
    }

    pub fn ignore_regex(&self) -> Result<Regex> {
        Regex::new(&self.ignore_pattern).map_err(|err| {
            HfError::Config(format!(
                "invalid geopackage.ignore_pattern {:?}: {err}",
                self.ignore_pattern
            ))
        })
    }
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl OutputConfig {
    fn merge(&mut self, patch: OutputPatch) {
        if let Some(value) = patch.format {
            self.format = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub mask: Option<MaskPatch>,
    pub geopackage: Option<GeoPackagePatch>,
    pub output: Option<OutputPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MaskPatch {
    pub id_columns: Option<Vec<String>>,
    pub parallel: Option<bool>,
    pub passthrough_layers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct GeoPackagePatch {
    pub ignore_pattern: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OutputPatch {
    pub format: Option<OutputFormat>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn env_bool(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    match env(key) {
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(HfError::Config(format!("invalid {key} value {value}"))),
        },
        None => Ok(None),
    }
}

fn env_list(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Vec<String>> {
    env(key).map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect()
    })
}
