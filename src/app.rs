//! Shared state for CLI commands.

use std::path::Path;

use crate::cli::Cli;
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::gpkg::GeoPackage;

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub format: OutputFormat,
}

impl AppContext {
    /// Load configuration relative to the working directory and resolve the output format.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &cwd)?;
        Ok(Self::new(config, cli))
    }

    #[must_use]
    pub fn new(config: Config, cli: &Cli) -> Self {
        let format = if cli.json {
            OutputFormat::Json
        } else {
            config.output.format
        };
        Self { config, format }
    }

    #[must_use]
    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Open a GeoPackage read-only with the configured table filter.
    pub fn open_source(&self, path: &Path) -> Result<GeoPackage> {
        let ignore = self.config.geopackage.ignore_regex()?;
        Ok(GeoPackage::open_read_only(path)?.with_ignore_pattern(ignore))
    }
}
