use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use hydrofabric::spatial::Crs;
use hydrofabric::test_utils::HydrofabricFixture;

/// Assert command succeeded
#[macro_export]
macro_rules! assert_command_success {
    ($output:expr) => {
        assert!(
            $output.success,
            "Command failed with exit code {}\nstdout: {}\nstderr: {}",
            $output.exit_code, $output.stdout, $output.stderr
        );
    };
}

/// Assert stderr contains expected text
#[macro_export]
macro_rules! assert_stderr_contains {
    ($output:expr, $expected:expr) => {
        assert!(
            $output.stderr.contains($expected),
            "stderr does not contain '{}'\nActual stderr:\n{}",
            $expected,
            $output.stderr
        );
    };
}

/// A hydrofabric GeoPackage plus an isolated home directory for running `hf`.
pub struct CliFixture {
    pub hydrofabric: HydrofabricFixture,
    pub home: PathBuf,
    test_name: String,
}

impl CliFixture {
    pub fn new(test_name: &str, cells: usize) -> Self {
        Self::from_hydrofabric(test_name, HydrofabricFixture::new(cells))
    }

    pub fn albers(test_name: &str, cells: usize) -> Self {
        Self::from_hydrofabric(
            test_name,
            HydrofabricFixture::with_crs(Crs::epsg(5070), cells, 1000.0),
        )
    }

    fn from_hydrofabric(test_name: &str, hydrofabric: HydrofabricFixture) -> Self {
        let home = hydrofabric.dir().join("home");
        std::fs::create_dir_all(&home).expect("Failed to create home dir");
        println!("\n{}", "=".repeat(70));
        println!("[FIXTURE] Test: {test_name}");
        println!("[FIXTURE] GeoPackage: {:?}", hydrofabric.path);
        println!("{}", "=".repeat(70));
        Self {
            hydrofabric,
            home,
            test_name: test_name.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        self.hydrofabric.path.to_str().expect("temp path is UTF-8")
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.hydrofabric.output_path(name)
    }

    pub fn run_hf(&self, args: &[&str]) -> CommandOutput {
        self.run_hf_with_env(args, &[])
    }

    pub fn run_hf_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> CommandOutput {
        let start = Instant::now();
        println!("\n[CMD] hf {}", args.join(" "));

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hf"));
        cmd.args(args)
            .env("HOME", &self.home)
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("RUST_LOG")
            .current_dir(self.hydrofabric.dir());
        for key in [
            "HF_CONFIG",
            "HF_ID_COLUMNS",
            "HF_PARALLEL",
            "HF_PASSTHROUGH_LAYERS",
            "HF_IGNORE_PATTERN",
            "HF_OUTPUT_FORMAT",
        ] {
            cmd.env_remove(key);
        }
        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("Failed to execute hf command");
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        println!("[CMD] Exit code: {}", output.status.code().unwrap_or(-1));
        if !stdout.is_empty() {
            println!("[STDOUT]\n{stdout}");
        }
        if !stderr.is_empty() {
            println!("[STDERR]\n{stderr}");
        }

        CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
            elapsed: start.elapsed(),
        }
    }

    pub fn write_project_config(&self, content: &str) -> PathBuf {
        let path = self.hydrofabric.dir().join("hydrofabric.toml");
        std::fs::write(&path, content).expect("Failed to write config");
        path
    }
}

impl Drop for CliFixture {
    fn drop(&mut self) {
        println!("[FIXTURE] Done: {}", self.test_name);
    }
}

pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|err| panic!("stdout is not JSON ({err}):\n{}", self.stdout))
    }
}

/// Identifier values of `column` in `layer`, read straight from SQLite.
pub fn column_values(path: &Path, layer: &str, column: &str) -> Vec<String> {
    let conn = rusqlite::Connection::open(path).expect("Failed to open GeoPackage");
    let sql = format!("SELECT \"{column}\" FROM \"{layer}\" ORDER BY rowid");
    let mut stmt = conn.prepare(&sql).expect("Failed to prepare query");
    stmt.query_map([], |row| row.get::<_, String>(0))
        .expect("Failed to query layer")
        .collect::<Result<_, _>>()
        .expect("Failed to read rows")
}
