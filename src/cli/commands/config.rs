//! hf config - Show the effective configuration

use clap::Args;

use crate::app::AppContext;
use crate::cli::output::{emit_json, json_ok};
use crate::config::Config;
use crate::error::{HfError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Dotted key to show, e.g. mask.id_columns (default: everything)
    pub key: Option<String>,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    match &args.key {
        Some(key) => get_key(ctx, key),
        None => emit_config(ctx),
    }
}

fn emit_config(ctx: &AppContext) -> Result<()> {
    if ctx.json() {
        return emit_json(&json_ok(&ctx.config));
    }

    let rendered = toml::to_string_pretty(&ctx.config)
        .map_err(|err| HfError::Config(format!("render config: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn get_key(ctx: &AppContext, key: &str) -> Result<()> {
    let value = config_value_at(&ctx.config, key)?;
    if ctx.json() {
        return emit_json(&json_ok(&value));
    }
    println!("{}", format_value(&value));
    Ok(())
}

fn config_value_at(config: &Config, key: &str) -> Result<toml::Value> {
    let doc = toml::Value::try_from(config)
        .map_err(|err| HfError::Config(format!("serialize config: {err}")))?;
    let mut current = &doc;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| HfError::Config(format!("unknown key: {key}")))?;
    }
    Ok(current.clone())
}

fn format_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}
