use std::path::Path;

use crate::cli::context::CliContext;
use crate::Config;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use tracing::info;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Print the configuration file (defaults when it does not exist)
    Show,

    /// Change one setting, e.g. `config set port 8080`
    Set {
        /// Setting name (`port`, `data_file`, `uploads_dir`, ...)
        key: String,

        /// New value; parsed as JSON when possible, otherwise kept as text
        value: String,
    },

    /// Print one setting
    Get {
        /// Setting name
        key: String,
    },

    /// Overwrite the configuration file with the defaults
    Reset,

    /// Check the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            let config = read_settings(path).await?;
            println!("# {}", path.display());
            print!("{}", serde_yaml::to_string(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let current = read_settings(path).await?;
            let updated = with_setting(&current, &key, &value)?;
            write_settings(path, &updated).await?;
            info!(key = %key, path = %path.display(), "configuration updated");
            println!("{} = {}", key, value);
        }
        ConfigAction::Get { key } => {
            let config = read_settings(path).await?;
            print!("{}", serde_yaml::to_string(&setting(&config, &key)?)?);
        }
        ConfigAction::Reset => {
            write_settings(path, &Config::default()).await?;
            println!("Defaults written to {}", path.display());
        }
        ConfigAction::Validate => {
            if !fs::try_exists(path).await? {
                println!("{} does not exist; defaults apply", path.display());
                return Ok(());
            }
            read_settings(path)
                .await?
                .validate()
                .with_context(|| format!("validating {}", path.display()))?;
            println!("{} is valid", path.display());
        }
    }

    Ok(())
}

async fn read_settings(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await? {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn write_settings(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, serde_yaml::to_string(config)?)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

fn fields(config: &Config) -> Result<Map<String, JsonValue>> {
    match serde_json::to_value(config)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(anyhow!("configuration serialized as {other}, expected an object")),
    }
}

fn unknown_key(key: &str, known: &Map<String, JsonValue>) -> anyhow::Error {
    let names: Vec<&str> = known.keys().map(String::as_str).collect();
    anyhow!("unknown setting {key:?}; expected one of: {}", names.join(", "))
}

fn setting(config: &Config, key: &str) -> Result<JsonValue> {
    let known = fields(config)?;
    known
        .get(key)
        .cloned()
        .ok_or_else(|| unknown_key(key, &known))
}

/// Returns `config` with `key` replaced. Only existing top-level settings
/// are accepted and the result must still validate.
fn with_setting(config: &Config, key: &str, raw: &str) -> Result<Config> {
    let mut known = fields(config)?;
    if !known.contains_key(key) {
        return Err(unknown_key(key, &known));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    known.insert(key.to_string(), value);

    let updated: Config = serde_json::from_value(JsonValue::Object(known))
        .with_context(|| format!("{key} does not accept {raw:?}"))?;
    updated
        .validate()
        .with_context(|| format!("{key} = {raw:?} makes the configuration invalid"))?;
    Ok(updated)
}
