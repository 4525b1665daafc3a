use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::Config;

pub const DATA_FILE_ENV: &str = "RECETTES_DATA_FILE";
pub const UPLOADS_DIR_ENV: &str = "RECETTES_UPLOADS_DIR";
pub const PORT_ENV: &str = "RECETTES_PORT";

/// Outcome of reading `config/local.env`. The file is read before the
/// subscriber exists (it may set `RUST_LOG`), so the report is logged later.
#[derive(Debug)]
pub enum LocalEnv {
    Absent,
    Loaded {
        path: PathBuf,
        applied: Vec<String>,
        invalid_lines: Vec<usize>,
    },
    Unreadable {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl LocalEnv {
    pub fn log(&self) {
        match self {
            LocalEnv::Absent => {}
            LocalEnv::Loaded {
                path,
                applied,
                invalid_lines,
            } => {
                for line in invalid_lines {
                    warn!(path = %path.display(), line, "invalid local.env entry; skipping");
                }
                info!(
                    path = %path.display(),
                    keys = ?applied,
                    "Loaded environment overrides from local.env"
                );
            }
            LocalEnv::Unreadable { path, error } => {
                warn!(path = %path.display(), ?error, "failed to read local.env overrides");
            }
        }
    }
}

pub fn load_local_env_overrides() -> LocalEnv {
    load_env_file(Path::new("config/local.env"))
}

fn load_env_file(path: &Path) -> LocalEnv {
    if !path.exists() {
        return LocalEnv::Absent;
    }
    let contents = match stdfs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            return LocalEnv::Unreadable {
                path: path.to_path_buf(),
                error,
            }
        }
    };

    let mut applied = Vec::new();
    let mut invalid_lines = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            invalid_lines.push(idx + 1);
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            invalid_lines.push(idx + 1);
            continue;
        }
        if env::var_os(key).is_some() {
            continue;
        }
        env::set_var(key, unescape_value(value.trim()));
        applied.push(key.to_string());
    }
    LocalEnv::Loaded {
        path: path.to_path_buf(),
        applied,
        invalid_lines,
    }
}

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/config.yaml > ~/.config/recettes/config.yaml
            let local_config = PathBuf::from("config/config.yaml");
            if local_config.exists() {
                local_config
            } else {
                match dirs::config_dir() {
                    Some(mut path) => {
                        path.push("recettes");
                        path.push("config.yaml");
                        path
                    }
                    None => local_config,
                }
            }
        }
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: Config::default(),
            path: config_path,
        })
    }
}

pub fn apply_env_overrides(config: &mut Config) {
    if let Some(path) = non_empty_env(DATA_FILE_ENV) {
        info!(path = %path, "Using recipe file from {}", DATA_FILE_ENV);
        config.data_file = PathBuf::from(path);
    }
    if let Some(path) = non_empty_env(UPLOADS_DIR_ENV) {
        info!(path = %path, "Using uploads directory from {}", UPLOADS_DIR_ENV);
        config.uploads_dir = PathBuf::from(path);
    }
    if let Some(raw) = non_empty_env(PORT_ENV) {
        match raw.parse::<u16>() {
            Ok(port) => config.port = port,
            Err(err) => warn!(?err, value = %raw, "invalid {} value", PORT_ENV),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn unescapes_quoted_values() {
        assert_eq!(unescape_value("\"a\\tb\""), "a\tb");
        assert_eq!(unescape_value("plain"), "plain");
    }

    #[test]
    fn env_file_reports_applied_keys_and_bad_lines() {
        let tmp = tempdir().expect("temp dir");
        let path = tmp.path().join("local.env");
        std::fs::write(
            &path,
            "# comment\nRECETTES_TEST_LOCAL_ENV=\"a b\"\nnot a pair\n=orphan\n",
        )
        .unwrap();

        match load_env_file(&path) {
            LocalEnv::Loaded {
                applied,
                invalid_lines,
                ..
            } => {
                assert_eq!(applied, vec!["RECETTES_TEST_LOCAL_ENV".to_string()]);
                assert_eq!(invalid_lines, vec![3, 4]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(env::var("RECETTES_TEST_LOCAL_ENV").unwrap(), "a b");
        assert!(matches!(
            load_env_file(&tmp.path().join("absent.env")),
            LocalEnv::Absent
        ));
    }

    #[tokio::test]
    async fn missing_config_file_yields_defaults() {
        let tmp = tempdir().expect("temp dir");
        let path = tmp.path().join("config.yaml");
        let loaded = load_config(Some(&path)).await.expect("load config");
        assert_eq!(loaded.config, Config::default());
        assert_eq!(loaded.path, path);
    }

    #[tokio::test]
    async fn reads_yaml_config_file() {
        let tmp = tempdir().expect("temp dir");
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "port: 4000\nuploads_url_prefix: /media\n")
            .await
            .unwrap();

        let loaded = load_config(Some(&path)).await.expect("load config");
        assert_eq!(loaded.config.port, 4000);
        assert_eq!(loaded.config.uploads_url_prefix, "/media");
        assert_eq!(loaded.config.data_file, PathBuf::from("recettes.json"));
    }

    #[tokio::test]
    async fn invalid_yaml_is_an_error() {
        let tmp = tempdir().expect("temp dir");
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "port: [not a port]\n").await.unwrap();
        assert!(load_config(Some(&path)).await.is_err());
    }
}
