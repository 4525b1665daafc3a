use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// JSON document holding the whole recipe collection.
    pub data_file: PathBuf,
    pub uploads_dir: PathBuf,
    /// URL prefix under which uploaded images are served.
    pub uploads_url_prefix: String,
    /// Front-end assets (`index.html`, `recette.html`, scripts).
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            data_file: PathBuf::from("recettes.json"),
            uploads_dir: PathBuf::from("public/uploads"),
            uploads_url_prefix: "/uploads".to_string(),
            static_dir: PathBuf::from("public"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.data_file.as_os_str().is_empty() {
            bail!("data_file must not be empty");
        }
        if self.uploads_dir.as_os_str().is_empty() {
            bail!("uploads_dir must not be empty");
        }
        let prefix = self.uploads_url_prefix.trim().trim_end_matches('/');
        if prefix.is_empty() || !prefix.starts_with('/') || prefix.starts_with("/api") {
            bail!(
                "uploads_url_prefix must be an absolute path outside /api, got {:?}",
                self.uploads_url_prefix
            );
        }
        if self.max_upload_bytes == 0 {
            bail!("max_upload_bytes must be greater than zero");
        }
        Ok(())
    }
}
