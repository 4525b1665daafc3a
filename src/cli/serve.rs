use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use recipe_store::{AttachmentStore, JsonFileStore, RecipeRepository};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::metrics;
use crate::server::{build_router, ServeState};
use crate::Config;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Port to listen on (default: config, then 3000)
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind (default: config, then 127.0.0.1)
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// JSON file holding the recipe collection
    #[arg(long = "data-file", value_name = "FILE")]
    pub data_file: Option<PathBuf>,

    /// Directory receiving uploaded images
    #[arg(long = "uploads-dir", value_name = "DIR")]
    pub uploads_dir: Option<PathBuf>,

    /// Directory with the front-end assets
    #[arg(long = "static-dir", value_name = "DIR")]
    pub static_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(path) = self.data_file {
            config.data_file = path;
        }
        if let Some(path) = self.uploads_dir {
            config.uploads_dir = path;
        }
        if let Some(path) = self.static_dir {
            config.static_dir = path;
        }
    }
}

pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    args.apply(&mut config);
    config.validate().context("invalid serve configuration")?;

    let repository = Arc::new(RecipeRepository::new(
        JsonFileStore::new(&config.data_file),
        AttachmentStore::new(&config.uploads_dir, &config.uploads_url_prefix),
    ));
    let existing = repository.list().await.len();
    info!(
        recipes = existing,
        data_file = %config.data_file.display(),
        uploads = %config.uploads_dir.display(),
        "recipe collection ready"
    );
    if !config.static_dir.is_dir() {
        warn!(
            static_dir = %config.static_dir.display(),
            "static directory missing; only the API will be useful"
        );
    }

    metrics::register_metrics();
    let state = ServeState::new(
        repository,
        config.static_dir.clone(),
        config.max_upload_bytes,
    );
    let router = build_router(state);

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind recettes server on {}", addr))?;
    info!("Serveur en cours d'exécution sur http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("recettes server exited unexpectedly")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        let args = ServeArgs {
            port: Some(8081),
            bind: None,
            data_file: Some(PathBuf::from("/tmp/r.json")),
            uploads_dir: None,
            static_dir: None,
        };
        args.apply(&mut config);
        assert_eq!(config.port, 8081);
        assert_eq!(config.data_file, PathBuf::from("/tmp/r.json"));
        assert_eq!(config.uploads_dir, Config::default().uploads_dir);
    }
}
