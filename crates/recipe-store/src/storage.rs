use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::{StoreError, StoreResult};
use crate::model::Recipe;

/// The whole collection, stored as one pretty-printed JSON array.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the collection. A missing, empty, unreadable or corrupt file
    /// yields an empty collection.
    pub async fn load(&self) -> Vec<Recipe> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "recipe file absent; starting empty");
                return Vec::new();
            }
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to read recipe file");
                return Vec::new();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Vec::new();
        }

        match serde_json::from_slice(&bytes) {
            Ok(recipes) => recipes,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "recipe file is not a valid collection");
                Vec::new()
            }
        }
    }

    /// Overwrites the file with `recipes`. Readers see either the old or
    /// the new content, never a partial write.
    pub async fn save(&self, recipes: &[Recipe]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StoreError::storage("creating", parent, err))?;
            }
        }
        let payload = serde_json::to_vec_pretty(recipes)
            .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))
            .map_err(|err| StoreError::storage("serializing", &self.path, err))?;
        write_atomic(&self.path, &payload)
            .await
            .map_err(|err| StoreError::storage("writing", &self.path, err))?;
        debug!(path = %self.path.display(), recipes = recipes.len(), "recipe file saved");
        Ok(())
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    let result = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;
    if result.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    result
}
