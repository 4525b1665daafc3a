use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::errors::{StoreError, StoreResult};

pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

const MAX_NAME_ATTEMPTS: i64 = 64;

/// An image received with a create request.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Flat directory of uploaded images, addressed as `<url_prefix>/<name>`.
#[derive(Clone, Debug)]
pub struct AttachmentStore {
    root: PathBuf,
    url_prefix: String,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        let trimmed = url_prefix.trim().trim_end_matches('/');
        let url_prefix = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self {
            root: root.into(),
            url_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn check_media_type(content_type: &str) -> StoreResult<()> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if ALLOWED_IMAGE_TYPES.contains(&essence.as_str()) {
            Ok(())
        } else {
            Err(StoreError::UnsupportedMediaType(content_type.to_string()))
        }
    }

    /// Writes the upload under a fresh timestamp-derived name and returns
    /// the reference to store on the recipe.
    pub async fn store(&self, upload: &ImageUpload) -> StoreResult<String> {
        Self::check_media_type(&upload.content_type)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| StoreError::storage("creating", &self.root, err))?;

        let extension = upload
            .file_name
            .as_deref()
            .and_then(extension_of)
            .unwrap_or_default();
        let stamp = Utc::now().timestamp_millis();

        for offset in 0..MAX_NAME_ATTEMPTS {
            let name = format!("{}{}", stamp + offset, extension);
            let path = self.root.join(&name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(StoreError::storage("creating", &path, err)),
            };

            let written = async {
                file.write_all(&upload.bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(err) = written {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(StoreError::storage("writing", &path, err));
            }

            debug!(path = %path.display(), bytes = upload.bytes.len(), "attachment stored");
            return Ok(format!("{}/{}", self.url_prefix, name));
        }

        Err(StoreError::storage(
            "naming",
            &self.root,
            ErrorKind::AlreadyExists.into(),
        ))
    }

    pub async fn contains(&self, reference: &str) -> bool {
        match self.resolve(reference) {
            Some(path) => fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false),
            None => false,
        }
    }

    /// Best-effort removal; failures are logged and reported as `false`.
    pub async fn remove(&self, reference: &str) -> bool {
        let Some(path) = self.resolve(reference) else {
            warn!(reference, "attachment reference outside the store; not removed");
            return false;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "attachment removed");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to remove attachment");
                false
            }
        }
    }

    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let name = reference
            .strip_prefix(self.url_prefix.as_str())?
            .strip_prefix('/')?;
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(|c| c == '/' || c == '\\');
        plain.then(|| self.root.join(name))
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name).extension()?.to_str()?;
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!(".{}", extension.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn png(name: &str) -> ImageUpload {
        ImageUpload {
            file_name: Some(name.to_string()),
            content_type: "image/png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[test]
    fn media_type_check_is_exact() {
        assert!(AttachmentStore::check_media_type("image/jpeg").is_ok());
        assert!(AttachmentStore::check_media_type("IMAGE/GIF").is_ok());
        assert!(AttachmentStore::check_media_type("image/png; charset=binary").is_ok());
        assert!(matches!(
            AttachmentStore::check_media_type("text/plain"),
            Err(StoreError::UnsupportedMediaType(_))
        ));
        assert!(AttachmentStore::check_media_type("image/webp").is_err());
    }

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(AttachmentStore::new("x", "uploads/").url_prefix(), "/uploads");
        assert_eq!(AttachmentStore::new("x", "/media").url_prefix(), "/media");
    }

    #[tokio::test]
    async fn stores_under_unique_names_and_creates_directory() {
        let tmp = tempdir().expect("temp dir");
        let store = AttachmentStore::new(tmp.path().join("uploads"), "/uploads");

        let first = store.store(&png("Photo.PNG")).await.expect("first");
        let second = store.store(&png("photo.png")).await.expect("second");

        assert_ne!(first, second);
        assert!(first.starts_with("/uploads/") && first.ends_with(".png"));
        assert!(store.contains(&first).await);
        assert!(store.contains(&second).await);
    }

    #[tokio::test]
    async fn rejected_type_writes_nothing() {
        let tmp = tempdir().expect("temp dir");
        let root = tmp.path().join("uploads");
        let store = AttachmentStore::new(&root, "/uploads");
        let upload = ImageUpload {
            content_type: "text/plain".into(),
            ..png("notes.txt")
        };

        assert!(store.store(&upload).await.is_err());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn remove_is_best_effort() {
        let tmp = tempdir().expect("temp dir");
        let store = AttachmentStore::new(tmp.path(), "/uploads");
        let reference = store.store(&png("a.png")).await.expect("store");

        assert!(store.remove(&reference).await);
        assert!(!store.contains(&reference).await);
        assert!(!store.remove(&reference).await);
    }

    #[tokio::test]
    async fn references_cannot_escape_the_store() {
        let tmp = tempdir().expect("temp dir");
        let root = tmp.path().join("uploads");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(tmp.path().join("secret.txt"), b"keep").unwrap();
        let store = AttachmentStore::new(&root, "/uploads");

        assert!(!store.remove("/uploads/../secret.txt").await);
        assert!(!store.remove("/elsewhere/secret.txt").await);
        assert!(tmp.path().join("secret.txt").exists());
    }
}
