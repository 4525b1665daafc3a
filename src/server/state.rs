use std::path::{Path, PathBuf};
use std::sync::Arc;

use recipe_store::{RecipeRepository, SharedRecipeRepository};

#[derive(Clone)]
pub struct ServeState {
    repository: SharedRecipeRepository,
    static_dir: Arc<PathBuf>,
    max_upload_bytes: usize,
}

impl ServeState {
    pub fn new(
        repository: SharedRecipeRepository,
        static_dir: impl Into<PathBuf>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            repository,
            static_dir: Arc::new(static_dir.into()),
            max_upload_bytes,
        }
    }

    pub fn repository(&self) -> &RecipeRepository {
        self.repository.as_ref()
    }

    pub fn static_dir(&self) -> &Path {
        self.static_dir.as_path()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}
