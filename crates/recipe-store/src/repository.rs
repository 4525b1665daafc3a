use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::attachments::{AttachmentStore, ImageUpload};
use crate::errors::{StoreError, StoreResult, ValidationError};
use crate::model::Recipe;
use crate::storage::JsonFileStore;
use crate::validation::{ImageChange, RecipeInput, UpdateInput};

/// CRUD over the recipe file. Every operation runs a full
/// load → mutate → save cycle while holding `cycle`, so concurrent
/// requests in this process never lose each other's writes.
pub struct RecipeRepository {
    store: JsonFileStore,
    attachments: AttachmentStore,
    cycle: Mutex<()>,
}

pub type SharedRecipeRepository = Arc<RecipeRepository>;

impl RecipeRepository {
    pub fn new(store: JsonFileStore, attachments: AttachmentStore) -> Self {
        Self {
            store,
            attachments,
            cycle: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &JsonFileStore {
        &self.store
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    pub async fn list(&self) -> Vec<Recipe> {
        let _cycle = self.cycle.lock().await;
        self.store.load().await
    }

    pub async fn get(&self, id: &str) -> StoreResult<Recipe> {
        let _cycle = self.cycle.lock().await;
        self.store
            .load()
            .await
            .into_iter()
            .find(|recipe| recipe.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn create(
        &self,
        input: RecipeInput,
        image: Option<ImageUpload>,
    ) -> StoreResult<Recipe> {
        let fields = input.validate()?;
        if let Some(upload) = image.as_ref() {
            AttachmentStore::check_media_type(&upload.content_type)?;
        }

        let _cycle = self.cycle.lock().await;
        let image = match image {
            Some(upload) => Some(self.attachments.store(&upload).await?),
            None => None,
        };
        let recipe = Recipe::new(fields, image);

        let mut recipes = self.store.load().await;
        recipes.push(recipe.clone());
        if let Err(err) = self.store.save(&recipes).await {
            if let Some(reference) = recipe.image.as_deref() {
                self.attachments.remove(reference).await;
            }
            return Err(err);
        }

        info!(id = %recipe.id, title = %recipe.title, "recipe created");
        Ok(recipe)
    }

    pub async fn update(&self, id: &str, input: UpdateInput) -> StoreResult<Recipe> {
        let (fields, image_change) = input.into_parts();
        let fields = fields.validate()?;

        let _cycle = self.cycle.lock().await;
        let mut recipes = self.store.load().await;
        let Some(position) = recipes.iter().position(|recipe| recipe.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        if let ImageChange::Replace(reference) = &image_change {
            // Each file has a single owner, so delete and update can clean it up.
            let taken = recipes.iter().any(|other| {
                other.id != id && other.image.as_deref() == Some(reference.as_str())
            });
            if taken {
                return Err(ValidationError::AttachmentInUse {
                    reference: reference.clone(),
                }
                .into());
            }
        }
        let recipe = &mut recipes[position];

        let previous_image = recipe.image.clone();
        match image_change {
            ImageChange::Keep => {}
            ImageChange::Clear => recipe.image = None,
            ImageChange::Replace(reference) => {
                if !self.attachments.contains(&reference).await {
                    return Err(ValidationError::UnknownAttachment { reference }.into());
                }
                recipe.image = Some(reference);
            }
        }
        recipe.apply(fields);
        let updated = recipe.clone();

        self.store.save(&recipes).await?;
        info!(id = %updated.id, "recipe updated");

        if let Some(previous) = previous_image {
            if updated.image.as_deref() != Some(previous.as_str()) {
                self.attachments.remove(&previous).await;
            }
        }
        Ok(updated)
    }

    /// Removes the recipe, then cleans up its image. Cleanup failures never
    /// undo the deletion.
    pub async fn delete(&self, id: &str) -> StoreResult<Recipe> {
        let _cycle = self.cycle.lock().await;
        let mut recipes = self.store.load().await;
        let Some(position) = recipes.iter().position(|recipe| recipe.id == id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        let removed = recipes.remove(position);

        self.store.save(&recipes).await?;
        info!(id = %removed.id, "recipe deleted");

        if let Some(reference) = removed.image.as_deref() {
            if !self.attachments.remove(reference).await {
                debug!(id = %removed.id, reference, "image cleanup skipped");
            }
        }
        Ok(removed)
    }
}
