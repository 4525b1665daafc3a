//! Recipe persistence for the recettes service.
//!
//! The collection lives in a single pretty-printed JSON file that is re-read
//! on every operation; images live in a flat attachment directory.

pub mod attachments;
pub mod errors;
pub mod model;
pub mod repository;
pub mod storage;
pub mod validation;

pub use attachments::{AttachmentStore, ImageUpload, ALLOWED_IMAGE_TYPES};
pub use errors::{StoreError, StoreResult, ValidationError};
pub use model::Recipe;
pub use repository::{RecipeRepository, SharedRecipeRepository};
pub use storage::JsonFileStore;
pub use validation::{ArrayField, ImageChange, RecipeInput, UpdateInput, ValidatedRecipe};
