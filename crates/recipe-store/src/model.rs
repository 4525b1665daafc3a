use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidatedRecipe;

/// A persisted recipe. `id` is minted by the store and never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub preparations: Vec<String>,
    /// Relative reference such as `/uploads/1700000000000.png`.
    #[serde(default)]
    pub image: Option<String>,
}

impl Recipe {
    pub fn new(fields: ValidatedRecipe, image: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: fields.title,
            ingredients: fields.ingredients,
            preparations: fields.preparations,
            image,
        }
    }

    /// Replaces the mutable text fields, leaving `id` and `image` alone.
    pub fn apply(&mut self, fields: ValidatedRecipe) {
        self.title = fields.title;
        self.ingredients = fields.ingredients;
        self.preparations = fields.preparations;
    }
}
