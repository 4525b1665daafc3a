//! Request validation shared by the create and update paths.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ValidationError;

/// A list field as it arrives on the wire: either a literal array or a
/// JSON-encoded string (what browsers send through multipart forms).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArrayField {
    Parsed(Vec<String>),
    Encoded(String),
}

impl ArrayField {
    fn is_blank(&self) -> bool {
        match self {
            ArrayField::Parsed(_) => false,
            ArrayField::Encoded(raw) => raw.trim().is_empty(),
        }
    }

    pub fn decode(self, field: &'static str) -> Result<Vec<String>, ValidationError> {
        match self {
            ArrayField::Parsed(items) => Ok(items),
            ArrayField::Encoded(raw) => serde_json::from_str::<Vec<String>>(raw.trim())
                .map_err(|_| ValidationError::MalformedArray { field }),
        }
    }
}

/// Normalized fields ready to be stored on a [`crate::Recipe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRecipe {
    pub title: String,
    pub ingredients: Vec<String>,
    pub preparations: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecipeInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ingredients: Option<ArrayField>,
    #[serde(default)]
    pub preparations: Option<ArrayField>,
}

impl RecipeInput {
    pub fn validate(self) -> Result<ValidatedRecipe, ValidationError> {
        let title = self
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty());
        let ingredients = self.ingredients.filter(|field| !field.is_blank());
        let preparations = self.preparations.filter(|field| !field.is_blank());

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if ingredients.is_none() {
            missing.push("ingredients");
        }
        if preparations.is_none() {
            missing.push("preparations");
        }

        match (title, ingredients, preparations) {
            (Some(title), Some(ingredients), Some(preparations)) => Ok(ValidatedRecipe {
                title,
                ingredients: ingredients.decode("ingredients")?,
                preparations: preparations.decode("preparations")?,
            }),
            _ => Err(ValidationError::MissingField { fields: missing }),
        }
    }
}

/// What an update does to the image reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ingredients: Option<ArrayField>,
    #[serde(default)]
    pub preparations: Option<ArrayField>,
    /// `None` when the key is absent, `Some(None)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

impl UpdateInput {
    pub fn into_parts(self) -> (RecipeInput, ImageChange) {
        let change = match self.image {
            None => ImageChange::Keep,
            Some(None) => ImageChange::Clear,
            Some(Some(reference)) => {
                let reference = reference.trim().to_string();
                if reference.is_empty() {
                    ImageChange::Clear
                } else {
                    ImageChange::Replace(reference)
                }
            }
        };
        let fields = RecipeInput {
            title: self.title,
            ingredients: self.ingredients,
            preparations: self.preparations,
        };
        (fields, change)
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
