use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field(s): {}", fields.join(", "))]
    MissingField { fields: Vec<&'static str> },
    #[error("{field} must be a JSON array of strings")]
    MalformedArray { field: &'static str },
    #[error("image {reference} is not in the attachment store")]
    UnknownAttachment { reference: String },
    #[error("image {reference} already belongs to another recipe")]
    AttachmentInUse { reference: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("recipe {0} not found")]
    NotFound(String),
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("storage failure while {action} {}: {source}", path.display())]
    Storage {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn storage(action: &'static str, path: &Path, source: io::Error) -> Self {
        StoreError::Storage {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
