use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use recipe_store::{StoreError, ValidationError};
use serde_json::json;
use tracing::error;

/// Error rendered as `{"error": "<message>"}`. Storage details stay in the
/// logs.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    /// Body that an extractor refused. Oversized bodies stay a 413, every
    /// other unreadable body is a 400.
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(status, "payload_too_large", message)
        } else {
            Self::bad_request(message)
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "Recette non trouvée")
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage",
            "Erreur interne de stockage.",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Short label used for metrics.
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(ValidationError::MissingField { fields }) => Self::new(
                StatusCode::BAD_REQUEST,
                "missing_field",
                format!("Champs requis manquants : {}.", fields.join(", ")),
            ),
            StoreError::Validation(ValidationError::MalformedArray { field }) => Self::new(
                StatusCode::BAD_REQUEST,
                "malformed_array",
                format!("Le champ {field} doit être un tableau JSON de chaînes."),
            ),
            StoreError::Validation(ValidationError::UnknownAttachment { reference }) => Self::new(
                StatusCode::BAD_REQUEST,
                "unknown_attachment",
                format!("Image inconnue : {reference}"),
            ),
            StoreError::Validation(ValidationError::AttachmentInUse { reference }) => Self::new(
                StatusCode::BAD_REQUEST,
                "attachment_in_use",
                format!("Image déjà utilisée par une autre recette : {reference}"),
            ),
            StoreError::NotFound(_) => Self::not_found(),
            StoreError::UnsupportedMediaType(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "unsupported_media_type",
                "Type de fichier non autorisé. Veuillez télécharger une image.",
            ),
            err @ StoreError::Storage { .. } => {
                error!(error = %err, "recipe storage failure");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
