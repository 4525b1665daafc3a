use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, FromRequest, Multipart, Path,
        Request, State,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    routing::get,
    Form, Json, Router,
};
use recipe_store::{
    ArrayField, ImageUpload, Recipe, RecipeInput, StoreError, UpdateInput, ValidationError,
};
use tracing::{debug, instrument};

use crate::metrics;
use crate::server::{ApiError, ServeState};

pub(crate) fn router() -> Router<ServeState> {
    Router::new()
        .route(
            "/api/recettes",
            get(recipe_list_handler).post(recipe_create_handler),
        )
        .route(
            "/api/recettes/:id",
            get(recipe_get_handler)
                .put(recipe_update_handler)
                .delete(recipe_delete_handler),
        )
}

#[instrument(name = "recettes.list", skip(state))]
async fn recipe_list_handler(State(state): State<ServeState>) -> Json<Vec<Recipe>> {
    let recipes = state.repository().list().await;
    metrics::record_request("list", "ok");
    Json(recipes)
}

#[instrument(name = "recettes.get", skip(state))]
async fn recipe_get_handler(
    State(state): State<ServeState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let result = state.repository().get(&id).await.map_err(ApiError::from);
    observe("get", &result);
    result.map(Json)
}

#[instrument(name = "recettes.create", skip(state, request))]
async fn recipe_create_handler(
    State(state): State<ServeState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let result = match read_create_payload(&state, request).await {
        Ok((input, image)) => state
            .repository()
            .create(input, image)
            .await
            .map_err(ApiError::from),
        Err(err) => Err(err),
    };
    observe("create", &result);
    result.map(|recipe| (StatusCode::CREATED, Json(recipe)))
}

#[instrument(name = "recettes.update", skip(state, payload))]
async fn recipe_update_handler(
    State(state): State<ServeState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateInput>, JsonRejection>,
) -> Result<Json<Recipe>, ApiError> {
    let result = match payload {
        Ok(Json(input)) => state
            .repository()
            .update(&id, input)
            .await
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::rejected(rejection.status(), rejection.body_text())),
    };
    observe("update", &result);
    result.map(Json)
}

#[instrument(name = "recettes.delete", skip(state))]
async fn recipe_delete_handler(
    State(state): State<ServeState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.repository().delete(&id).await.map_err(ApiError::from);
    observe("delete", &result);
    result.map(|_| (StatusCode::OK, "Recette supprimée"))
}

fn observe<T>(operation: &str, result: &Result<T, ApiError>) {
    let label = match result {
        Ok(_) => "ok",
        Err(err) => err.code(),
    };
    metrics::record_request(operation, label);
}

/// Create accepts a multipart form (the browser path, with an optional
/// image), an urlencoded form, or a plain JSON body.
async fn read_create_payload(
    state: &ServeState,
    request: Request,
) -> Result<(RecipeInput, Option<ImageUpload>), ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase())
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(input) = Form::<RecipeInput>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
        Ok((input, None))
    } else {
        let Json(input) = Json::<RecipeInput>::from_request(request, state)
            .await
            .map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
        Ok((input, None))
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::rejected(err.status(), err.body_text())
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(RecipeInput, Option<ImageUpload>), ApiError> {
    let mut title = None;
    let mut ingredients = None;
    let mut preparations = None;
    let mut image: Option<ImageUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty, unnamed part when no file was picked.
                if bytes.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                if image.is_some() {
                    return Err(ApiError::bad_request("Une seule image par recette."));
                }
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => title = Some(field.text().await.map_err(multipart_error)?),
            "ingredients" => {
                let text = field.text().await.map_err(multipart_error)?;
                set_once(&mut ingredients, "ingredients", text)?;
            }
            "preparations" => {
                let text = field.text().await.map_err(multipart_error)?;
                set_once(&mut preparations, "preparations", text)?;
            }
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    let input = RecipeInput {
        title,
        ingredients,
        preparations,
    };
    Ok((input, image))
}

/// List fields travel as one JSON-encoded part; a repeated part is not an
/// array encoding the store understands.
fn set_once(
    slot: &mut Option<ArrayField>,
    field: &'static str,
    text: String,
) -> Result<(), ApiError> {
    if slot.is_some() {
        return Err(StoreError::from(ValidationError::MalformedArray { field }).into());
    }
    *slot = Some(ArrayField::Encoded(text));
    Ok(())
}
