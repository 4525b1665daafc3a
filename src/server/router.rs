use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::metrics;

mod recipes;

use recipes::router as recipe_routes;

use super::state::ServeState;

/// API routes plus the front end: uploaded images under the attachment
/// prefix, `/recette` detail page, everything else from the static dir.
pub fn build_router(state: ServeState) -> Router {
    let static_dir = state.static_dir().to_path_buf();
    let attachments = state.repository().attachments();
    let uploads_prefix = attachments.url_prefix().to_string();
    let uploads_service = ServeDir::new(attachments.root());

    Router::new()
        .merge(recipe_routes().layer(DefaultBodyLimit::max(state.max_upload_bytes())))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route_service("/recette", ServeFile::new(static_dir.join("recette.html")))
        .nest_service(&uploads_prefix, uploads_service)
        .fallback_service(ServeDir::new(&static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

async fn health_handler(State(state): State<ServeState>) -> Json<Value> {
    let recipes = state.repository().list().await.len();
    Json(json!({
        "status": "ok",
        "recipes": recipes,
    }))
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::render() {
        Ok((content_type, body)) => match HeaderValue::from_str(&content_type) {
            Ok(content_type) => ([(CONTENT_TYPE, content_type)], body).into_response(),
            Err(err) => {
                error!(?err, "failed to build content-type header for metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
            }
        },
        Err(err) => {
            error!(?err, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}
