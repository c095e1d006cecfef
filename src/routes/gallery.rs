//! Gallery project endpoints.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::routes::{ErrorResponse, SuccessResponse};
use crate::store::models::NewGalleryProject;
use crate::store::GALLERY_PROJECTS;

fn store_failure(e: crate::store::StoreError) -> Response {
    tracing::error!(error = %e, "gallery store write failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Failed to save gallery data")),
    )
        .into_response()
}

/// GET /api/gallery/projects
pub async fn list_projects() -> impl IntoResponse {
    Json(GALLERY_PROJECTS.list())
}

/// POST /api/admin/gallery-projects
pub async fn create_project(Json(payload): Json<NewGalleryProject>) -> Response {
    if payload.title.is_empty() || payload.category.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Title and category are required")),
        )
            .into_response();
    }
    let record = match serde_json::to_value(&payload) {
        Ok(record) => record,
        Err(e) => return store_failure(e.into()),
    };
    match GALLERY_PROJECTS.create_with_int_id(record) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => store_failure(e),
    }
}

/// PUT /api/admin/gallery-projects
/// Bulk replace of the whole collection; existing ids are kept as sent.
pub async fn replace_projects(Json(payload): Json<Vec<Value>>) -> Response {
    if payload.iter().any(|record| !record.is_object()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Every project must be a JSON object")),
        )
            .into_response();
    }
    match GALLERY_PROJECTS.write_all(&payload) {
        Ok(()) => Json(payload).into_response(),
        Err(e) => store_failure(e),
    }
}

/// PUT /api/admin/gallery-projects/{id}
/// Full-record replace keyed by id; the path id wins over any id in the body.
pub async fn update_project(Path(id): Path<i64>, Json(payload): Json<Value>) -> Response {
    if !payload.is_object() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Project must be a JSON object")),
        )
            .into_response();
    }
    match GALLERY_PROJECTS.replace(&Value::from(id), payload) {
        Ok(Some(updated)) => Json(updated).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Project not found")),
        )
            .into_response(),
        Err(e) => store_failure(e),
    }
}

/// DELETE /api/admin/gallery-projects/{id}
pub async fn delete_project(Path(id): Path<i64>) -> Response {
    match GALLERY_PROJECTS.delete(&Value::from(id)) {
        Ok(true) => Json(SuccessResponse::ok()).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Project not found")),
        )
            .into_response(),
        Err(e) => store_failure(e),
    }
}
