//! Consolidated admin endpoints.
//!
//! One route per resource with an `action` discriminator, mirroring the
//! management panels that batch every operation through a single URL. The
//! granular routes in `images.rs` and `gallery.rs` stay the primary surface;
//! these wrap the same gateway and store calls.

use axum::{
    extract::{Multipart, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::assets::GATEWAY;
use crate::routes::images::read_upload_form;
use crate::routes::ErrorResponse;
use crate::store::GALLERY_PROJECTS;

#[derive(Debug, Deserialize)]
pub struct ImageActionQuery {
    pub action: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
    #[serde(rename = "imageId")]
    pub image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectActionQuery {
    pub action: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
    #[serde(rename = "projectId")]
    pub project_id: Option<i64>,
}

fn invalid_action(action: Option<&str>) -> Response {
    let detail = match action {
        Some(action) => format!("Unknown action: {action}"),
        None => "Missing action parameter".to_string(),
    };
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": detail})),
    )
        .into_response()
}

fn missing_param(name: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "error": format!("{name} is required")})),
    )
        .into_response()
}

/// GET /api/unified/images
pub async fn get_images(Query(query): Query<ImageActionQuery>) -> Response {
    match query.action.as_deref() {
        Some("list") => {
            let listing = GATEWAY.list_images(query.category.as_deref()).await;
            Json(json!({
                "success": true,
                "images": listing.images,
                "source": listing.source,
            }))
            .into_response()
        }
        Some("search") => {
            let Some(needle) = query.query else {
                return missing_param("query");
            };
            let images = GATEWAY.search(&needle).await;
            Json(json!({"success": true, "images": images})).into_response()
        }
        Some("get") => {
            let Some(image_id) = query.image_id else {
                return missing_param("imageId");
            };
            match GATEWAY.images().get(&Value::from(image_id)) {
                Some(image) => Json(json!({"success": true, "image": image})).into_response(),
                None => (
                    StatusCode::NOT_FOUND,
                    Json(json!({"success": false, "error": "Image not found"})),
                )
                    .into_response(),
            }
        }
        Some("stats") => {
            let stats = GATEWAY.stats().await;
            Json(json!({"success": true, "stats": stats})).into_response()
        }
        other => invalid_action(other),
    }
}

/// POST /api/unified/images
/// Multipart with an `action` field: `upload` carries a file, `update`
/// carries an imageId plus replacement metadata fields.
pub async fn post_images(mut multipart: Multipart) -> Response {
    // Peel off the action field first; field order is fixed by the panels
    // that post here (action always leads).
    let action = match multipart.next_field().await {
        Ok(Some(field)) if field.name() == Some("action") => {
            field.text().await.unwrap_or_default()
        }
        Ok(_) => return invalid_action(None),
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_message("Malformed multipart body", e.to_string())),
            )
                .into_response()
        }
    };

    match action.as_str() {
        "upload" => {
            let form = match read_upload_form(&mut multipart).await {
                Ok(form) => form,
                Err(response) => return response,
            };
            match GATEWAY
                .upload(&form.bytes, &form.filename, &form.category, &form.tags)
                .await
            {
                Ok(asset) => (
                    StatusCode::CREATED,
                    Json(json!({"success": true, "image": asset})),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "unified upload failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "Upload failed"})),
                    )
                        .into_response()
                }
            }
        }
        "update" => {
            let mut image_id = None;
            let mut patch = serde_json::Map::new();
            while let Ok(Some(field)) = multipart.next_field().await {
                let name = field.name().unwrap_or("").to_string();
                let Ok(text) = field.text().await else { continue };
                match name.as_str() {
                    "imageId" => image_id = Some(text),
                    "tags" => {
                        let tags: Vec<String> = text
                            .split(',')
                            .map(str::trim)
                            .filter(|t| !t.is_empty())
                            .map(str::to_string)
                            .collect();
                        patch.insert("tags".to_string(), Value::from(tags));
                    }
                    "name" | "description" | "category" => {
                        patch.insert(name, Value::from(text));
                    }
                    _ => {}
                }
            }
            let Some(image_id) = image_id else {
                return missing_param("imageId");
            };
            match GATEWAY.update_metadata(&image_id, &Value::Object(patch)) {
                Ok(Some(updated)) => {
                    Json(json!({"success": true, "image": updated})).into_response()
                }
                Ok(None) => (
                    StatusCode::NOT_FOUND,
                    Json(json!({"success": false, "error": "Image not found"})),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "unified image update failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "Failed to save image data"})),
                    )
                        .into_response()
                }
            }
        }
        other => invalid_action(Some(other)),
    }
}

/// DELETE /api/unified/images?imageId=
pub async fn delete_image(Query(query): Query<ImageActionQuery>) -> Response {
    let Some(image_id) = query.image_id else {
        return missing_param("imageId");
    };
    match GATEWAY.delete(&image_id).await {
        Ok(true) => Json(json!({"success": true})).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Image not found"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "unified image delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to delete image"})),
            )
                .into_response()
        }
    }
}

fn project_matches(record: &Value, needle: &str) -> bool {
    ["title", "description", "category", "location"]
        .iter()
        .any(|field| {
            record
                .get(field)
                .and_then(Value::as_str)
                .map(|text| text.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
}

/// GET /api/unified/projects
pub async fn get_projects(Query(query): Query<ProjectActionQuery>) -> Response {
    match query.action.as_deref() {
        Some("list") => {
            let projects: Vec<Value> = GALLERY_PROJECTS
                .list()
                .into_iter()
                .filter(|record| match query.category.as_deref() {
                    Some(category) => record
                        .get("category")
                        .and_then(Value::as_str)
                        .map(|c| c.eq_ignore_ascii_case(category))
                        .unwrap_or(false),
                    None => true,
                })
                .collect();
            Json(json!({"success": true, "projects": projects})).into_response()
        }
        Some("search") => {
            let Some(needle) = query.query else {
                return missing_param("query");
            };
            let needle = needle.to_lowercase();
            let projects: Vec<Value> = GALLERY_PROJECTS
                .list()
                .into_iter()
                .filter(|record| project_matches(record, &needle))
                .collect();
            Json(json!({"success": true, "projects": projects})).into_response()
        }
        Some("get") => {
            let Some(project_id) = query.project_id else {
                return missing_param("projectId");
            };
            match GALLERY_PROJECTS.get(&Value::from(project_id)) {
                Some(project) => {
                    Json(json!({"success": true, "project": project})).into_response()
                }
                None => (
                    StatusCode::NOT_FOUND,
                    Json(json!({"success": false, "error": "Project not found"})),
                )
                    .into_response(),
            }
        }
        Some("stats") => {
            let projects = GALLERY_PROJECTS.list();
            let mut categories = serde_json::Map::new();
            for record in &projects {
                if let Some(category) = record.get("category").and_then(Value::as_str) {
                    let count = categories.get(category).and_then(Value::as_u64).unwrap_or(0);
                    categories.insert(category.to_string(), Value::from(count + 1));
                }
            }
            Json(json!({
                "success": true,
                "stats": {"total": projects.len(), "categories": categories},
            }))
            .into_response()
        }
        other => invalid_action(other),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectActionBody {
    pub action: Option<String>,
    pub id: Option<i64>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

/// POST /api/unified/projects
/// JSON body with an `action` discriminator: create or update.
pub async fn post_projects(Json(body): Json<ProjectActionBody>) -> Response {
    match body.action.as_deref() {
        Some("create") => {
            let title_ok = body
                .fields
                .get("title")
                .and_then(Value::as_str)
                .map(|t| !t.is_empty())
                .unwrap_or(false);
            if !title_ok {
                return missing_param("title");
            }
            match GALLERY_PROJECTS.create_with_int_id(Value::Object(body.fields)) {
                Ok(created) => (
                    StatusCode::CREATED,
                    Json(json!({"success": true, "project": created})),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "unified project create failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "Failed to save project"})),
                    )
                        .into_response()
                }
            }
        }
        Some("update") => {
            let Some(id) = body.id else {
                return missing_param("id");
            };
            match GALLERY_PROJECTS.update(&Value::from(id), &Value::Object(body.fields)) {
                Ok(Some(updated)) => {
                    Json(json!({"success": true, "project": updated})).into_response()
                }
                Ok(None) => (
                    StatusCode::NOT_FOUND,
                    Json(json!({"success": false, "error": "Project not found"})),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "unified project update failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "Failed to save project"})),
                    )
                        .into_response()
                }
            }
        }
        other => invalid_action(other),
    }
}

/// DELETE /api/unified/projects?projectId=
pub async fn delete_project(Query(query): Query<ProjectActionQuery>) -> Response {
    let Some(project_id) = query.project_id else {
        return missing_param("projectId");
    };
    match GALLERY_PROJECTS.delete(&Value::from(project_id)) {
        Ok(true) => Json(json!({"success": true})).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "error": "Project not found"})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "unified project delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Failed to delete project"})),
            )
                .into_response()
        }
    }
}
