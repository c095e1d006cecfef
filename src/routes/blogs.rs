//! Blog endpoints.
//!
//! Public reads are keyed by slug; admin writes are keyed by integer id.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::routes::{ErrorResponse, SuccessResponse};
use crate::store::models::NewBlogPost;
use crate::store::BLOGS;

lazy_static::lazy_static! {
    /// Lowercase words joined by single hyphens; also the shape `slugify`
    /// produces.
    static ref SLUG_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Derive a slug from a title: lowercase, non-alphanumerics collapsed to
/// single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(format!("{what} not found"))))
        .into_response()
}

fn store_failure(e: crate::store::StoreError) -> Response {
    tracing::error!(error = %e, "blog store write failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Failed to save blog data")),
    )
        .into_response()
}

/// GET /api/blogs
pub async fn list_posts() -> impl IntoResponse {
    Json(BLOGS.list())
}

/// GET /api/blogs/{slug}
pub async fn get_post(Path(slug): Path<String>) -> Response {
    if !SLUG_REGEX.is_match(&slug) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid slug format")),
        )
            .into_response();
    }
    match BLOGS.find_by("slug", &Value::from(slug)) {
        Some(post) => Json(post).into_response(),
        None => not_found("Blog post"),
    }
}

/// POST /api/admin/blogs
/// The server assigns the id and timestamps; a missing slug is derived from
/// the title.
pub async fn create_post(Json(mut payload): Json<NewBlogPost>) -> Response {
    if payload.title.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Title is required")),
        )
            .into_response();
    }
    if payload.slug.is_empty() {
        payload.slug = slugify(&payload.title);
    }
    if !SLUG_REGEX.is_match(&payload.slug) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid slug format")),
        )
            .into_response();
    }
    if BLOGS.find_by("slug", &Value::from(payload.slug.clone())).is_some() {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("A post with this slug already exists")),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let mut record = match serde_json::to_value(&payload) {
        Ok(record) => record,
        Err(e) => return store_failure(e.into()),
    };
    if let Some(obj) = record.as_object_mut() {
        if obj.get("date").and_then(Value::as_str).unwrap_or("").is_empty() {
            obj.insert(
                "date".to_string(),
                Value::from(chrono::Utc::now().format("%Y-%m-%d").to_string()),
            );
        }
        obj.insert("createdAt".to_string(), Value::from(now.clone()));
        obj.insert("updatedAt".to_string(), Value::from(now));
    }

    match BLOGS.create_with_int_id(record) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => store_failure(e),
    }
}

/// PUT /api/admin/blogs/{id}
/// Shallow merge; `updatedAt` is stamped by the server.
pub async fn update_post(Path(id): Path<i64>, Json(mut patch): Json<Value>) -> Response {
    let Some(obj) = patch.as_object_mut() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Update must be a JSON object")),
        )
            .into_response();
    };
    if let Some(slug) = obj.get("slug").and_then(Value::as_str) {
        if !SLUG_REGEX.is_match(slug) {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Invalid slug format")),
            )
                .into_response();
        }
    }
    obj.insert(
        "updatedAt".to_string(),
        Value::from(chrono::Utc::now().to_rfc3339()),
    );

    match BLOGS.update(&Value::from(id), &patch) {
        Ok(Some(updated)) => Json(updated).into_response(),
        Ok(None) => not_found("Blog post"),
        Err(e) => store_failure(e),
    }
}

/// DELETE /api/admin/blogs/{id}
pub async fn delete_post(Path(id): Path<i64>) -> Response {
    match BLOGS.delete(&Value::from(id)) {
        Ok(true) => Json(SuccessResponse::ok()).into_response(),
        Ok(false) => not_found("Blog post"),
        Err(e) => store_failure(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Monsoon-Proofing Your Patio!"), "monsoon-proofing-your-patio");
        assert_eq!(slugify("  Kitchen   Trends 2025 "), "kitchen-trends-2025");
    }

    #[test]
    fn test_slug_regex_rejects_traversal_and_case() {
        assert!(SLUG_REGEX.is_match("kitchen-trends-2025"));
        assert!(!SLUG_REGEX.is_match("../etc/passwd"));
        assert!(!SLUG_REGEX.is_match("Kitchen-Trends"));
        assert!(!SLUG_REGEX.is_match("double--hyphen"));
        assert!(!SLUG_REGEX.is_match(""));
    }

    #[tokio::test]
    async fn test_get_post_invalid_slug_is_bad_request() {
        let app = Router::new().route("/api/blogs/{slug}", get(get_post));
        let req = Request::get("/api/blogs/Not%20A%20Slug")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
