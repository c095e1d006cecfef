//! Image endpoints.
//!
//! The public listing never fails: it walks the gateway's fallback chain and
//! reports which tier served it. Admin CRUD operates on the metadata records;
//! uploads go through the media host and surface failures.

use axum::{
    extract::{Multipart, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::assets::{GatewayError, GATEWAY};
use crate::routes::{ErrorResponse, SuccessResponse};
use crate::store::generate_local_id;

/// Upload cap, checked before the media host sees the bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

fn listing_body(listing: crate::assets::ImageListing) -> Value {
    serde_json::json!({
        "images": listing.images,
        "source": listing.source,
    })
}

fn gateway_failure(e: GatewayError) -> Response {
    tracing::error!(error = %e, "image gateway operation failed");
    let (status, error) = match e {
        GatewayError::Remote(crate::cloudinary::CloudinaryError::NotConfigured) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Image host is not configured",
        ),
        GatewayError::Remote(_) => (StatusCode::BAD_GATEWAY, "Image host request failed"),
        GatewayError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save image data"),
    };
    (status, Json(ErrorResponse::new(error))).into_response()
}

/// GET /api/images
/// Always 200; the fallback chain guarantees content.
pub async fn public_list(Query(query): Query<ListQuery>) -> impl IntoResponse {
    let listing = GATEWAY.list_images(query.category.as_deref()).await;
    Json(listing_body(listing))
}

/// GET /api/admin/images
pub async fn admin_list(Query(query): Query<ListQuery>) -> impl IntoResponse {
    let listing = GATEWAY.list_images(query.category.as_deref()).await;
    Json(listing_body(listing))
}

/// POST /api/admin/images
/// Register metadata for an image hosted elsewhere (no binary involved).
/// Records without an id get a generated `local-...` one.
pub async fn create_record(Json(mut payload): Json<Value>) -> Response {
    let Some(obj) = payload.as_object_mut() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Image record must be a JSON object")),
        )
            .into_response();
    };
    if obj.get("url").and_then(Value::as_str).unwrap_or("").is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Image url is required")),
        )
            .into_response();
    }
    if obj.get("id").and_then(Value::as_str).unwrap_or("").is_empty() {
        obj.insert("id".to_string(), Value::from(generate_local_id()));
    }
    obj.entry("source").or_insert(Value::from("local"));
    obj.entry("uploadedAt")
        .or_insert(Value::from(chrono::Utc::now().to_rfc3339()));

    match GATEWAY.images().insert(payload) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => gateway_failure(e.into()),
    }
}

/// PUT /api/admin/images/{id}
/// Shallow metadata merge. Wildcard path because media-host ids contain
/// slashes.
pub async fn update_record(Path(id): Path<String>, Json(patch): Json<Value>) -> Response {
    if !patch.is_object() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Update must be a JSON object")),
        )
            .into_response();
    }
    match GATEWAY.update_metadata(&id, &patch) {
        Ok(Some(updated)) => Json(updated).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Image not found")),
        )
            .into_response(),
        Err(e) => gateway_failure(e.into()),
    }
}

/// DELETE /api/admin/images/{id}
pub async fn delete_record(Path(id): Path<String>) -> Response {
    match GATEWAY.delete(&id).await {
        Ok(true) => Json(SuccessResponse::ok()).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Image not found")),
        )
            .into_response(),
        Err(e) => gateway_failure(e),
    }
}

/// Parsed multipart upload form.
pub struct UploadForm {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// Pull the file and its metadata fields out of a multipart body.
pub async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadForm, Response> {
    let mut bytes = None;
    let mut filename = String::new();
    let mut content_type = String::new();
    let mut category = "Kitchen".to_string();
    let mut tags = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::with_message("Malformed multipart body", e.to_string())),
        )
            .into_response()
    })? {
        match field.name().unwrap_or("") {
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                content_type = field.content_type().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse::with_message("Failed to read file", e.to_string())),
                    )
                        .into_response()
                })?;
                bytes = Some(data.to_vec());
            }
            "category" => {
                if let Ok(text) = field.text().await {
                    if !text.is_empty() {
                        category = text;
                    }
                }
            }
            "tags" => {
                if let Ok(text) = field.text().await {
                    tags = text
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            }
            _ => {}
        }
    }

    let Some(bytes) = bytes else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No file provided")),
        )
            .into_response());
    };
    if bytes.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Uploaded file is empty")),
        )
            .into_response());
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorResponse::new("File exceeds the 10 MB upload limit")),
        )
            .into_response());
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "Unsupported file type; expected JPEG, PNG, WebP, or GIF",
            )),
        )
            .into_response());
    }

    Ok(UploadForm {
        bytes,
        filename,
        category,
        tags,
    })
}

/// POST /api/admin/images/upload
/// No fallback on this path: a media host failure is the client's problem.
pub async fn upload(mut multipart: Multipart) -> Response {
    let form = match read_upload_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    match GATEWAY
        .upload(&form.bytes, &form.filename, &form.category, &form.tags)
        .await
    {
        Ok(asset) => (StatusCode::CREATED, Json(asset)).into_response(),
        Err(e) => gateway_failure(e),
    }
}

/// GET /api/admin/cloudinary-status
pub async fn cloudinary_status() -> impl IntoResponse {
    let status = GATEWAY.media_host_status();
    Json(serde_json::json!({
        "status": status,
        "configured": status == "configured",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn multipart_body(boundary: &str, parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match file {
                Some((filename, content_type)) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                }
                None => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                }
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    fn upload_router() -> Router {
        Router::new().route("/api/admin/images/upload", post(upload))
    }

    async fn send_multipart(body: Vec<u8>, boundary: &str) -> axum::http::Response<Body> {
        let req = Request::post("/api/admin/images/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        upload_router().oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let boundary = "XBOUNDARY";
        let body = multipart_body(boundary, &[("category", None, b"Kitchen")]);
        let res = send_multipart(body, boundary).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image_content_type() {
        let boundary = "XBOUNDARY";
        let body = multipart_body(
            boundary,
            &[("file", Some(("evil.exe", "application/octet-stream")), b"MZ")],
        );
        let res = send_multipart(body, boundary).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let boundary = "XBOUNDARY";
        let body = multipart_body(boundary, &[("file", Some(("x.png", "image/png")), b"")]);
        let res = send_multipart(body, boundary).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
