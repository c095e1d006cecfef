//! Company profile endpoints.
//!
//! A single JSON document. Public reads fall back to the built-in default
//! profile when the file is missing or unreadable; admin writes replace the
//! document wholesale and stamp `lastUpdated`.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::Value;

use crate::routes::ErrorResponse;
use crate::store::models::CompanyProfile;
use crate::store::COMPANY;

/// GET /api/company
pub async fn get_company() -> impl IntoResponse {
    match COMPANY.read() {
        Some(profile) => Json(profile),
        None => {
            tracing::debug!("company profile missing, serving default");
            Json(serde_json::to_value(CompanyProfile::default()).unwrap_or(Value::Null))
        }
    }
}

/// POST /api/admin/company
/// Wholesale replace. The incoming body must at least be a JSON object.
pub async fn update_company(Json(mut payload): Json<Value>) -> impl IntoResponse {
    let Some(obj) = payload.as_object_mut() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Company profile must be a JSON object")),
        )
            .into_response();
    };
    obj.insert(
        "lastUpdated".to_string(),
        Value::from(chrono::Utc::now().to_rfc3339()),
    );

    if let Err(e) = COMPANY.write(&payload) {
        tracing::error!(error = %e, "failed to write company profile");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Failed to save company data")),
        )
            .into_response();
    }
    Json(payload).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_update_rejects_non_object_body() {
        let app = Router::new().route("/api/admin/company", post(update_company));
        let req = Request::post("/api/admin/company")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("[1, 2, 3]"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_default_profile_serializes_camel_case() {
        let value = serde_json::to_value(CompanyProfile::default()).unwrap();
        assert!(value.get("projectsCompleted").is_some());
        assert_eq!(value["name"], serde_json::json!("REMODELY LLC"));
    }
}
