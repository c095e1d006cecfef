//! Health endpoint.

use axum::{response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceChecks {
    pub database: String,
    pub cloudinary: String,
    pub filesystem: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: u64,
    pub services: ServiceChecks,
}

/// Whether the data directory exists (or can be created) and is writable.
fn probe_data_dir() -> &'static str {
    let dir = crate::store::data_dir();
    if std::fs::create_dir_all(dir).is_err() {
        return "unavailable";
    }
    let probe = dir.join(".health-probe");
    match std::fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            "available"
        }
        Err(_) => "unavailable",
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: SERVER_START.elapsed().as_secs(),
        services: ServiceChecks {
            // This deployment runs without a database; the record store is
            // the filesystem.
            database: "not configured".to_string(),
            cloudinary: crate::assets::GATEWAY.media_host_status().to_string(),
            filesystem: probe_data_dir().to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_services() {
        let app = Router::new().route("/health", get(health_check));
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.services.database, "not configured");
        assert!(!body.version.is_empty());
    }
}
