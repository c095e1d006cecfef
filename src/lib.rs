//! Remodely backend - marketing site API and admin panel backend.

pub mod assets;
pub mod cloudinary;
pub mod logging;
pub mod routes;
pub mod store;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to localhost dev origins.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Everything under the session gate. Merged into the app router; the gate
/// runs only for these routes.
fn admin_routes() -> Router {
    Router::new()
        .route(
            "/api/admin/company",
            get(routes::company::get_company).post(routes::company::update_company),
        )
        .route(
            "/api/admin/blogs",
            get(routes::blogs::list_posts).post(routes::blogs::create_post),
        )
        .route(
            "/api/admin/blogs/{id}",
            axum::routing::put(routes::blogs::update_post).delete(routes::blogs::delete_post),
        )
        .route(
            "/api/admin/gallery-projects",
            get(routes::gallery::list_projects)
                .post(routes::gallery::create_project)
                .put(routes::gallery::replace_projects),
        )
        .route(
            "/api/admin/gallery-projects/{id}",
            axum::routing::put(routes::gallery::update_project)
                .delete(routes::gallery::delete_project),
        )
        .route(
            "/api/admin/images",
            get(routes::images::admin_list).post(routes::images::create_record),
        )
        .route("/api/admin/images/upload", post(routes::images::upload))
        // Wildcard because media-host ids contain slashes.
        .route(
            "/api/admin/images/{*id}",
            axum::routing::put(routes::images::update_record)
                .delete(routes::images::delete_record),
        )
        .route(
            "/api/admin/cloudinary-status",
            get(routes::images::cloudinary_status),
        )
        .route(
            "/api/unified/images",
            get(routes::unified::get_images)
                .post(routes::unified::post_images)
                .delete(routes::unified::delete_image),
        )
        .route(
            "/api/unified/projects",
            get(routes::unified::get_projects)
                .post(routes::unified::post_projects)
                .delete(routes::unified::delete_project),
        )
        .route_layer(middleware::from_fn(routes::auth::admin_gate))
}

/// Create and configure the application router.
pub fn create_app() -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/images", get(routes::images::public_list))
        .route("/api/company", get(routes::company::get_company))
        .route("/api/blogs", get(routes::blogs::list_posts))
        .route("/api/blogs/{slug}", get(routes::blogs::get_post))
        .route("/api/gallery/projects", get(routes::gallery::list_projects))
        .route(
            "/api/admin/auth",
            post(routes::auth::login)
                .get(routes::auth::session_check)
                .delete(routes::auth::logout),
        )
        .route("/api/admin/verify", get(routes::auth::verify_session))
        .merge(admin_routes())
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Request body cap; leaves headroom over the 10 MB upload limit for
        // multipart framing and base64-free binary parts.
        .layer(RequestBodyLimitLayer::new(12 * 1024 * 1024))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    // Refuse to start in production with the insecure default JWT secret.
    if routes::auth::is_production() {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || secret == "default-jwt-secret-change-in-production" {
            panic!(
                "FATAL: JWT_SECRET must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
        }

        let admin_password_set =
            std::env::var("ADMIN_HASH_PASSWORD").is_ok() || std::env::var("ADMIN_PASSWORD").is_ok();
        if !admin_password_set {
            tracing::warn!(
                "SECURITY: Neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set. \
                 The fallback default password 'admin123' is insecure. \
                 Set ADMIN_HASH_PASSWORD to a bcrypt hash of a strong password."
            );
        }
    }

    if crate::assets::GATEWAY.media_host_status() == "configured" {
        tracing::info!("Cloudinary credentials found; serving gallery from the media host");
    } else {
        tracing::info!("Cloudinary not configured; gallery serves local data with demo fallback");
    }

    let app = create_app();

    // Bind address is configurable via HOST / PORT env vars, defaulting to
    // 127.0.0.1:3001 so existing dev setups keep working unchanged.
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_public_routes_do_not_require_auth() {
        for uri in ["/health", "/api/company", "/api/blogs", "/api/gallery/projects"] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let res = create_app().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "GET {uri}");
        }
    }

    #[tokio::test]
    async fn test_admin_routes_are_gated() {
        for uri in [
            "/api/admin/company",
            "/api/admin/blogs",
            "/api/admin/gallery-projects",
            "/api/admin/images",
            "/api/admin/cloudinary-status",
            "/api/unified/projects",
        ] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let res = create_app().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "GET {uri}");
        }
    }

    #[tokio::test]
    async fn test_admin_route_accepts_session_token() {
        let token = routes::auth::create_admin_token().unwrap();
        let req = Request::get("/api/admin/cloudinary-status")
            .header(header::COOKIE, format!("admin_token={token}"))
            .body(Body::empty())
            .unwrap();
        let res = create_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_endpoints_are_not_gated() {
        let req = Request::get("/api/admin/auth").body(Body::empty()).unwrap();
        let res = create_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
