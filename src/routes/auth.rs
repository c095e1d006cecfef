//! Admin authentication.
//!
//! One admin credential, one session mechanism: a successful password check
//! mints a short-lived JWT carried in the `admin_token` cookie (or a Bearer
//! header for API clients). Every admin endpoint goes through `admin_gate`.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::routes::{ErrorResponse, SuccessResponse};

lazy_static::lazy_static! {
    /// JWT secret key from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());

    /// Admin password hash from environment (or plain password to hash)
    pub static ref ADMIN_PASSWORD_HASH: String = {
        // First try ADMIN_HASH_PASSWORD (already hashed)
        if let Ok(hashed) = std::env::var("ADMIN_HASH_PASSWORD") {
            hashed
        } else if let Ok(plain) = std::env::var("ADMIN_PASSWORD") {
            hash(&plain, DEFAULT_COST).unwrap_or_else(|_| "".to_string())
        } else {
            // Default password "admin123" hashed
            hash("admin123", DEFAULT_COST).unwrap_or_else(|_| "".to_string())
        }
    };
}

/// Session cookie name.
pub const ADMIN_COOKIE: &str = "admin_token";

/// Session lifetime; cookie max-age and JWT expiry agree on this.
const SESSION_EXPIRY_HOURS: i64 = 24;

pub fn is_production() -> bool {
    std::env::var("ENVIRONMENT").map(|v| v == "production").unwrap_or(false)
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mint a session token good for 24 hours.
pub fn create_admin_token() -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        admin: true,
        iat: now.timestamp(),
        exp: (now + Duration::hours(SESSION_EXPIRY_HOURS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

/// Decode and validate a session token. Expiry is enforced by the decoder;
/// the `admin` claim must additionally be true.
pub fn verify_admin_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    if !data.claims.admin {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }
    Ok(data.claims)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(is_production())
        .max_age(time::Duration::hours(SESSION_EXPIRY_HOURS))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build()
}

/// The session token from either the cookie or a Bearer header.
fn extract_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(ADMIN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// POST /api/admin/auth
/// Check the password and set the session cookie.
pub async fn login(jar: CookieJar, Json(payload): Json<LoginRequest>) -> Response {
    if payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Password is required")),
        )
            .into_response();
    }

    // bcrypt is CPU-bound; keep the async executor free.
    let password = payload.password;
    let password_ok =
        tokio::task::spawn_blocking(move || verify(&password, &ADMIN_PASSWORD_HASH).unwrap_or(false))
            .await
            .unwrap_or(false);
    if !password_ok {
        tracing::warn!("failed admin login attempt");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid password")),
        )
            .into_response();
    }

    let token = match create_admin_token() {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "failed to create session token");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to create session")),
            )
                .into_response();
        }
    };

    tracing::info!("admin login succeeded");
    (
        jar.add(session_cookie(token.clone())),
        Json(serde_json::json!({"success": true, "token": token})),
    )
        .into_response()
}

/// GET /api/admin/auth
/// Report whether the current session is valid. Always 200; the body says.
pub async fn session_check(jar: CookieJar, headers: HeaderMap) -> impl IntoResponse {
    let authenticated = extract_token(&jar, &headers)
        .and_then(|token| verify_admin_token(&token).ok())
        .is_some();
    Json(SessionResponse {
        authenticated,
        error: None,
    })
}

/// DELETE /api/admin/auth
/// Clear the session cookie. Idempotent.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(removal_cookie()), Json(SuccessResponse::ok()))
}

/// GET /api/admin/verify
/// Strict variant of the session check: 401 when the token is missing or bad.
pub async fn verify_session(jar: CookieJar, headers: HeaderMap) -> Response {
    match extract_token(&jar, &headers).map(|token| verify_admin_token(&token)) {
        Some(Ok(_)) => Json(SessionResponse {
            authenticated: true,
            error: None,
        })
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(SessionResponse {
                authenticated: false,
                error: Some("Invalid or expired session".to_string()),
            }),
        )
            .into_response(),
    }
}

/// Middleware guarding every admin route. Rejects with a JSON 401 rather than
/// a redirect; this is an API surface, the frontend owns navigation.
pub async fn admin_gate(jar: CookieJar, request: Request, next: Next) -> Response {
    let token = extract_token(&jar, request.headers());
    match token.map(|t| verify_admin_token(&t)) {
        Some(Ok(_)) => next.run(request).await,
        Some(Err(e)) => {
            tracing::debug!(error = %e, "rejected admin request: bad token");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid or expired session")),
            )
                .into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authentication required")),
        )
            .into_response(),
    }
}
