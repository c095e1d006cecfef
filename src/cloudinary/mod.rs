//! Thin client for the Cloudinary REST API.
//!
//! Credentials come from the environment and are optional: every call is
//! gated on `is_available()`, and callers degrade to the local store when the
//! media host is not configured or unreachable. No retry or timeout policy
//! beyond the HTTP client defaults.

use base64::Engine;
use lazy_static::lazy_static;
use serde::Deserialize;
use sha2::{Digest, Sha256};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Folder that holds every asset this site manages on the media host.
pub const GALLERY_FOLDER: &str = "remodely";

/// Cap on a single search response, matching the host's page limit.
const SEARCH_MAX_RESULTS: u32 = 500;

lazy_static! {
    static ref ENV_CONFIG: Option<CloudinaryConfig> = CloudinaryConfig::from_env();
}

#[derive(Debug, thiserror::Error)]
pub enum CloudinaryError {
    #[error("cloudinary is not configured")]
    NotConfigured,
    #[error("cloudinary request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cloudinary rejected the request: {0}")]
    Api(String),
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryConfig {
    /// `None` unless all three credentials are present and non-empty.
    pub fn from_env() -> Option<Self> {
        let cloud_name = std::env::var("CLOUDINARY_CLOUD_NAME").ok()?;
        let api_key = std::env::var("CLOUDINARY_API_KEY").ok()?;
        let api_secret = std::env::var("CLOUDINARY_API_SECRET").ok()?;
        if cloud_name.is_empty() || api_key.is_empty() || api_secret.is_empty() {
            return None;
        }
        Some(Self {
            cloud_name,
            api_key,
            api_secret,
        })
    }
}

/// One resource row from the Admin API search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResource {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    resources: Vec<SearchResource>,
}

/// Result of a signed image upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct CloudinaryClient {
    config: Option<CloudinaryConfig>,
    http: reqwest::Client,
}

impl CloudinaryClient {
    pub fn from_env() -> Self {
        Self {
            config: ENV_CONFIG.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// A client with no credentials; every call fails with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self {
            config: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.config.is_some()
    }

    pub fn status(&self) -> &'static str {
        if self.is_available() {
            "configured"
        } else {
            "not configured"
        }
    }

    fn config(&self) -> Result<&CloudinaryConfig, CloudinaryError> {
        self.config.as_ref().ok_or(CloudinaryError::NotConfigured)
    }

    /// List every asset under `folder`, newest first, capped at one page.
    pub async fn search(&self, folder: &str) -> Result<Vec<SearchResource>, CloudinaryError> {
        let config = self.config()?;
        let url = format!("{API_BASE}/{}/resources/search", config.cloud_name);
        let body = serde_json::json!({
            "expression": format!("folder:{folder} OR folder:{folder}/*"),
            "sort_by": [{"created_at": "desc"}],
            "max_results": SEARCH_MAX_RESULTS,
        });

        let response = self
            .http
            .post(&url)
            .basic_auth(&config.api_key, Some(&config.api_secret))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(CloudinaryError::Api(format!("search returned {status}: {detail}")));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.resources)
    }

    /// Signed upload of raw image bytes into `folder`.
    pub async fn upload(
        &self,
        bytes: &[u8],
        folder: &str,
        tags: &[String],
    ) -> Result<UploadResult, CloudinaryError> {
        let config = self.config()?;
        let url = format!("{API_BASE}/{}/image/upload", config.cloud_name);

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let tags_joined = tags.join(",");
        let mut params: Vec<(&str, &str)> = vec![("folder", folder), ("timestamp", &timestamp)];
        if !tags_joined.is_empty() {
            params.push(("tags", &tags_joined));
        }
        let signature = sign_request(&params, &config.api_secret);

        // The upload endpoint accepts the payload as a base64 data URI.
        let data_uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );

        let mut form = reqwest::multipart::Form::new()
            .text("file", data_uri)
            .text("api_key", config.api_key.clone())
            .text("timestamp", timestamp.clone())
            .text("folder", folder.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        if !tags_joined.is_empty() {
            form = form.text("tags", tags_joined.clone());
        }

        let response = self.http.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(CloudinaryError::Api(format!("upload returned {status}: {detail}")));
        }
        Ok(response.json().await?)
    }

    /// Delete a remote asset by public id.
    pub async fn destroy(&self, public_id: &str) -> Result<(), CloudinaryError> {
        let config = self.config()?;
        let url = format!("{API_BASE}/{}/image/destroy", config.cloud_name);

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [("public_id", public_id), ("timestamp", timestamp.as_str())];
        let signature = sign_request(&params, &config.api_secret);

        let form = reqwest::multipart::Form::new()
            .text("public_id", public_id.to_string())
            .text("api_key", config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self.http.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(CloudinaryError::Api(format!("destroy returned {status}: {detail}")));
        }

        let parsed: DestroyResponse = response.json().await?;
        if parsed.result != "ok" {
            return Err(CloudinaryError::Api(format!("destroy result: {}", parsed.result)));
        }
        Ok(())
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as a query
/// string, with the API secret appended, hashed with SHA-256.
fn sign_request(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(name, _)| *name);
    let to_sign: String = sorted
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_client_is_unavailable() {
        let client = CloudinaryClient::unconfigured();
        assert!(!client.is_available());
        assert_eq!(client.status(), "not configured");
    }

    #[tokio::test]
    async fn test_unconfigured_search_fails_fast() {
        let client = CloudinaryClient::unconfigured();
        let err = client.search(GALLERY_FOLDER).await.unwrap_err();
        assert!(matches!(err, CloudinaryError::NotConfigured));
    }

    #[tokio::test]
    async fn test_unconfigured_destroy_fails_fast() {
        let client = CloudinaryClient::unconfigured();
        let err = client.destroy("remodely/kitchen").await.unwrap_err();
        assert!(matches!(err, CloudinaryError::NotConfigured));
    }

    #[test]
    fn test_sign_request_sorts_parameters() {
        let forward = sign_request(&[("folder", "remodely"), ("timestamp", "100")], "secret");
        let reversed = sign_request(&[("timestamp", "100"), ("folder", "remodely")], "secret");
        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), 64);
        assert!(forward.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sign_request_depends_on_secret() {
        let a = sign_request(&[("public_id", "x")], "secret-a");
        let b = sign_request(&[("public_id", "x")], "secret-b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_search_resource_parses_sparse_row() {
        let resource: SearchResource = serde_json::from_value(serde_json::json!({
            "public_id": "remodely/kitchen/granite",
            "secure_url": "https://res.cloudinary.com/demo/image/upload/granite.jpg"
        }))
        .unwrap();
        assert_eq!(resource.format, "");
        assert!(resource.tags.is_empty());
    }
}
