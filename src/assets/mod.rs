//! Image Asset Gateway.
//!
//! Mediates between the Cloudinary client and the local image-metadata
//! collection. Listings walk a three-tier fallback chain (remote host →
//! local JSON file → fixed demo set) so the public gallery never renders
//! empty or errors; uploads go to the remote host only and surface failures.

use crate::cloudinary::{CloudinaryClient, CloudinaryError, GALLERY_FOLDER};
use crate::store::models::{CloudinaryInfo, ImageAsset, ImageSource};
use crate::store::{JsonCollection, StoreError};
use lazy_static::lazy_static;
use serde_json::Value;

/// Read-path policy: listing failures degrade through the fallback chain
/// instead of surfacing. Deliberately asymmetric with uploads.
pub const LIST_DEGRADES_ON_FAILURE: bool = true;

/// Write-path policy: upload failures surface to the caller; there is no
/// local-disk fallback for uploads.
pub const UPLOAD_DEGRADES_ON_FAILURE: bool = false;

lazy_static! {
    /// Process-wide gateway over the shared `images.json` collection.
    pub static ref GATEWAY: AssetGateway = AssetGateway::new(
        CloudinaryClient::from_env(),
        JsonCollection::new(crate::store::data_dir().join("images.json")),
    );
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Remote(#[from] CloudinaryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A listing plus the tier of the fallback chain that produced it.
#[derive(Debug)]
pub struct ImageListing {
    pub images: Vec<ImageAsset>,
    pub source: ImageSource,
}

pub struct AssetGateway {
    cloudinary: CloudinaryClient,
    images: JsonCollection,
}

impl AssetGateway {
    pub fn new(cloudinary: CloudinaryClient, images: JsonCollection) -> Self {
        Self { cloudinary, images }
    }

    /// The image-metadata collection; admin record CRUD goes through here so
    /// every writer shares one serialization point.
    pub fn images(&self) -> &JsonCollection {
        &self.images
    }

    pub fn media_host_status(&self) -> &'static str {
        self.cloudinary.status()
    }

    /// List images through the fallback chain. Always succeeds; the terminal
    /// demo tier guarantees a non-empty gallery even with the media host and
    /// the local file both broken.
    pub async fn list_images(&self, category: Option<&str>) -> ImageListing {
        if self.cloudinary.is_available() {
            match self.cloudinary.search(GALLERY_FOLDER).await {
                Ok(resources) => {
                    let images = resources
                        .into_iter()
                        .map(asset_from_resource)
                        .filter(|img| matches_category(img, category))
                        .collect();
                    return ImageListing {
                        images,
                        source: ImageSource::Cloudinary,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "media host listing failed, falling back to local file");
                }
            }
        }

        let local: Vec<ImageAsset> = self
            .images
            .list()
            .into_iter()
            .filter_map(|record| serde_json::from_value::<ImageAsset>(record).ok())
            .collect();
        if !local.is_empty() {
            let images = local
                .into_iter()
                .map(|mut img| {
                    // Everything served from the local file is tagged local,
                    // whatever its record claims.
                    img.source = ImageSource::Local;
                    img
                })
                .filter(|img| matches_category(img, category))
                .collect();
            return ImageListing {
                images,
                source: ImageSource::Local,
            };
        }

        tracing::warn!("local image file empty or unreadable, serving demo fallback");
        ImageListing {
            images: demo_images()
                .into_iter()
                .filter(|img| matches_category(img, category))
                .collect(),
            source: ImageSource::Demo,
        }
    }

    /// Upload bytes to the media host and persist the resulting metadata.
    /// No local fallback: failures surface.
    pub async fn upload(
        &self,
        bytes: &[u8],
        filename: &str,
        category: &str,
        extra_tags: &[String],
    ) -> Result<ImageAsset, GatewayError> {
        let mut tags = vec!["remodely".to_string(), category.to_lowercase()];
        tags.extend(extra_tags.iter().cloned());

        let result = self.cloudinary.upload(bytes, GALLERY_FOLDER, &tags).await?;
        tracing::info!(public_id = %result.public_id, "media host upload succeeded");

        let now = chrono::Utc::now();
        let asset = ImageAsset {
            id: result.public_id.clone(),
            name: strip_extension(filename),
            url: result.secure_url.clone(),
            category: category.to_string(),
            description: format!("Uploaded image: {filename}"),
            tags: tags.clone(),
            size: if result.bytes > 0 {
                result.bytes
            } else {
                bytes.len() as u64
            },
            width: result.width,
            height: result.height,
            format: result.format.clone(),
            upload_date: now.format("%Y-%m-%d").to_string(),
            uploaded_at: now.to_rfc3339(),
            source: ImageSource::Cloudinary,
            cloudinary: Some(CloudinaryInfo {
                public_id: result.public_id,
                width: result.width,
                height: result.height,
                format: result.format,
                tags,
            }),
        };

        self.images.insert(serde_json::to_value(&asset).map_err(StoreError::from)?)?;
        Ok(asset)
    }

    /// Delete an asset record; cloudinary-sourced assets are destroyed on the
    /// remote host first. A remote failure is logged and does not block the
    /// local delete, so the two stores can drift until the next cleanup.
    pub async fn delete(&self, id: &str) -> Result<bool, GatewayError> {
        let id_value = Value::from(id);
        if let Some(record) = self.images.get(&id_value) {
            if record.get("source") == Some(&Value::from("cloudinary")) {
                let public_id = record
                    .get("cloudinary")
                    .and_then(|c| c.get("public_id"))
                    .and_then(Value::as_str)
                    .unwrap_or(id);
                if let Err(e) = self.cloudinary.destroy(public_id).await {
                    tracing::warn!(public_id, error = %e, "remote destroy failed, deleting local record anyway");
                }
            }
        }
        Ok(self.images.delete(&id_value)?)
    }

    /// Shallow-merge metadata update on the record store.
    pub fn update_metadata(&self, id: &str, patch: &Value) -> Result<Option<Value>, StoreError> {
        self.images.update(&Value::from(id), patch)
    }

    /// Substring search over name, description, category, and tags of the
    /// current listing.
    pub async fn search(&self, query: &str) -> Vec<ImageAsset> {
        let needle = query.to_lowercase();
        self.list_images(None)
            .await
            .images
            .into_iter()
            .filter(|img| {
                img.name.to_lowercase().contains(&needle)
                    || img.description.to_lowercase().contains(&needle)
                    || img.category.to_lowercase().contains(&needle)
                    || img.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Aggregate counts for the admin dashboard.
    pub async fn stats(&self) -> Value {
        let listing = self.list_images(None).await;
        let mut categories = serde_json::Map::new();
        let mut sources = serde_json::Map::new();
        let mut total_size: u64 = 0;
        for img in &listing.images {
            bump(&mut categories, &img.category);
            let source = serde_json::to_value(img.source)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            bump(&mut sources, &source);
            total_size += img.size;
        }
        serde_json::json!({
            "total": listing.images.len(),
            "categories": categories,
            "sources": sources,
            "totalSize": total_size,
        })
    }
}

fn bump(map: &mut serde_json::Map<String, Value>, key: &str) {
    let count = map.get(key).and_then(Value::as_u64).unwrap_or(0);
    map.insert(key.to_string(), Value::from(count + 1));
}

fn matches_category(img: &ImageAsset, category: Option<&str>) -> bool {
    match category {
        Some(wanted) => img.category.eq_ignore_ascii_case(wanted),
        None => true,
    }
}

fn strip_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => filename.to_string(),
    }
}

fn asset_from_resource(resource: crate::cloudinary::SearchResource) -> ImageAsset {
    let name = resource
        .display_name
        .clone()
        .unwrap_or_else(|| {
            resource
                .public_id
                .rsplit('/')
                .next()
                .unwrap_or(&resource.public_id)
                .to_string()
        });
    ImageAsset {
        id: resource.public_id.clone(),
        name,
        url: resource.secure_url.clone(),
        category: category_from_path(&resource.public_id),
        description: String::new(),
        tags: resource.tags.clone(),
        size: resource.bytes,
        width: resource.width,
        height: resource.height,
        format: resource.format.clone(),
        upload_date: resource.created_at.clone(),
        uploaded_at: resource.created_at.clone(),
        source: ImageSource::Cloudinary,
        cloudinary: Some(CloudinaryInfo {
            public_id: resource.public_id,
            width: resource.width,
            height: resource.height,
            format: resource.format,
            tags: resource.tags,
        }),
    }
}

/// Derive a display category from the remote folder path.
fn category_from_path(public_id: &str) -> String {
    let path = public_id.to_lowercase();
    let category = if path.contains("kitchen") {
        "Kitchen"
    } else if path.contains("bathroom") {
        "Bathroom"
    } else if path.contains("living") {
        "Living Room"
    } else if path.contains("bedroom") {
        "Bedroom"
    } else if path.contains("commercial") {
        "Commercial"
    } else if path.contains("outdoor") {
        "Outdoor"
    } else {
        "Kitchen"
    };
    category.to_string()
}

/// Fixed placeholder set served when both the media host and the local file
/// are unavailable.
pub fn demo_images() -> Vec<ImageAsset> {
    let now = chrono::Utc::now().to_rfc3339();
    let entries = [
        (
            "demo-1",
            "Modern Kitchen Remodel",
            "https://picsum.photos/800/600?random=kitchen1",
            "Kitchen",
            vec!["modern", "kitchen", "remodel"],
            150_000,
        ),
        (
            "demo-2",
            "Luxury Bathroom",
            "https://picsum.photos/800/600?random=bathroom1",
            "Bathroom",
            vec!["luxury", "bathroom", "spa"],
            160_000,
        ),
        (
            "demo-3",
            "Commercial Office Space",
            "https://picsum.photos/800/600?random=commercial1",
            "Commercial",
            vec!["commercial", "office", "modern"],
            140_000,
        ),
    ];
    entries
        .into_iter()
        .map(|(id, name, url, category, tags, size)| ImageAsset {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            category: category.to_string(),
            description: String::new(),
            tags: tags.into_iter().map(str::to_string).collect(),
            size,
            width: 800,
            height: 600,
            format: "jpg".to_string(),
            upload_date: now.clone(),
            uploaded_at: now.clone(),
            source: ImageSource::Demo,
            cloudinary: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_gateway(dir: &tempfile::TempDir) -> AssetGateway {
        AssetGateway::new(
            CloudinaryClient::unconfigured(),
            JsonCollection::new(dir.path().join("images.json")),
        )
    }

    #[tokio::test]
    async fn test_listing_falls_back_to_local_file_entries() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);
        gateway
            .images()
            .insert(json!({
                "id": "a",
                "name": "Granite Counters",
                "url": "/uploads/granite.jpg",
                "category": "Kitchen",
                "source": "cloudinary"
            }))
            .unwrap();
        gateway
            .images()
            .insert(json!({
                "id": "b",
                "name": "Walk-in Shower",
                "url": "/uploads/shower.jpg",
                "category": "Bathroom"
            }))
            .unwrap();

        let listing = gateway.list_images(None).await;
        assert_eq!(listing.source, ImageSource::Local);
        assert_eq!(listing.images.len(), 2);
        assert!(listing
            .images
            .iter()
            .all(|img| img.source == ImageSource::Local));
    }

    #[tokio::test]
    async fn test_listing_serves_demo_set_when_everything_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);

        let listing = gateway.list_images(None).await;
        assert_eq!(listing.source, ImageSource::Demo);
        assert_eq!(listing.images.len(), 3);
        assert!(listing
            .images
            .iter()
            .all(|img| img.source == ImageSource::Demo));
    }

    #[tokio::test]
    async fn test_listing_category_filter() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);

        let listing = gateway.list_images(Some("Bathroom")).await;
        assert_eq!(listing.images.len(), 1);
        assert_eq!(listing.images[0].name, "Luxury Bathroom");
    }

    #[tokio::test]
    async fn test_upload_surfaces_failure_instead_of_degrading() {
        // The asymmetric policy: reads degrade, writes do not.
        assert!(LIST_DEGRADES_ON_FAILURE);
        assert!(!UPLOAD_DEGRADES_ON_FAILURE);

        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);
        let result = gateway.upload(b"\xFF\xD8\xFF", "photo.jpg", "Kitchen", &[]).await;
        assert!(matches!(
            result,
            Err(GatewayError::Remote(CloudinaryError::NotConfigured))
        ));
        assert!(gateway.images().list().is_empty(), "no local record on failed upload");
    }

    #[tokio::test]
    async fn test_delete_removes_local_record_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);
        gateway
            .images()
            .insert(json!({"id": "local-1", "name": "x", "url": "/uploads/x.jpg"}))
            .unwrap();

        assert!(gateway.delete("local-1").await.unwrap());
        assert!(!gateway.delete("local-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_of_remote_asset_proceeds_when_destroy_fails() {
        // The remote destroy fails (no credentials) but the record still goes.
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);
        gateway
            .images()
            .insert(json!({
                "id": "remodely/kitchen/granite",
                "name": "Granite",
                "url": "https://res.cloudinary.com/x/granite.jpg",
                "source": "cloudinary",
                "cloudinary": {"public_id": "remodely/kitchen/granite"}
            }))
            .unwrap();

        assert!(gateway.delete("remodely/kitchen/granite").await.unwrap());
        assert!(gateway.images().list().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_tags_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);
        gateway
            .images()
            .insert(json!({
                "id": "a",
                "name": "Spa Bathroom",
                "url": "/uploads/a.jpg",
                "tags": ["luxury"]
            }))
            .unwrap();
        gateway
            .images()
            .insert(json!({"id": "b", "name": "Office", "url": "/uploads/b.jpg"}))
            .unwrap();

        assert_eq!(gateway.search("spa").await.len(), 1);
        assert_eq!(gateway.search("luxury").await.len(), 1);
        assert_eq!(gateway.search("warehouse").await.len(), 0);
    }

    #[tokio::test]
    async fn test_stats_counts_categories_and_sources() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = offline_gateway(&dir);
        gateway
            .images()
            .insert(json!({"id": "a", "name": "x", "url": "u", "category": "Kitchen", "size": 100}))
            .unwrap();
        gateway
            .images()
            .insert(json!({"id": "b", "name": "y", "url": "u", "category": "Kitchen", "size": 50}))
            .unwrap();

        let stats = gateway.stats().await;
        assert_eq!(stats["total"], json!(2));
        assert_eq!(stats["categories"]["Kitchen"], json!(2));
        assert_eq!(stats["sources"]["local"], json!(2));
        assert_eq!(stats["totalSize"], json!(150));
    }

    #[test]
    fn test_category_from_path() {
        assert_eq!(category_from_path("remodely/bathroom/tiles"), "Bathroom");
        assert_eq!(category_from_path("remodely/misc/thing"), "Kitchen");
    }
}
