//! Record types for the JSON-file collections (used by serde on the wire and
//! on disk).

use serde::{Deserialize, Serialize};

/// Singleton company profile, replaced wholesale on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub license: String,
    pub description: String,
    pub founded: String,
    #[serde(default)]
    pub employees: String,
    #[serde(default)]
    pub projects_completed: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        Self {
            name: "REMODELY LLC".to_string(),
            tagline: "Transforming Arizona Homes with Excellence".to_string(),
            address: "15464 W Aster Dr, Surprise, AZ 85379".to_string(),
            phone: "(480) 255-5887".to_string(),
            email: "help.remodely@gmail.com".to_string(),
            website: "www.remodely.com".to_string(),
            license: String::new(),
            description: "Arizona's premier remodeling company specializing in kitchen \
                          renovations, bathroom remodels, commercial spaces, and complete \
                          home transformations."
                .to_string(),
            founded: "2009".to_string(),
            employees: "25+".to_string(),
            projects_completed: "500+".to_string(),
            services: vec![
                "Kitchen Remodeling".to_string(),
                "Bathroom Renovation".to_string(),
                "Commercial Remodeling".to_string(),
                "Interior Design".to_string(),
                "Home Additions".to_string(),
                "Flooring Installation".to_string(),
            ],
            last_updated: None,
        }
    }
}

/// Blog post; looked up by slug on public reads, by integer id on deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_published() -> bool {
    true
}

/// Incoming blog post; the server assigns id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlogPost {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default = "default_published")]
    pub published: bool,
}

/// Gallery project; updated by full-record replace keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryProject {
    pub id: i64,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Incoming gallery project; the server assigns `max(ids) + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGalleryProject {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub budget: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Where an image record's bytes actually live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Cloudinary,
    Local,
    Demo,
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::Local
    }
}

/// Cloudinary-specific metadata kept alongside remote-hosted assets.
/// Field names mirror the media host's API, hence snake_case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudinaryInfo {
    pub public_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Image asset metadata record. The id is the remote host's public id for
/// cloudinary-sourced assets, or a generated `local-...` token otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub upload_date: String,
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default)]
    pub source: ImageSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudinary: Option<CloudinaryInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_profile_default_is_complete() {
        let profile = CompanyProfile::default();
        assert!(!profile.name.is_empty());
        assert!(!profile.services.is_empty());
    }

    #[test]
    fn test_image_asset_parses_sparse_record() {
        // Records written by earlier revisions carry only a handful of fields.
        let asset: ImageAsset = serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "Modern Kitchen Renovation",
            "url": "https://example.com/kitchen.jpg"
        }))
        .unwrap();
        assert_eq!(asset.source, ImageSource::Local);
        assert!(asset.tags.is_empty());
    }

    #[test]
    fn test_image_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ImageSource::Cloudinary).unwrap(),
            "\"cloudinary\""
        );
    }
}
