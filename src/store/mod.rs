//! File-backed record store.
//!
//! Each collection is a single JSON file under the data directory; every
//! mutation is a read-modify-write of the whole file, serialized through a
//! per-collection mutex so concurrent admin writes cannot drop each other's
//! changes. Read failures are swallowed to empty lists so public pages keep
//! rendering; write failures surface to the caller.

pub mod models;

use lazy_static::lazy_static;
use rand::distr::{Alphanumeric, SampleString};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access collection file: {0}")]
    Io(#[from] std::io::Error),
    #[error("collection file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

lazy_static! {
    static ref DATA_DIR: PathBuf =
        PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

    /// Singleton company profile document.
    pub static ref COMPANY: JsonDocument = JsonDocument::new(DATA_DIR.join("company.json"));

    pub static ref BLOGS: JsonCollection = JsonCollection::new(DATA_DIR.join("blogs.json"));
    pub static ref GALLERY_PROJECTS: JsonCollection =
        JsonCollection::new(DATA_DIR.join("gallery-projects.json"));
}

pub fn data_dir() -> &'static Path {
    DATA_DIR.as_path()
}

/// Generate an id for image records that never went through the media host:
/// millisecond timestamp plus a short random suffix.
pub fn generate_local_id() -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::rng(), 6);
    format!("local-{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// A single JSON object persisted to one file (the company profile).
pub struct JsonDocument {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Read the document; `None` when the file is missing or malformed.
    pub fn read(&self) -> Option<Value> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read document");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "malformed document");
                None
            }
        }
    }

    /// Replace the document wholesale.
    pub fn write(&self, value: &Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}

/// A JSON-array collection persisted to one file. Records are JSON objects
/// with an `id` field (integer for blogs and gallery projects, string for
/// images).
pub struct JsonCollection {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonCollection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// All records. Missing or malformed files come back as an empty list;
    /// the error is logged, never surfaced.
    pub fn list(&self) -> Vec<Value> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read collection");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Value>(&data) {
            Ok(value) => unwrap_envelope(value),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "malformed collection");
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &Value) -> Option<Value> {
        self.list().into_iter().find(|r| r.get("id") == Some(id))
    }

    /// First record whose `field` equals `needle` (blog-by-slug lookups).
    pub fn find_by(&self, field: &str, needle: &Value) -> Option<Value> {
        self.list()
            .into_iter()
            .find(|r| r.get(field) == Some(needle))
    }

    /// Append a record that already carries its id (image assets).
    pub fn insert(&self, record: Value) -> Result<Value, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.list();
        records.push(record.clone());
        self.write_records(&records)?;
        Ok(record)
    }

    /// Append a record, assigning `max(existing ids) + 1` as its integer id.
    /// An empty collection starts at 1. Deleting the highest id and creating
    /// again reuses that id; callers accept this for these collections.
    pub fn create_with_int_id(&self, mut record: Value) -> Result<Value, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.list();
        let next_id = records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;
        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".to_string(), Value::from(next_id));
        }
        records.push(record.clone());
        self.write_records(&records)?;
        Ok(record)
    }

    /// Shallow-merge `patch` into the record with the given id and rewrite
    /// the file. `Ok(None)` when no record matches.
    pub fn update(&self, id: &Value, patch: &Value) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.list();
        let Some(record) = records.iter_mut().find(|r| r.get("id") == Some(id)) else {
            return Ok(None);
        };
        merge_shallow(record, patch);
        // The id is not patchable; restore it in case the patch carried one.
        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".to_string(), id.clone());
        }
        let updated = record.clone();
        self.write_records(&records)?;
        Ok(Some(updated))
    }

    /// Replace the record with the given id wholesale.
    pub fn replace(&self, id: &Value, mut record: Value) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.list();
        let Some(slot) = records.iter_mut().find(|r| r.get("id") == Some(id)) else {
            return Ok(None);
        };
        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".to_string(), id.clone());
        }
        *slot = record.clone();
        self.write_records(&records)?;
        Ok(Some(record))
    }

    /// Remove the record with the given id. Returns `false` when nothing
    /// matched (the array length was unchanged).
    pub fn delete(&self, id: &Value) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records = self.list();
        let before = records.len();
        records.retain(|r| r.get("id") != Some(id));
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(&records)?;
        Ok(true)
    }

    /// Overwrite the whole collection (gallery bulk PUT).
    pub fn write_all(&self, records: &[Value]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_records(records)
    }

    fn write_records(&self, records: &[Value]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&records)?)?;
        Ok(())
    }
}

/// Earlier revisions of the site wrote `images.json` as `{"images": [...]}`.
/// Accept that wrapper on read; the next write rewrites the canonical bare
/// array.
fn unwrap_envelope(value: Value) -> Vec<Value> {
    match value {
        Value::Array(records) => records,
        Value::Object(mut obj) => match obj.remove("images") {
            Some(Value::Array(records)) => records,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn merge_shallow(record: &mut Value, patch: &Value) {
    let (Some(target), Some(source)) = (record.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_collection(dir: &tempfile::TempDir, name: &str) -> JsonCollection {
        JsonCollection::new(dir.path().join(name))
    }

    #[test]
    fn test_list_missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "missing.json");
        assert!(col.list().is_empty());
    }

    #[test]
    fn test_list_malformed_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let col = JsonCollection::new(path);
        assert!(col.list().is_empty());
    }

    #[test]
    fn test_list_accepts_images_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("images.json");
        std::fs::write(&path, r#"{"images": [{"id": "a"}, {"id": "b"}]}"#).unwrap();
        let col = JsonCollection::new(path.clone());
        assert_eq!(col.list().len(), 2);

        // Any write migrates the file back to a bare array.
        col.insert(json!({"id": "c"})).unwrap();
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.is_array());
        assert_eq!(raw.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_create_on_empty_collection_assigns_id_one() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "projects.json");
        let created = col.create_with_int_id(json!({"title": "Kitchen"})).unwrap();
        assert_eq!(created["id"], json!(1));
    }

    #[test]
    fn test_create_assigns_max_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "projects.json");
        col.write_all(&[json!({"id": 3}), json!({"id": 7})]).unwrap();
        let created = col.create_with_int_id(json!({"title": "Bath"})).unwrap();
        assert_eq!(created["id"], json!(8));
    }

    #[test]
    fn test_create_after_deleting_max_reuses_id() {
        // Documented gap: ids are not unique across a record's lifetime.
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "projects.json");
        let first = col.create_with_int_id(json!({"title": "a"})).unwrap();
        assert!(col.delete(&first["id"]).unwrap());
        let second = col.create_with_int_id(json!({"title": "b"})).unwrap();
        assert_eq!(first["id"], second["id"]);
    }

    #[test]
    fn test_round_trip_create_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "projects.json");
        let input = json!({
            "title": "Desert Modern Kitchen",
            "category": "kitchen",
            "features": ["quartz counters", "island"]
        });
        let created = col.create_with_int_id(input.clone()).unwrap();
        let id = created["id"].clone();

        let fetched = col.get(&id).unwrap();
        let mut expected = input;
        expected["id"] = id.clone();
        assert_eq!(fetched, expected);

        assert!(col.delete(&id).unwrap());
        assert!(col.get(&id).is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "blogs.json");
        let created = col.create_with_int_id(json!({"title": "post"})).unwrap();
        assert!(col.delete(&created["id"]).unwrap());
        assert!(!col.delete(&created["id"]).unwrap());
    }

    #[test]
    fn test_update_is_shallow_merge_and_preserves_id() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "blogs.json");
        let created = col
            .create_with_int_id(json!({"title": "old", "author": "Team"}))
            .unwrap();
        let updated = col
            .update(&created["id"], &json!({"title": "new", "id": 999}))
            .unwrap()
            .unwrap();
        assert_eq!(updated["title"], json!("new"));
        assert_eq!(updated["author"], json!("Team"));
        assert_eq!(updated["id"], created["id"]);
    }

    #[test]
    fn test_update_unknown_id_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "blogs.json");
        assert!(col.update(&json!(42), &json!({"x": 1})).unwrap().is_none());
    }

    #[test]
    fn test_find_by_slug() {
        let dir = tempfile::tempdir().unwrap();
        let col = temp_collection(&dir, "blogs.json");
        col.create_with_int_id(json!({"slug": "monsoon-proofing"}))
            .unwrap();
        assert!(col.find_by("slug", &json!("monsoon-proofing")).is_some());
        assert!(col.find_by("slug", &json!("missing")).is_none());
    }

    #[test]
    fn test_concurrent_creates_both_survive() {
        // Two near-simultaneous creates used to race on the shared file and
        // drop one record; the per-collection mutex serializes them.
        let dir = tempfile::tempdir().unwrap();
        let col = std::sync::Arc::new(temp_collection(&dir, "projects.json"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let col = col.clone();
                std::thread::spawn(move || {
                    col.create_with_int_id(json!({"title": format!("project-{i}")}))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = col.list();
        assert_eq!(records.len(), 8);
        let mut ids: Vec<i64> = records
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8, "ids must be unique");
    }

    #[test]
    fn test_document_read_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("company.json"));
        assert!(doc.read().is_none());
        doc.write(&json!({"name": "REMODELY LLC"})).unwrap();
        assert_eq!(doc.read().unwrap()["name"], json!("REMODELY LLC"));
    }

    #[test]
    fn test_generate_local_id_shape() {
        let id = generate_local_id();
        assert!(id.starts_with("local-"));
        assert_ne!(id, generate_local_id());
    }
}
