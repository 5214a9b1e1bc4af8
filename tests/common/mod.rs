//! In-memory collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};

use tale_publish::error::{AuthError, FetchError, StorageError, UploadError};
use tale_publish::metadata::SystemMetadata;
use tale_publish::publish::Fetcher;
use tale_publish::repository::RepositoryClient;
use tale_publish::storage::StorageClient;
use tale_publish::Pid;

pub const RECIPE_URL: &str = "https://github.com/whole-tale/jupyter-base";
pub const RECIPE_COMMIT: &str = "b45f9a5";
pub const PUBLISHER: &str = "http://orcid.org/0000-0002-1756-2128";

/// A JWT whose payload carries `userId`.
pub fn token_for(user_id: &str) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(json!({ "userId": user_id }).to_string())
    )
}

pub fn environment_url() -> String {
    format!("{}/tarball/{}", RECIPE_URL, RECIPE_COMMIT)
}

/// Girder stand-in keyed by API path.
#[derive(Default)]
pub struct MockStorage {
    documents: HashMap<String, Value>,
    files: HashMap<String, Value>,
    contents: HashMap<String, Vec<u8>>,
}

impl MockStorage {
    /// Storage holding a tale with an image and recipe, and its owner.
    pub fn with_tale(tale_id: &str, user: Value) -> Self {
        let mut storage = Self::default();
        storage.documents.insert(
            format!("tale/{}", tale_id),
            json!({
                "_id": tale_id,
                "title": "Soil moisture across a watershed gradient",
                "description": "<p>Reproducible <em>analysis</em></p>",
                "category": "science",
                "config": {"memLimit": "2048m"},
                "imageId": "image1"
            }),
        );
        storage.documents.insert(
            "image/image1".to_string(),
            json!({"_id": "image1", "recipeId": "recipe1"}),
        );
        storage.documents.insert(
            "recipe/recipe1".to_string(),
            json!({"_id": "recipe1", "url": RECIPE_URL, "commitId": RECIPE_COMMIT}),
        );
        let user_id = user
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or("user1")
            .to_string();
        storage.documents.insert(format!("user/{}", user_id), user);
        storage
    }

    pub fn add_local_item(&mut self, item_id: &str, name: &str, mime_type: &str, content: &[u8]) {
        let file_id = format!("file-{}", item_id);
        self.add_item(item_id, name, content.len() as u64);
        self.files.insert(
            item_id.to_string(),
            json!({"_id": file_id, "name": name, "size": content.len(), "mimeType": mime_type}),
        );
        self.contents.insert(file_id, content.to_vec());
    }

    pub fn add_linked_item(&mut self, item_id: &str, name: &str, link_url: &str) {
        self.add_item(item_id, name, 0);
        self.files.insert(
            item_id.to_string(),
            json!({
                "_id": format!("file-{}", item_id),
                "name": name,
                "size": 0,
                "mimeType": "text/csv",
                "linkUrl": link_url
            }),
        );
    }

    /// An item with no file object at all.
    pub fn add_empty_item(&mut self, item_id: &str, name: &str) {
        self.add_item(item_id, name, 0);
    }

    fn add_item(&mut self, item_id: &str, name: &str, size: u64) {
        self.documents.insert(
            format!("item/{}", item_id),
            json!({"_id": item_id, "name": name, "size": size, "description": format!("{} data", name)}),
        );
        self.documents.insert(
            format!("resource/{}/path?type=item", item_id),
            Value::String(format!("/collection/WholeTale Catalog/{}", name)),
        );
    }
}

#[async_trait]
impl StorageClient for MockStorage {
    async fn get_object(&self, item_id: &str) -> Result<Option<tale_publish::storage::FileObject>, StorageError> {
        match self.files.get(item_id) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| StorageError::ParseError(e.to_string())),
            None if self.documents.contains_key(&format!("item/{}", item_id)) => Ok(None),
            None => Err(StorageError::NotFound(format!("item/{}", item_id))),
        }
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, StorageError> {
        let content = self
            .contents
            .get(file_id)
            .ok_or_else(|| StorageError::NotFound(format!("file/{}", file_id)))?;
        std::fs::write(dest, content)?;
        Ok(content.len() as u64)
    }

    async fn get_json(&self, path: &str) -> Result<Value, StorageError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

/// One accepted create call.
#[derive(Debug, Clone)]
pub struct CreatedObject {
    pub pid: Pid,
    pub format_id: String,
    pub file_name: String,
    pub size: u64,
    pub checksum: String,
    pub content: Vec<u8>,
}

/// Member node stand-in that records every create call.
#[derive(Default)]
pub struct MockRepository {
    pub created: Mutex<Vec<CreatedObject>>,
    pub create_calls: AtomicUsize,
    pub ping_calls: AtomicUsize,
    reject_names: HashSet<String>,
    unreachable: bool,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects create calls for objects with this file name.
    pub fn rejecting(mut self, file_name: &str) -> Self {
        self.reject_names.insert(file_name.to_string());
        self
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<CreatedObject> {
        self.created.lock().expect("lock").clone()
    }

    pub fn created_named(&self, file_name: &str) -> Option<CreatedObject> {
        self.created().into_iter().find(|o| o.file_name == file_name)
    }
}

#[async_trait]
impl RepositoryClient for MockRepository {
    async fn ping(&self) -> Result<(), AuthError> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(AuthError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }

    async fn create(
        &self,
        pid: &Pid,
        content: Vec<u8>,
        sysmeta: &SystemMetadata,
    ) -> Result<(), UploadError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_names.contains(&sysmeta.file_name) {
            return Err(UploadError::Rejected {
                pid: pid.to_string(),
                code: 413,
                name: "InsufficientResources".to_string(),
                description: "quota exceeded".to_string(),
            });
        }

        let mut created = self.created.lock().expect("lock");
        if created.iter().any(|o| &o.pid == pid) {
            return Err(UploadError::Rejected {
                pid: pid.to_string(),
                code: 409,
                name: "IdentifierNotUnique".to_string(),
                description: "duplicate pid".to_string(),
            });
        }
        created.push(CreatedObject {
            pid: pid.clone(),
            format_id: sysmeta.format_id.clone(),
            file_name: sysmeta.file_name.clone(),
            size: sysmeta.size,
            checksum: sysmeta.checksum.value.clone(),
            content,
        });
        Ok(())
    }
}

/// Fetcher serving canned bodies by URL.
#[derive(Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.get(url).ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            code: 404,
        })?;
        std::fs::write(dest, body)?;
        Ok(body.len() as u64)
    }
}
