//! Storage layer access for the items being published.
//!
//! Items live in a Girder instance. The pipeline only needs three
//! capabilities from it: resolve an item to its file object, download a
//! file's bytes, and read arbitrary JSON records. Typed lookups for the
//! tale, user, image and recipe records are layered on top of `get_json`.

pub mod girder;
pub mod types;

use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StorageError;

pub use girder::GirderClient;
pub use types::{FileObject, Image, Item, Recipe, Tale, User};

/// Capability interface over the storage backend.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Returns the first file object stored in `item_id`, or `None` when the
    /// item holds no file.
    async fn get_object(&self, item_id: &str) -> Result<Option<FileObject>, StorageError>;

    /// Downloads the bytes of `file_id` into `dest`, returning the byte count.
    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, StorageError>;

    /// Reads the JSON document at `path`, relative to the API root.
    async fn get_json(&self, path: &str) -> Result<Value, StorageError>;

    async fn get_item(&self, item_id: &str) -> Result<Item, StorageError> {
        decode(self.get_json(&format!("item/{}", item_id)).await?)
    }

    /// Repository path of an item, e.g. `/collection/WholeTale Catalog/data.csv`.
    async fn item_path(&self, item_id: &str) -> Result<String, StorageError> {
        let value = self
            .get_json(&format!("resource/{}/path?type=item", item_id))
            .await?;
        match value {
            Value::String(path) => Ok(path),
            other => Err(StorageError::ParseError(format!(
                "expected a path string for item {}, got {}",
                item_id, other
            ))),
        }
    }

    async fn get_tale(&self, tale_id: &str) -> Result<Tale, StorageError> {
        decode(self.get_json(&format!("tale/{}", tale_id)).await?)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, StorageError> {
        decode(self.get_json(&format!("user/{}", user_id)).await?)
    }

    async fn get_image(&self, image_id: &str) -> Result<Image, StorageError> {
        decode(self.get_json(&format!("image/{}", image_id)).await?)
    }

    async fn get_recipe(&self, recipe_id: &str) -> Result<Recipe, StorageError> {
        decode(self.get_json(&format!("recipe/{}", recipe_id)).await?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StorageError> {
    serde_json::from_value(value).map_err(|e| StorageError::ParseError(e.to_string()))
}
