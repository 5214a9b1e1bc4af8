//! Girder REST API client.
//!
//! Authenticates with a `Girder-Token` header and streams file downloads to
//! disk chunk by chunk.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use super::{FileObject, StorageClient};
use crate::error::StorageError;

/// Client for a Girder instance.
#[derive(Debug, Clone)]
pub struct GirderClient {
    api_url: String,
    token: String,
    http_client: Client,
}

impl GirderClient {
    /// Create a client for the API rooted at `api_url`
    /// (e.g. `https://girder.dev.wholetale.org/api/v1`).
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http_client,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn send_get(&self, path: &str) -> Result<Response, StorageError> {
        let response = self
            .http_client
            .get(self.url(path))
            .header("Girder-Token", &self.token)
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        // Girder reports errors as {"message": ..., "type": ...}
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        Err(StorageError::ApiError {
            code: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl StorageClient for GirderClient {
    async fn get_object(&self, item_id: &str) -> Result<Option<FileObject>, StorageError> {
        let files: Vec<FileObject> = self
            .send_get(&format!("item/{}/files?limit=1", item_id))
            .await?
            .json()
            .await
            .map_err(|e| StorageError::ParseError(e.to_string()))?;
        Ok(files.into_iter().next())
    }

    async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, StorageError> {
        let mut response = self
            .send_get(&format!("file/{}/download", file_id))
            .await?;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| StorageError::RequestFailed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        tracing::debug!(file_id, bytes = written, "Downloaded file from storage");
        Ok(written)
    }

    async fn get_json(&self, path: &str) -> Result<Value, StorageError> {
        self.send_get(path)
            .await?
            .json()
            .await
            .map_err(|e| StorageError::ParseError(e.to_string()))
    }
}
