//! Storage records consumed by the pipeline.
//!
//! Field names follow the Girder JSON wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A file stored inside an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "mimeType", default = "default_mime_type")]
    pub mime_type: String,
    /// Set when the file is a link to an externally hosted resource.
    #[serde(rename = "linkUrl", default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
}

impl FileObject {
    /// The external link, if any. An empty link counts as no link.
    pub fn external_url(&self) -> Option<&str> {
        self.link_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// The tale being published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tale {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(rename = "imageId", default)]
    pub image_id: Option<String>,
}

/// The publishing user as recorded in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "recipeId")]
    pub recipe_id: String,
}

/// Build recipe of a compute environment: a git repository at a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: String,
    pub url: String,
    #[serde(rename = "commitId")]
    pub commit_id: String,
}

impl Recipe {
    /// URL of the downloadable archive of this recipe.
    pub fn tarball_url(&self) -> String {
        format!("{}/tarball/{}", self.url.trim_end_matches('/'), self.commit_id)
    }
}
