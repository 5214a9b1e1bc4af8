//! The package-info document (`tale.yml`).
//!
//! Records what is needed to rebuild the tale from the package: the tale's
//! category, format and config, where every item sat in storage, and the
//! URL and checksum of every item that was not copied into the package.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::fetch::Fetcher;
use crate::error::{FetchError, MetadataError, StorageError};
use crate::metadata::checksum::file_md5;
use crate::metadata::DESCRIPTIVE_RECORD_NAME;
use crate::storage::{StorageClient, Tale};

/// Version of the package-info layout.
pub const API_VERSION: &str = "2.1";

/// Placeholder for tale fields that are not set.
const MISSING: &str = "None";

/// An item referenced by URL instead of being copied into the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalFile {
    pub url: String,
    pub md5: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageInfo {
    pub version: String,
    pub identifier: String,
    pub metadata: String,
    pub category: String,
    pub format: String,
    pub config: String,
    /// Item name to storage path.
    pub paths: BTreeMap<String, String>,
    #[serde(rename = "external files", skip_serializing_if = "Option::is_none")]
    pub external_files: Option<BTreeMap<String, ExternalFile>>,
    /// Caller-supplied provenance fields, merged over the fields above.
    #[serde(skip)]
    pub prov_info: serde_yaml::Mapping,
}

impl PackageInfo {
    pub fn new(tale: &Tale) -> Self {
        Self {
            version: API_VERSION.to_string(),
            identifier: tale.id.clone(),
            metadata: format!("Metadata: {}", DESCRIPTIVE_RECORD_NAME),
            category: tale.category.clone().unwrap_or_else(|| MISSING.to_string()),
            format: render_field(tale.format.as_ref()),
            config: render_field(tale.config.as_ref()),
            paths: BTreeMap::new(),
            external_files: None,
            prov_info: serde_yaml::Mapping::new(),
        }
    }

    pub fn with_paths(mut self, paths: BTreeMap<String, String>) -> Self {
        self.paths = paths;
        self
    }

    /// Sets the external-files section; an empty map leaves it out.
    pub fn with_external_files(mut self, files: BTreeMap<String, ExternalFile>) -> Self {
        self.external_files = if files.is_empty() { None } else { Some(files) };
        self
    }

    pub fn with_prov_info(mut self, prov_info: serde_yaml::Mapping) -> Self {
        self.prov_info = prov_info;
        self
    }

    /// Serializes to YAML. Provenance keys that collide with fixed fields
    /// replace them in place.
    pub fn to_yaml(&self) -> Result<String, MetadataError> {
        let mut document = match serde_yaml::to_value(self)? {
            serde_yaml::Value::Mapping(mapping) => mapping,
            other => {
                return Err(MetadataError::Document(format!(
                    "package info did not serialize to a mapping: {:?}",
                    other
                )))
            }
        };
        for (key, value) in &self.prov_info {
            document.insert(key.clone(), value.clone());
        }
        Ok(serde_yaml::to_string(&document)?)
    }
}

fn render_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Maps every item's name to its storage path.
pub async fn collect_paths(
    storage: &dyn StorageClient,
    items: &[String],
) -> Result<BTreeMap<String, String>, StorageError> {
    let mut paths = BTreeMap::new();
    for item_id in items {
        let item = storage.get_item(item_id).await?;
        let path = storage.item_path(item_id).await?;
        paths.insert(item.name, path);
    }
    Ok(paths)
}

/// Fetches every linked item into a scratch file to checksum it.
///
/// # Errors
///
/// Any failed download aborts with `FetchError::Download` naming the file
/// and its URL.
pub async fn collect_external_files<'a>(
    storage: &dyn StorageClient,
    fetcher: &dyn Fetcher,
    items: impl IntoIterator<Item = &'a String>,
) -> Result<BTreeMap<String, ExternalFile>, FetchError> {
    let mut files = BTreeMap::new();
    for item_id in items {
        let Some(object) = storage.get_object(item_id).await? else {
            continue;
        };
        let Some(url) = object.external_url() else {
            continue;
        };

        let scratch = tempfile::NamedTempFile::new()?;
        fetcher
            .fetch(url, scratch.path())
            .await
            .map_err(|e| FetchError::Download {
                name: object.name.clone(),
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let digest = file_md5(scratch.path())?;

        tracing::debug!(item = %item_id, url, md5 = %digest.hex, "Checksummed external file");
        files.insert(
            object.name.clone(),
            ExternalFile {
                url: url.to_string(),
                md5: digest.hex,
            },
        );
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tale() -> Tale {
        Tale {
            id: "5c9a1b".to_string(),
            title: "t".to_string(),
            category: Some("science".to_string()),
            config: Some(json!({"memLimit": "2048m"})),
            ..Tale::default()
        }
    }

    #[test]
    fn test_fixed_fields() {
        let info = PackageInfo::new(&tale());
        assert_eq!(info.version, "2.1");
        assert_eq!(info.identifier, "5c9a1b");
        assert_eq!(info.metadata, "Metadata: science_metadata.xml");
        assert_eq!(info.category, "science");
        assert_eq!(info.format, "None");
        assert_eq!(info.config, r#"{"memLimit":"2048m"}"#);
    }

    #[test]
    fn test_yaml_without_external_files() {
        let mut paths = BTreeMap::new();
        paths.insert("data.csv".to_string(), "/collection/WholeTale Catalog/data.csv".to_string());
        let yaml = PackageInfo::new(&tale()).with_paths(paths).to_yaml().expect("yaml");

        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("parses");
        assert_eq!(parsed["version"], serde_yaml::Value::from("2.1"));
        assert_eq!(
            parsed["paths"]["data.csv"],
            serde_yaml::Value::from("/collection/WholeTale Catalog/data.csv")
        );
        assert!(!yaml.contains("external files"));
    }

    #[test]
    fn test_yaml_with_external_files_and_prov() {
        let mut external = BTreeMap::new();
        external.insert(
            "obs.csv".to_string(),
            ExternalFile {
                url: "https://example.org/obs.csv".to_string(),
                md5: "abc".to_string(),
            },
        );
        let mut prov = serde_yaml::Mapping::new();
        prov.insert("entrypoint".into(), "run.sh".into());
        prov.insert("category".into(), "overridden".into());

        let yaml = PackageInfo::new(&tale())
            .with_external_files(external)
            .with_prov_info(prov)
            .to_yaml()
            .expect("yaml");
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("parses");

        assert_eq!(
            parsed["external files"]["obs.csv"]["md5"],
            serde_yaml::Value::from("abc")
        );
        assert_eq!(parsed["entrypoint"], serde_yaml::Value::from("run.sh"));
        assert_eq!(parsed["category"], serde_yaml::Value::from("overridden"));
    }

    #[test]
    fn test_empty_external_files_omitted() {
        let info = PackageInfo::new(&tale()).with_external_files(BTreeMap::new());
        assert!(info.external_files.is_none());
    }
}
