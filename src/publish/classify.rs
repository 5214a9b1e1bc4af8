//! Sorts input items by where their bytes physically live.

use serde::Serialize;

use crate::error::{ClassificationError, StorageError};
use crate::repository::Network;
use crate::storage::{FileObject, StorageClient};

/// Physical location of an item's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Stored by the storage service itself.
    Local,
    /// Linked to an object already inside the target network.
    DataOneRemote,
    /// Linked to any other URL.
    OtherRemote,
}

impl Location {
    pub fn of(object: &FileObject, network: Network) -> Self {
        match object.external_url() {
            Some(url) if network.hosts_url(url) => Location::DataOneRemote,
            Some(_) => Location::OtherRemote,
            None => Location::Local,
        }
    }
}

/// Items partitioned by location. Each list keeps input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classified {
    pub dataone: Vec<String>,
    pub remote: Vec<String>,
    pub local_refs: Vec<String>,
    /// File objects of `local_refs`, index-aligned.
    pub local_objects: Vec<FileObject>,
}

impl Classified {
    pub fn len(&self) -> usize {
        self.dataone.len() + self.remote.len() + self.local_refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items whose content lives outside storage: remote first, then DataONE.
    pub fn external(&self) -> impl Iterator<Item = &String> {
        self.remote.iter().chain(self.dataone.iter())
    }

    /// Items described in the package record: DataONE, local, then remote.
    pub fn described(&self) -> impl Iterator<Item = &String> {
        self.dataone
            .iter()
            .chain(self.local_refs.iter())
            .chain(self.remote.iter())
    }
}

/// Resolves each item's first file object and sorts the item by location.
///
/// # Errors
///
/// Fails the whole batch with `ClassificationError::NotFound` when an item
/// does not exist or has no file object.
pub async fn classify(
    storage: &dyn StorageClient,
    items: &[String],
    network: Network,
) -> Result<Classified, ClassificationError> {
    let mut classified = Classified::default();

    for item in items {
        let object = storage
            .get_object(item)
            .await
            .map_err(|source| match source {
                StorageError::NotFound(_) => ClassificationError::NotFound(item.clone()),
                source => ClassificationError::Storage {
                    item: item.clone(),
                    source,
                },
            })?
            .ok_or_else(|| ClassificationError::NotFound(item.clone()))?;

        let location = Location::of(&object, network);
        tracing::debug!(item = %item, ?location, "Classified item");
        match location {
            Location::DataOneRemote => classified.dataone.push(item.clone()),
            Location::OtherRemote => classified.remote.push(item.clone()),
            Location::Local => {
                classified.local_refs.push(item.clone());
                classified.local_objects.push(object);
            }
        }
    }

    Ok(classified)
}
