//! Error types for tale-publish operations.
//!
//! Defines error types for every collaborator of the publication pipeline:
//! - Storage lookups and downloads
//! - Repository sessions and object uploads
//! - External file fetches
//! - Metadata generation
//! - Reference classification and publisher identity

use thiserror::Error;

/// Errors raised by the storage (Girder) client.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Resource '{0}' not found")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Storage API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Failed to parse storage response: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that prevent a repository session from being established.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid member node URL '{0}'")]
    InvalidNode(String),

    #[error("Missing repository authentication token")]
    MissingToken,

    #[error("Member node unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to process your DataONE credentials: {0}. Please ensure you are logged into DataONE.")]
    InvalidCredentials(String),
}

/// A single object's create call was rejected or could not be delivered.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Repository rejected '{pid}' ({code} {name}): {description}")]
    Rejected {
        pid: String,
        code: u16,
        name: String,
        description: String,
    },

    #[error("Transport error while uploading '{pid}': {reason}")]
    Transport { pid: String, reason: String },

    #[error("Failed to read content for '{pid}': {source}")]
    Content {
        pid: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode system metadata for '{pid}': {reason}")]
    Encoding { pid: String, reason: String },
}

/// Errors fetching an externally hosted resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("There was a problem downloading an external file, {name} located at {url}: {reason}")]
    Download {
        name: String,
        url: String,
        reason: String,
    },

    #[error("Server returned {code} for {url}")]
    Status { url: String, code: u16 },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Storage lookup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors building metadata documents.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("XML serialization error: {0}")]
    Xml(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed document: {0}")]
    Document(String),

    #[error("Checksum computation failed: {0}")]
    Checksum(#[from] std::io::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// The publishing user cannot be identified as creator and contact.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Unable to find your name or email address. Please ensure you have authenticated with DataONE.")]
    MissingIdentity { missing: Vec<&'static str> },
}

/// An input item cannot be located.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Failed to find the file with ID {0}")]
    NotFound(String),

    #[error("Failed to resolve item {item}: {source}")]
    Storage {
        item: String,
        #[source]
        source: StorageError,
    },
}
