//! tale-publish: publish Whole Tale packages to DataONE.
//!
//! A publish run classifies the tale's items by where their bytes live,
//! uploads the local ones together with generated members (package info,
//! license, environment archive), describes everything in an EML record and
//! ties the package together with an OAI-ORE resource map.

pub mod cli;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod metrics;
pub mod pid;
pub mod publish;
pub mod repository;
pub mod storage;

// Re-export commonly used types
pub use error::{
    AuthError, ClassificationError, FetchError, IdentityError, MetadataError, StorageError,
    UploadError,
};
pub use pid::Pid;
pub use publish::{
    publish_tale, PublishConfig, PublishError, PublishPipeline, PublishReport, PublishRequest,
    PublishStep,
};
