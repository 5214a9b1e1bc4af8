//! Publishing tales into a repository.
//!
//! `PublishPipeline` drives one publish run over injected storage,
//! repository and fetcher collaborators; `publish_tale` wires the HTTP
//! implementations from a `PublishConfig`.

pub mod classify;
pub mod config;
pub mod environment;
pub mod fetch;
pub mod orchestrator;
pub mod package_info;
pub mod upload;

pub use classify::{classify, Classified, Location};
pub use config::{ConfigError, PublishConfig};
pub use fetch::{Fetcher, HttpFetcher};
pub use orchestrator::{
    publish_tale, PublishError, PublishPipeline, PublishReport, PublishRequest, PublishStep,
};
pub use package_info::{ExternalFile, PackageInfo, API_VERSION};
pub use upload::{build_and_upload_resource_map, upload};
