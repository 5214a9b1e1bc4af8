//! Publication pipeline.
//!
//! Runs one publish strictly in sequence:
//! 1. Authenticate against the member node and read the publisher's id
//! 2. Classify the items by location
//! 3. Upload local objects (best-effort per object)
//! 4. Upload the package-info document
//! 5. Upload the license text (best-effort)
//! 6. Upload the environment archive (best-effort)
//! 7. Upload the descriptive record, leaving out items whose upload failed
//! 8. Upload the resource map over every object that made it
//! 9. Return the landing page of the resource map
//!
//! Best-effort steps log a warning and leave their object out; every other
//! failure aborts the run with a `PublishError` naming the step.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use super::classify::{classify, Classified};
use super::config::{ConfigError, PublishConfig};
use super::environment::upload_environment;
use super::fetch::{Fetcher, HttpFetcher};
use super::package_info::{collect_external_files, collect_paths, PackageInfo};
use super::upload::{build_and_upload_resource_map, upload};
use crate::error::{
    AuthError, ClassificationError, FetchError, IdentityError, MetadataError, StorageError,
    UploadError,
};
use crate::identity::extract_user_id;
use crate::metadata::{
    create_descriptive_record, find_license, generate_system_metadata, Content, ExtraFile,
    FileSizes, FileStream, ObjectEntry, DESCRIPTIVE_RECORD_NAME, EML_FORMAT_ID,
};
use crate::metrics::MetricsCollector;
use crate::pid::Pid;
use crate::repository::{MemberNodeClient, RepositoryClient};
use crate::storage::{FileObject, GirderClient, StorageClient, Tale, User};

/// A stage of the publish run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    Configure,
    Authenticate,
    LoadTale,
    Classify,
    LocalObjects,
    PackageInfo,
    License,
    Environment,
    DescriptiveRecord,
    ResourceMap,
}

impl PublishStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStep::Configure => "configure",
            PublishStep::Authenticate => "authenticate",
            PublishStep::LoadTale => "load_tale",
            PublishStep::Classify => "classify",
            PublishStep::LocalObjects => "local_objects",
            PublishStep::PackageInfo => "package_info",
            PublishStep::License => "license",
            PublishStep::Environment => "environment",
            PublishStep::DescriptiveRecord => "descriptive_record",
            PublishStep::ResourceMap => "resource_map",
        }
    }
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to establish connection with DataONE: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("{step}: storage error: {source}")]
    Storage {
        step: PublishStep,
        source: StorageError,
    },

    #[error("{step}: {source}")]
    Fetch { step: PublishStep, source: FetchError },

    #[error("{step}: {source}")]
    Metadata {
        step: PublishStep,
        source: MetadataError,
    },

    #[error("{step}: {source}")]
    Upload {
        step: PublishStep,
        source: UploadError,
    },

    #[error("{step}: IO error: {source}")]
    Io {
        step: PublishStep,
        source: std::io::Error,
    },
}

impl PublishError {
    /// The step the run failed at.
    pub fn step(&self) -> PublishStep {
        match self {
            PublishError::Config(_) => PublishStep::Configure,
            PublishError::Auth(_) => PublishStep::Authenticate,
            PublishError::Classification(_) => PublishStep::Classify,
            PublishError::Identity(_) => PublishStep::DescriptiveRecord,
            PublishError::Storage { step, .. }
            | PublishError::Fetch { step, .. }
            | PublishError::Metadata { step, .. }
            | PublishError::Upload { step, .. }
            | PublishError::Io { step, .. } => *step,
        }
    }
}

/// What to publish.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    /// Items in the package, in the order they should be described.
    pub item_ids: Vec<String>,
    pub tale_id: String,
    /// Storage id of the publishing user.
    pub user_id: String,
    /// SPDX id of the package license.
    pub license_id: String,
    /// Repository JWT; its `userId` claim becomes the rights holder.
    pub repository_token: String,
    /// Extra fields merged into the package-info document.
    pub prov_info: serde_yaml::Mapping,
}

/// Outcome of a successful publish run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub package_url: String,
    pub resource_map_pid: Pid,
    pub metadata_pid: Pid,
    /// Objects aggregated by the resource map.
    pub object_pids: Vec<Pid>,
    /// Best-effort steps that produced no object.
    pub degraded_steps: Vec<PublishStep>,
    /// Names of local objects that failed to upload.
    pub failed_objects: Vec<String>,
}

/// Pid and size of an uploaded member, or `None` and 0 when skipped.
#[derive(Debug, Clone, Default)]
struct Member {
    pid: Option<Pid>,
    size: u64,
}

impl Member {
    fn uploaded(pid: Pid, size: u64) -> Self {
        Self {
            pid: Some(pid),
            size,
        }
    }
}

/// Publishes tales from one storage service into one repository.
pub struct PublishPipeline {
    config: PublishConfig,
    storage: Arc<dyn StorageClient>,
    repository: Arc<dyn RepositoryClient>,
    fetcher: Arc<dyn Fetcher>,
    metrics: MetricsCollector,
}

impl PublishPipeline {
    pub fn new(
        config: PublishConfig,
        storage: Arc<dyn StorageClient>,
        repository: Arc<dyn RepositoryClient>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            repository,
            fetcher,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Runs one publish and records its outcome.
    ///
    /// # Errors
    ///
    /// Returns `PublishError` naming the step that failed. Failures in
    /// best-effort steps are reported in `PublishReport::degraded_steps`
    /// instead.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishReport, PublishError> {
        let started = Instant::now();
        let result = self.run(request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.step().as_str(),
        };
        self.metrics
            .record_publish(outcome, started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => tracing::info!(
                tale = %request.tale_id,
                url = %report.package_url,
                objects = report.object_pids.len(),
                "Published tale"
            ),
            Err(e) => tracing::error!(tale = %request.tale_id, step = %e.step(), "Publish failed: {}", e),
        }
        result
    }

    async fn run(&self, request: &PublishRequest) -> Result<PublishReport, PublishError> {
        self.config.check_license(&request.license_id)?;
        let network = self.config.network();

        tracing::debug!(node = %self.config.member_node, %network, "Authenticating");
        self.repository.ping().await?;
        let rights_holder = extract_user_id(&request.repository_token)?;

        let (tale, user) = self.load_tale(request).await?;

        tracing::debug!(items = request.item_ids.len(), "Classifying items");
        let classified = classify(self.storage.as_ref(), &request.item_ids, network).await?;

        let mut degraded_steps = Vec::new();
        let mut failed_objects = Vec::new();
        let mut failed_items = HashSet::new();
        let mut local_pids = Vec::with_capacity(classified.local_objects.len());
        for (item_id, object) in classified.local_refs.iter().zip(&classified.local_objects) {
            match self.upload_local_object(object, &rights_holder).await {
                Ok(pid) => local_pids.push(Some(pid)),
                Err(e) => {
                    tracing::warn!(item = %item_id, name = %object.name, "Failed to upload local object: {}", e);
                    self.metrics.record_degraded_step(PublishStep::LocalObjects.as_str());
                    failed_objects.push(object.name.clone());
                    failed_items.insert(item_id.as_str());
                    local_pids.push(None);
                }
            }
        }

        let package_info = self
            .upload_package_info(&tale, &classified, request, &rights_holder)
            .await?;

        let license = self
            .upload_license(&request.license_id, &rights_holder)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to upload the license file: {}", e);
                self.degrade(&mut degraded_steps, PublishStep::License)
            });

        let environment = upload_environment(
            self.storage.as_ref(),
            self.fetcher.as_ref(),
            self.repository.as_ref(),
            &tale,
            &rights_holder,
        )
        .await
        .map(|(pid, size)| Member::uploaded(pid, size))
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to re-host the environment: {}", e);
            self.degrade(&mut degraded_steps, PublishStep::Environment)
        });

        let file_sizes = FileSizes {
            tale_yaml: package_info.size,
            license: license.size,
            repository: environment.size,
        };
        let metadata_pid = self
            .upload_descriptive_record(
                &tale,
                &user,
                &classified,
                &failed_items,
                &file_sizes,
                request,
                &rights_holder,
            )
            .await?;

        let object_pids = local_pids
            .into_iter()
            .chain([package_info.pid, license.pid, environment.pid]);
        let resource_map = build_and_upload_resource_map(
            Pid::generate(),
            &metadata_pid,
            object_pids,
            self.repository.as_ref(),
            &rights_holder,
            network,
        )
        .await?;

        Ok(PublishReport {
            package_url: network.landing_page(resource_map.pid().as_str()),
            resource_map_pid: resource_map.pid().clone(),
            metadata_pid,
            object_pids: resource_map.object_pids().to_vec(),
            degraded_steps,
            failed_objects,
        })
    }

    fn degrade(&self, degraded_steps: &mut Vec<PublishStep>, step: PublishStep) -> Member {
        self.metrics.record_degraded_step(step.as_str());
        degraded_steps.push(step);
        Member::default()
    }

    async fn load_tale(&self, request: &PublishRequest) -> Result<(Tale, User), PublishError> {
        let step = PublishStep::LoadTale;
        let tale = self
            .storage
            .get_tale(&request.tale_id)
            .await
            .map_err(|source| PublishError::Storage { step, source })?;
        let user = self
            .storage
            .get_user(&request.user_id)
            .await
            .map_err(|source| PublishError::Storage { step, source })?;
        Ok((tale, user))
    }

    /// Downloads a local object to a scratch file, checksums it in chunks
    /// and uploads it.
    async fn upload_local_object(
        &self,
        object: &FileObject,
        rights_holder: &str,
    ) -> Result<Pid, PublishError> {
        let step = PublishStep::LocalObjects;
        let scratch =
            tempfile::NamedTempFile::new().map_err(|source| PublishError::Io { step, source })?;
        self.storage
            .download(&object.id, scratch.path())
            .await
            .map_err(|source| PublishError::Storage { step, source })?;

        let pid = Pid::generate();
        let mut stream =
            FileStream::open(scratch.path()).map_err(|source| PublishError::Io { step, source })?;
        let sysmeta = generate_system_metadata(
            &pid,
            &object.mime_type,
            Content::Stream(&mut stream),
            &object.name,
            rights_holder,
            Some(object.size),
        )
        .map_err(|source| PublishError::Metadata { step, source })?;

        let content = tokio::fs::read(scratch.path())
            .await
            .map_err(|source| PublishError::Upload {
                step,
                source: UploadError::Content {
                    pid: pid.to_string(),
                    source,
                },
            })?;
        upload(self.repository.as_ref(), pid, content, &sysmeta)
            .await
            .map_err(|source| PublishError::Upload { step, source })
    }

    async fn upload_package_info(
        &self,
        tale: &Tale,
        classified: &Classified,
        request: &PublishRequest,
        rights_holder: &str,
    ) -> Result<Member, PublishError> {
        let step = PublishStep::PackageInfo;
        let paths = collect_paths(self.storage.as_ref(), &request.item_ids)
            .await
            .map_err(|source| PublishError::Storage { step, source })?;
        let external_files = collect_external_files(
            self.storage.as_ref(),
            self.fetcher.as_ref(),
            classified.external(),
        )
        .await
        .map_err(|source| PublishError::Fetch { step, source })?;

        let yaml = PackageInfo::new(tale)
            .with_paths(paths)
            .with_external_files(external_files)
            .with_prov_info(request.prov_info.clone())
            .to_yaml()
            .map_err(|source| PublishError::Metadata { step, source })?;

        let file = ExtraFile::TaleConfig;
        let content = yaml.into_bytes();
        let size = content.len() as u64;
        let pid = Pid::generate();
        let sysmeta = generate_system_metadata(
            &pid,
            file.upload_format(),
            Content::Buffer(&content),
            file.file_name(),
            rights_holder,
            None,
        )
        .map_err(|source| PublishError::Metadata { step, source })?;

        let pid = upload(self.repository.as_ref(), pid, content, &sysmeta)
            .await
            .map_err(|source| PublishError::Upload { step, source })?;
        Ok(Member::uploaded(pid, size))
    }

    async fn upload_license(
        &self,
        license_id: &str,
        rights_holder: &str,
    ) -> Result<Member, PublishError> {
        let step = PublishStep::License;
        let license = find_license(license_id)
            .ok_or_else(|| ConfigError::UnsupportedLicense(license_id.to_string()))?;
        let path = license.path_in(&self.config.license_dir);
        let content = tokio::fs::read(&path)
            .await
            .map_err(|source| PublishError::Io { step, source })?;

        let file = ExtraFile::License;
        let size = content.len() as u64;
        let pid = Pid::generate();
        let sysmeta = generate_system_metadata(
            &pid,
            file.upload_format(),
            Content::Buffer(&content),
            file.file_name(),
            rights_holder,
            None,
        )
        .map_err(|source| PublishError::Metadata { step, source })?;

        let pid = upload(self.repository.as_ref(), pid, content, &sysmeta)
            .await
            .map_err(|source| PublishError::Upload { step, source })?;
        Ok(Member::uploaded(pid, size))
    }

    /// Resolves name, description, size and format of each described item,
    /// skipping items whose upload failed.
    async fn describe_items(
        &self,
        classified: &Classified,
        failed_items: &HashSet<&str>,
    ) -> Result<Vec<ObjectEntry>, StorageError> {
        let mut entries = Vec::with_capacity(classified.len());
        for item_id in classified
            .described()
            .filter(|id| !failed_items.contains(id.as_str()))
        {
            let item = self.storage.get_item(item_id).await?;
            let format = self
                .storage
                .get_object(item_id)
                .await?
                .map(|object| object.mime_type)
                .unwrap_or_else(|| "application/octet-stream".to_string());
            entries.push(ObjectEntry::new(
                item.name,
                item.description.unwrap_or_default(),
                item.size,
                format,
            ));
        }
        Ok(entries)
    }

    async fn upload_descriptive_record(
        &self,
        tale: &Tale,
        user: &User,
        classified: &Classified,
        failed_items: &HashSet<&str>,
        file_sizes: &FileSizes,
        request: &PublishRequest,
        rights_holder: &str,
    ) -> Result<Pid, PublishError> {
        let step = PublishStep::DescriptiveRecord;
        let entries = self
            .describe_items(classified, failed_items)
            .await
            .map_err(|source| PublishError::Storage { step, source })?;

        let pid = Pid::generate();
        tracing::debug!(pid = %pid, "Creating descriptive record");
        let record = create_descriptive_record(
            tale,
            user,
            &entries,
            &pid,
            file_sizes,
            &request.license_id,
            rights_holder,
        )
        .map_err(|e| match e {
            MetadataError::Identity(identity) => PublishError::Identity(identity),
            source => PublishError::Metadata { step, source },
        })?;

        let sysmeta = generate_system_metadata(
            &pid,
            EML_FORMAT_ID,
            Content::Buffer(&record),
            DESCRIPTIVE_RECORD_NAME,
            rights_holder,
            None,
        )
        .map_err(|source| PublishError::Metadata { step, source })?;

        upload(self.repository.as_ref(), pid, record, &sysmeta)
            .await
            .map_err(|source| PublishError::Upload { step, source })
    }
}

/// Publishes a tale with fresh storage and repository clients.
///
/// `storage_token` authenticates against the storage service; the
/// repository token travels in `request`.
pub async fn publish_tale(
    config: PublishConfig,
    request: &PublishRequest,
    storage_token: &str,
) -> Result<PublishReport, PublishError> {
    config.validate()?;
    config.check_license(&request.license_id)?;

    let step = PublishStep::Configure;
    let storage = GirderClient::new(
        config.storage_api_url().await,
        storage_token,
        config.http_timeout,
    )
    .map_err(|source| PublishError::Storage { step, source })?;
    let repository = MemberNodeClient::new(
        &config.member_node,
        &request.repository_token,
        config.http_timeout,
        &config.user_agent,
    )?;
    let fetcher = HttpFetcher::new(config.http_timeout)
        .map_err(|source| PublishError::Fetch { step, source })?;

    let pipeline = PublishPipeline::new(
        config,
        Arc::new(storage),
        Arc::new(repository),
        Arc::new(fetcher),
    );
    pipeline.publish(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names_step() {
        let err = PublishError::Upload {
            step: PublishStep::ResourceMap,
            source: UploadError::Transport {
                pid: "map".to_string(),
                reason: "connection reset".to_string(),
            },
        };
        assert_eq!(err.step(), PublishStep::ResourceMap);
        assert!(err.to_string().starts_with("resource_map:"));

        let err = PublishError::from(IdentityError::MissingIdentity {
            missing: vec!["email"],
        });
        assert_eq!(err.step(), PublishStep::DescriptiveRecord);
        assert!(err.to_string().contains("Unable to find your name or email address"));

        let err = PublishError::from(AuthError::MissingToken);
        assert_eq!(err.step(), PublishStep::Authenticate);
    }

    #[test]
    fn test_step_display() {
        assert_eq!(PublishStep::PackageInfo.to_string(), "package_info");
        assert_eq!(PublishStep::LocalObjects.as_str(), "local_objects");
    }
}
