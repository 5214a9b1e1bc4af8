//! Single-object uploads and the closing resource map upload.

use crate::error::UploadError;
use crate::metadata::{
    generate_system_metadata, Content, ExtraFile, ResourceMap, SystemMetadata, EML_FORMAT_ID,
    RESOURCE_MAP_FORMAT_ID,
};
use crate::metrics::MetricsCollector;
use crate::pid::Pid;
use crate::repository::{Network, RepositoryClient};

use super::orchestrator::{PublishError, PublishStep};

/// Uploads one object with its system metadata under `pid`.
///
/// Exactly one create call is made; failures are returned, never retried.
pub async fn upload(
    client: &dyn RepositoryClient,
    pid: impl Into<Pid>,
    content: Vec<u8>,
    sysmeta: &SystemMetadata,
) -> Result<Pid, UploadError> {
    let pid = pid.into();
    let bytes = content.len() as u64;
    let kind = upload_kind(sysmeta);

    match client.create(&pid, content, sysmeta).await {
        Ok(()) => {
            MetricsCollector::new().record_upload(kind, true, bytes);
            tracing::info!(pid = %pid, name = %sysmeta.file_name, bytes, "Uploaded object");
            Ok(pid)
        }
        Err(e) => {
            MetricsCollector::new().record_upload(kind, false, 0);
            Err(e)
        }
    }
}

fn upload_kind(sysmeta: &SystemMetadata) -> &'static str {
    match sysmeta.format_id.as_str() {
        RESOURCE_MAP_FORMAT_ID => "resource_map",
        EML_FORMAT_ID => "descriptive_record",
        _ => ExtraFile::from_file_name(&sysmeta.file_name)
            .map_or("object", |file| file.metric_kind()),
    }
}

/// Builds the resource map over `object_pids` (absent and empty pids are
/// dropped) and uploads it as the last object of the package.
pub async fn build_and_upload_resource_map(
    resource_map_pid: impl Into<Pid>,
    metadata_pid: &Pid,
    object_pids: impl IntoIterator<Item = Option<Pid>>,
    client: &dyn RepositoryClient,
    rights_holder: &str,
    network: Network,
) -> Result<ResourceMap, PublishError> {
    let step = PublishStep::ResourceMap;
    let resource_map = ResourceMap::new(resource_map_pid, metadata_pid, object_pids);
    let rdf = resource_map
        .to_rdf_xml(network)
        .map_err(|source| PublishError::Metadata { step, source })?;

    let sysmeta = generate_system_metadata(
        resource_map.pid(),
        RESOURCE_MAP_FORMAT_ID,
        Content::Buffer(&rdf),
        "",
        rights_holder,
        None,
    )
    .map_err(|source| PublishError::Metadata { step, source })?;

    tracing::debug!(
        pid = %resource_map.pid(),
        objects = resource_map.object_pids().len(),
        "Uploading resource map"
    );
    upload(client, resource_map.pid(), rdf, &sysmeta)
        .await
        .map_err(|source| PublishError::Upload { step, source })?;
    Ok(resource_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sysmeta(format_id: &str, file_name: &str) -> SystemMetadata {
        generate_system_metadata(
            "pid-1",
            format_id,
            Content::Buffer(b"content".as_slice()),
            file_name,
            "https://orcid.org/0000-0002-1756-2128",
            None,
        )
        .expect("system metadata")
    }

    #[test]
    fn test_upload_kind_labels_generated_members() {
        assert_eq!(upload_kind(&sysmeta("text/csv", "data.csv")), "object");
        assert_eq!(upload_kind(&sysmeta("text/plain", "tale.yml")), "package_info");
        assert_eq!(upload_kind(&sysmeta("text/plain", "LICENSE")), "license");
        assert_eq!(
            upload_kind(&sysmeta("application/tar+gzip", "docker-environment.tar.gz")),
            "environment"
        );
        assert_eq!(
            upload_kind(&sysmeta(EML_FORMAT_ID, "science_metadata.xml")),
            "descriptive_record"
        );
        assert_eq!(upload_kind(&sysmeta(RESOURCE_MAP_FORMAT_ID, "")), "resource_map");
    }
}
