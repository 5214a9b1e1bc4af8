//! Re-hosting of the tale's compute environment.
//!
//! The environment is whatever the tale's image was built from: the recipe
//! repository at the recorded commit. Its tarball is fetched from the build
//! service and uploaded into the package as `docker-environment.tar.gz`.

use super::fetch::Fetcher;
use super::orchestrator::{PublishError, PublishStep};
use super::upload::upload;
use crate::error::{StorageError, UploadError};
use crate::metadata::{generate_system_metadata, Content, ExtraFile};
use crate::pid::Pid;
use crate::repository::RepositoryClient;
use crate::storage::{StorageClient, Tale};

const STEP: PublishStep = PublishStep::Environment;

/// Resolves tale → image → recipe to the recipe's tarball URL.
pub async fn recipe_archive_url(
    storage: &dyn StorageClient,
    tale: &Tale,
) -> Result<String, StorageError> {
    let image_id = tale
        .image_id
        .as_deref()
        .ok_or_else(|| StorageError::NotFound(format!("image of tale {}", tale.id)))?;
    let image = storage.get_image(image_id).await?;
    let recipe = storage.get_recipe(&image.recipe_id).await?;
    Ok(recipe.tarball_url())
}

/// Fetches the environment archive and uploads it. Returns the new pid and
/// the archive size.
pub async fn upload_environment(
    storage: &dyn StorageClient,
    fetcher: &dyn Fetcher,
    client: &dyn RepositoryClient,
    tale: &Tale,
    rights_holder: &str,
) -> Result<(Pid, u64), PublishError> {
    let url = recipe_archive_url(storage, tale)
        .await
        .map_err(|source| PublishError::Storage { step: STEP, source })?;

    let scratch =
        tempfile::NamedTempFile::new().map_err(|source| PublishError::Io { step: STEP, source })?;
    let size = fetcher
        .fetch(&url, scratch.path())
        .await
        .map_err(|source| PublishError::Fetch { step: STEP, source })?;
    tracing::debug!(url = %url, bytes = size, "Fetched environment archive");

    let pid = Pid::generate();
    let content = tokio::fs::read(scratch.path()).await.map_err(|source| {
        PublishError::Upload {
            step: STEP,
            source: UploadError::Content {
                pid: pid.to_string(),
                source,
            },
        }
    })?;

    let file = ExtraFile::Environment;
    let sysmeta = generate_system_metadata(
        &pid,
        file.upload_format(),
        Content::Buffer(&content),
        file.file_name(),
        rights_holder,
        None,
    )
    .map_err(|source| PublishError::Metadata { step: STEP, source })?;

    let pid = upload(client, pid, content, &sysmeta)
        .await
        .map_err(|source| PublishError::Upload { step: STEP, source })?;
    Ok((pid, sysmeta.size))
}
