//! Downloads of externally hosted resources into local scratch files.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;

/// Fetches the resource at a URL into a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Writes the body of `url` to `dest`, returning the byte count.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Plain HTTP(S) fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Download {
                name: file_name_of(url),
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Download {
            name: file_name_of(url),
            url: url.to_string(),
            reason: e.to_string(),
        })? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(url, bytes = written, "Fetched external resource");
        Ok(written)
    }
}

/// Last path segment of `url`, used to name a failed download.
fn file_name_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("https://example.org/data/obs.csv"), "obs.csv");
        assert_eq!(file_name_of("https://example.org/"), "https://example.org/");
        assert_eq!(file_name_of("garbage"), "garbage");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_download_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).expect("fetcher builds");
        let dir = tempfile::tempdir().expect("temp dir");
        let result = fetcher
            .fetch("http://127.0.0.1:9/archive.tar.gz", &dir.path().join("out"))
            .await;
        assert!(matches!(result, Err(FetchError::Download { .. })));
    }
}
