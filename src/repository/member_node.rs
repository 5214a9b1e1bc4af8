//! HTTP client for a DataONE v2 member node.
//!
//! Objects are created with `POST {node}/object` as multipart form data
//! (`pid`, `object`, `sysmeta`). Failures come back as a small XML document:
//!
//! ```xml
//! <error detailCode="1190" errorCode="409" name="IdentifierNotUnique">
//!   <description>The identifier is already in use</description>
//! </error>
//! ```

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::RepositoryClient;
use crate::error::{AuthError, UploadError};
use crate::metadata::SystemMetadata;
use crate::pid::Pid;

/// Authenticated session with one member node.
#[derive(Debug, Clone)]
pub struct MemberNodeClient {
    base_url: String,
    token: String,
    http_client: Client,
}

impl MemberNodeClient {
    /// Create a client for the node at `node_url`
    /// (e.g. `https://dev.nceas.ucsb.edu/knb/d1/mn/v2`).
    pub fn new(
        node_url: &str,
        token: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, AuthError> {
        let parsed =
            url::Url::parse(node_url).map_err(|_| AuthError::InvalidNode(node_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuthError::InvalidNode(node_url.to_string()));
        }
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: node_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl RepositoryClient for MemberNodeClient {
    async fn ping(&self) -> Result<(), AuthError> {
        let response = self
            .http_client
            .get(self.url("monitor/ping"))
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Unreachable(format!(
                "{} answered ping with {}",
                self.base_url, status
            )));
        }
        tracing::debug!(node = %self.base_url, "Member node reachable");
        Ok(())
    }

    async fn create(
        &self,
        pid: &Pid,
        content: Vec<u8>,
        sysmeta: &SystemMetadata,
    ) -> Result<(), UploadError> {
        let sysmeta_xml = sysmeta.to_xml().map_err(|e| UploadError::Encoding {
            pid: pid.to_string(),
            reason: e.to_string(),
        })?;

        let object_name = if sysmeta.file_name.is_empty() {
            pid.to_string()
        } else {
            sysmeta.file_name.clone()
        };
        let object = Part::bytes(content).file_name(object_name);
        let sysmeta_part = Part::bytes(sysmeta_xml)
            .file_name("sysmeta.xml")
            .mime_str("text/xml")
            .map_err(|e| UploadError::Encoding {
                pid: pid.to_string(),
                reason: e.to_string(),
            })?;
        let form = Form::new()
            .text("pid", pid.to_string())
            .part("object", object)
            .part("sysmeta", sysmeta_part);

        let response = self
            .http_client
            .post(self.url("object"))
            .header("Authorization", format!("Bearer {}", self.token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport {
                pid: pid.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let (name, description) = parse_error_response(&body)
            .unwrap_or_else(|| (status.canonical_reason().unwrap_or("Error").to_string(), body));
        Err(UploadError::Rejected {
            pid: pid.to_string(),
            code: status.as_u16(),
            name,
            description,
        })
    }
}

/// Extracts `(name, description)` from a DataONE error document.
fn parse_error_response(body: &str) -> Option<(String, String)> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut name = None;
    let mut description = String::new();
    let mut in_description = false;

    loop {
        match reader.read_event().ok()? {
            Event::Start(start) | Event::Empty(start) => match start.name().as_ref() {
                b"error" => {
                    for attr in start.attributes().flatten() {
                        if attr.key.as_ref() == b"name" {
                            name = attr.unescape_value().ok().map(|v| v.into_owned());
                        }
                    }
                }
                b"description" => in_description = true,
                _ => {}
            },
            Event::Text(text) if in_description => {
                description = text.unescape().ok()?.into_owned();
            }
            Event::End(end) if end.name().as_ref() == b"description" => in_description = false,
            Event::Eof => break,
            _ => {}
        }
    }
    name.map(|name| (name, description))
}
