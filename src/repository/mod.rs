//! Client side of the target repository (a DataONE v2 member node).

pub mod member_node;
pub mod network;

pub use member_node::MemberNodeClient;
pub use network::{Network, DEVELOPMENT_MEMBER_NODE};

use async_trait::async_trait;

use crate::error::{AuthError, UploadError};
use crate::metadata::SystemMetadata;
use crate::pid::Pid;

/// Session with a repository that accepts new objects.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Checks that the node is reachable and the session is usable.
    async fn ping(&self) -> Result<(), AuthError>;

    /// Creates one object under `pid`. Implementations make exactly one
    /// create call and never retry.
    async fn create(
        &self,
        pid: &Pid,
        content: Vec<u8>,
        sysmeta: &SystemMetadata,
    ) -> Result<(), UploadError>;
}
