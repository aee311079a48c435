//! Registry access used by the scoring engines
//!
//! The engines only need to read and write artifacts and to list resources
//! matching a pattern. [`ArtifactClient`] and [`ResourceLister`] are the
//! seams a real registry connection plugs into; [`InMemoryRegistry`] backs
//! tests and local runs.

mod memory;

pub use memory::InMemoryRegistry;

use crate::artifact::Artifact;
use crate::names::{ResourceInstance, ResourceName};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Reads and writes artifacts
pub trait ArtifactClient: Send + Sync {
    /// Fetches one artifact; contents are left empty unless `with_contents`
    fn get_artifact(&self, name: &str, with_contents: bool) -> ClientResult<Artifact>;

    /// Creates or replaces an artifact and returns the stored copy, whose
    /// update time the registry assigns.
    fn set_artifact(&self, artifact: Artifact) -> ClientResult<Artifact>;

    /// Artifacts whose names match `pattern` and, when non-empty, `filter`
    fn list_artifacts(&self, pattern: &str, filter: &str, with_contents: bool) -> ClientResult<Vec<Artifact>>;
}

/// Enumerates non-artifact resources
pub trait ResourceLister: Send + Sync {
    /// Resources whose names match `pattern` and, when non-empty, `filter`
    fn list_resources(&self, pattern: &ResourceName, filter: &str) -> ClientResult<Vec<ResourceInstance>>;
}
