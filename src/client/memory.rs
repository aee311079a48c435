//! Thread-safe in-memory registry

use super::{ArtifactClient, ClientError, ClientResult, ResourceLister};
use crate::artifact::Artifact;
use crate::expr::{CelEngine, ExpressionEngine, Value};
use crate::names::{parse_resource, ResourceInstance, ResourceKind, ResourceName, WILDCARD};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Artifacts and resources held in memory, keyed by name
///
/// Names in patterns match segment by segment, with `-` matching any id
/// and `@-` matching any revision. Filters are expressions over `name`
/// (and `mime_type` for artifacts) that must yield a bool.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    artifacts: RwLock<BTreeMap<String, Artifact>>,
    resources: RwLock<BTreeMap<String, ResourceInstance>>,
    uploads: AtomicUsize,
}

fn poisoned<T>(_: T) -> ClientError {
    ClientError::Unavailable("registry lock poisoned".into())
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn artifacts(&self) -> ClientResult<RwLockReadGuard<'_, BTreeMap<String, Artifact>>> {
        self.artifacts.read().map_err(poisoned)
    }

    fn artifacts_mut(&self) -> ClientResult<RwLockWriteGuard<'_, BTreeMap<String, Artifact>>> {
        self.artifacts.write().map_err(poisoned)
    }

    /// Stores an artifact without counting it as an upload, keeping its
    /// update time when one is set
    pub fn insert_artifact(&self, mut artifact: Artifact) -> ClientResult<()> {
        validate_artifact_name(&artifact.name)?;
        artifact.update_time.get_or_insert_with(Utc::now);
        self.artifacts_mut()?.insert(artifact.name.clone(), artifact);
        Ok(())
    }

    /// Registers a resource for [`ResourceLister::list_resources`]
    pub fn insert_resource(&self, name: &str, update_time: DateTime<Utc>) -> ClientResult<()> {
        let instance = ResourceInstance::parse(name, update_time)
            .map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
        if instance.name.kind() == ResourceKind::Artifact {
            return Err(ClientError::InvalidArgument(format!(
                "{name} is an artifact, use insert_artifact"
            )));
        }
        self.resources
            .write()
            .map_err(poisoned)?
            .insert(instance.name.to_string(), instance);
        Ok(())
    }

    /// Number of [`ArtifactClient::set_artifact`] calls that succeeded
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn artifact(&self, name: &str) -> Option<Artifact> {
        self.artifacts().ok()?.get(name).cloned()
    }

    pub fn artifact_names(&self) -> Vec<String> {
        self.artifacts()
            .map(|store| store.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn validate_artifact_name(name: &str) -> ClientResult<()> {
    match parse_resource(name) {
        Ok(parsed) if parsed.kind() == ResourceKind::Artifact && !has_wildcard(name) => Ok(()),
        _ => Err(ClientError::InvalidArgument(format!("invalid artifact name {name:?}"))),
    }
}

fn has_wildcard(name: &str) -> bool {
    name.split('/')
        .any(|segment| segment == WILDCARD || segment.ends_with("@-"))
}

impl ArtifactClient for InMemoryRegistry {
    fn get_artifact(&self, name: &str, with_contents: bool) -> ClientResult<Artifact> {
        let mut artifact = self
            .artifacts()?
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(name.to_string()))?;
        if !with_contents {
            artifact.contents.clear();
        }
        Ok(artifact)
    }

    fn set_artifact(&self, mut artifact: Artifact) -> ClientResult<Artifact> {
        validate_artifact_name(&artifact.name)?;
        artifact.update_time = Some(Utc::now());
        debug!("Stored artifact {}", artifact.name);
        self.artifacts_mut()?.insert(artifact.name.clone(), artifact.clone());
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(artifact)
    }

    fn list_artifacts(&self, pattern: &str, filter: &str, with_contents: bool) -> ClientResult<Vec<Artifact>> {
        let store = self.artifacts()?;
        let mut matched = Vec::new();
        for artifact in store.values() {
            if !name_matches(pattern, &artifact.name) {
                continue;
            }
            let env = BTreeMap::from([
                ("name".to_string(), Value::from(artifact.name.as_str())),
                ("mime_type".to_string(), Value::from(artifact.mime_type.as_str())),
            ]);
            if !filter_accepts(filter, &env)? {
                continue;
            }
            let mut artifact = artifact.clone();
            if !with_contents {
                artifact.contents.clear();
            }
            matched.push(artifact);
        }
        Ok(matched)
    }
}

impl ResourceLister for InMemoryRegistry {
    fn list_resources(&self, pattern: &ResourceName, filter: &str) -> ClientResult<Vec<ResourceInstance>> {
        let pattern = pattern.to_string();
        let store = self.resources.read().map_err(poisoned)?;
        let mut matched = Vec::new();
        for (name, instance) in store.iter() {
            if !name_matches(&pattern, name) {
                continue;
            }
            let env = BTreeMap::from([("name".to_string(), Value::from(name.as_str()))]);
            if filter_accepts(filter, &env)? {
                matched.push(instance.clone());
            }
        }
        Ok(matched)
    }
}

fn filter_accepts(filter: &str, env: &BTreeMap<String, Value>) -> ClientResult<bool> {
    if filter.trim().is_empty() {
        return Ok(true);
    }
    match CelEngine.evaluate(filter, env) {
        Ok(Value::Bool(accepted)) => Ok(accepted),
        Ok(other) => Err(ClientError::InvalidArgument(format!(
            "filter {filter:?} produced {} instead of bool",
            other.type_name()
        ))),
        Err(e) => Err(ClientError::InvalidArgument(format!("invalid filter {filter:?}: {e}"))),
    }
}

fn split_revision(segment: &str) -> (&str, Option<&str>) {
    match segment.split_once('@') {
        Some((id, rev)) => (id, Some(rev)),
        None => (segment, None),
    }
}

fn segment_matches(pattern: &str, name: &str) -> bool {
    let (pattern_id, pattern_rev) = split_revision(pattern);
    let (name_id, name_rev) = split_revision(name);
    let id_matches = pattern_id == WILDCARD || pattern_id == name_id;
    let rev_matches = match pattern_rev {
        None => true,
        Some(rev) if rev == WILDCARD => true,
        Some(rev) => name_rev == Some(rev),
    };
    id_matches && rev_matches
}

/// Segment-wise match of a name against a pattern of the same shape
pub(crate) fn name_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').collect();
    let name: Vec<&str> = name.split('/').collect();
    pattern.len() == name.len() && pattern.iter().zip(&name).all(|(p, n)| segment_matches(p, n))
}
