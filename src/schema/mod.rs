//! Artifact message schemas
//!
//! Protobuf messages for the artifact types scoring reads and writes, plus
//! a [`SchemaRegistry`] mapping fully-qualified message type names to
//! decoders that render the message as JSON for expression evaluation.

pub mod apihub;
pub mod conformance;
pub mod controller;
pub mod index;
mod json;
pub mod metrics;
pub mod references;
pub mod scoring;
pub mod style;

use prost::Message;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

pub const LINT_TYPE: &str = "google.cloud.apigeeregistry.v1.style.Lint";
pub const LEGACY_LINT_TYPE: &str = "google.cloud.apigeeregistry.applications.v1alpha1.Lint";
pub const COMPLEXITY_TYPE: &str = "gnostic.metrics.Complexity";
pub const VOCABULARY_TYPE: &str = "gnostic.metrics.Vocabulary";
pub const CONFORMANCE_REPORT_TYPE: &str = "google.cloud.apigeeregistry.applications.v1alpha1.ConformanceReport";
pub const INDEX_TYPE: &str = "google.cloud.apigeeregistry.applications.v1alpha1.Index";
pub const REFERENCE_LIST_TYPE: &str = "google.cloud.apigeeregistry.v1.apihub.ReferenceList";
pub const REFERENCES_TYPE: &str = "google.cloud.apigeeregistry.applications.v1alpha1.References";
pub const RECEIPT_TYPE: &str = "google.cloud.apigeeregistry.v1.controller.Receipt";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("unsupported artifact type: {0}")]
    Unsupported(String),

    #[error("failed to decode {message_type}: {source}")]
    Decode {
        message_type: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("failed to render {message_type} as JSON: {source}")]
    Render {
        message_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decodes serialized message bytes into their JSON form
pub type Decoder = fn(&str, &[u8]) -> Result<serde_json::Value, SchemaError>;

/// Decodes `bytes` as `M` and renders it as JSON
pub fn decode_as<M>(message_type: &str, bytes: &[u8]) -> Result<serde_json::Value, SchemaError>
where
    M: Message + Default + Serialize,
{
    let message = M::decode(bytes).map_err(|source| SchemaError::Decode {
        message_type: message_type.to_string(),
        source,
    })?;
    serde_json::to_value(&message).map_err(|source| SchemaError::Render {
        message_type: message_type.to_string(),
        source,
    })
}

/// Message types whose contents expressions can read
#[derive(Clone)]
pub struct SchemaRegistry {
    decoders: HashMap<String, Decoder>,
}

impl SchemaRegistry {
    /// A registry with no types registered
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with every built-in artifact type registered
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(LINT_TYPE, decode_as::<style::Lint>);
        registry.register(LEGACY_LINT_TYPE, decode_as::<style::Lint>);
        registry.register(COMPLEXITY_TYPE, decode_as::<metrics::Complexity>);
        registry.register(VOCABULARY_TYPE, decode_as::<metrics::Vocabulary>);
        registry.register(CONFORMANCE_REPORT_TYPE, decode_as::<conformance::ConformanceReport>);
        registry.register(INDEX_TYPE, decode_as::<index::Index>);
        registry.register(REFERENCE_LIST_TYPE, decode_as::<apihub::ReferenceList>);
        registry.register(REFERENCES_TYPE, decode_as::<references::References>);
        registry.register(RECEIPT_TYPE, decode_as::<controller::Receipt>);
        registry.register(crate::artifact::SCORE_TYPE, decode_as::<scoring::Score>);
        registry.register(crate::artifact::SCORE_CARD_TYPE, decode_as::<scoring::ScoreCard>);
        registry
    }

    /// Adds or replaces the decoder for `message_type`
    pub fn register(&mut self, message_type: impl Into<String>, decoder: Decoder) {
        self.decoders.insert(message_type.into(), decoder);
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.decoders.contains_key(message_type)
    }

    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.decoders.keys().map(String::as_str)
    }

    pub fn decode(&self, message_type: &str, bytes: &[u8]) -> Result<serde_json::Value, SchemaError> {
        let decoder = self
            .decoders
            .get(message_type)
            .ok_or_else(|| SchemaError::Unsupported(message_type.to_string()))?;
        decoder(message_type, bytes)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.message_types().collect();
        types.sort_unstable();
        f.debug_struct("SchemaRegistry").field("types", &types).finish()
    }
}
