//! `google.cloud.apigeeregistry.applications.v1alpha1.References`

use serde::Serialize;

/// Entities a spec refers to, split by whether the registry holds them
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct References {
    #[prost(string, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_references: Vec<String>,
}
