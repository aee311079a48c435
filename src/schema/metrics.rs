//! gnostic metrics: `gnostic.metrics.Complexity` and `gnostic.metrics.Vocabulary`

use super::json;
use serde::Serialize;

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Complexity {
    #[prost(int32, tag = "1")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub path_count: i32,
    #[prost(int32, tag = "2")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub get_count: i32,
    #[prost(int32, tag = "3")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub post_count: i32,
    #[prost(int32, tag = "4")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub put_count: i32,
    #[prost(int32, tag = "5")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub delete_count: i32,
    #[prost(int32, tag = "6")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub schema_count: i32,
    #[prost(int32, tag = "7")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub schema_property_count: i32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct WordCount {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub word: String,
    #[prost(int32, tag = "2")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub count: i32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct Vocabulary {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<WordCount>,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<WordCount>,
    #[prost(message, repeated, tag = "3")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<WordCount>,
    #[prost(message, repeated, tag = "4")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<WordCount>,
}
