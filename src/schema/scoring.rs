//! `google.cloud.apigeeregistry.v1.scoring` messages

use super::json;
use serde::{Serialize, Serializer};

/// Severity attached to a score threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
#[repr(i32)]
pub enum Severity {
    #[serde(rename = "SEVERITY_UNSPECIFIED")]
    Unspecified = 0,
    #[serde(rename = "OK")]
    Ok = 1,
    #[serde(rename = "WARNING")]
    Warning = 2,
    #[serde(rename = "ALERT")]
    Alert = 3,
}

fn severity_name<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    json::enum_name::<Severity, S>(value, serializer)
}

/// Selects resources by name pattern plus an optional filter expression
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResourcePattern {
    #[prost(string, tag = "1")]
    pub pattern: String,
    #[prost(string, tag = "2")]
    pub filter: String,
}

/// How to compute one score for a target resource
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScoreDefinition {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub kind: String,
    #[prost(string, tag = "3")]
    pub display_name: String,
    #[prost(string, tag = "4")]
    pub description: String,
    #[prost(string, tag = "5")]
    pub uri: String,
    #[prost(string, tag = "6")]
    pub uri_display_name: String,
    #[prost(message, optional, tag = "7")]
    pub target_resource: Option<ResourcePattern>,
    #[prost(oneof = "score_definition::Formula", tags = "8, 9")]
    pub formula: Option<score_definition::Formula>,
    #[prost(oneof = "score_definition::Type", tags = "10, 11, 12")]
    pub score_type: Option<score_definition::Type>,
}

pub mod score_definition {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Formula {
        #[prost(message, tag = "8")]
        ScoreFormula(super::ScoreFormula),
        #[prost(message, tag = "9")]
        RollupFormula(super::RollUpFormula),
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "10")]
        Integer(super::IntegerType),
        #[prost(message, tag = "11")]
        Percent(super::PercentType),
        #[prost(message, tag = "12")]
        Boolean(super::BooleanType),
    }
}

/// An expression evaluated against a single artifact
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScoreFormula {
    #[prost(message, optional, tag = "1")]
    pub artifact: Option<ResourcePattern>,
    #[prost(string, tag = "2")]
    pub score_expression: String,
    /// Variable name for this formula's value inside a rollup expression
    #[prost(string, tag = "3")]
    pub reference_id: String,
}

/// Several score formulas combined by one expression
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollUpFormula {
    #[prost(message, repeated, tag = "1")]
    pub score_formulas: Vec<ScoreFormula>,
    #[prost(string, tag = "2")]
    pub rollup_expression: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IntegerType {
    #[prost(int32, tag = "1")]
    pub min_value: i32,
    #[prost(int32, tag = "2")]
    pub max_value: i32,
    #[prost(message, repeated, tag = "3")]
    pub thresholds: Vec<NumberThreshold>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PercentType {
    #[prost(message, repeated, tag = "1")]
    pub thresholds: Vec<NumberThreshold>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BooleanType {
    #[prost(message, repeated, tag = "1")]
    pub thresholds: Vec<BooleanThreshold>,
    #[prost(string, tag = "2")]
    pub display_true: String,
    #[prost(string, tag = "3")]
    pub display_false: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NumberThreshold {
    #[prost(enumeration = "Severity", tag = "1")]
    pub severity: i32,
    #[prost(message, optional, tag = "2")]
    pub range: Option<number_threshold::NumberRange>,
}

pub mod number_threshold {
    /// Inclusive on both ends
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NumberRange {
        #[prost(int32, tag = "1")]
        pub min: i32,
        #[prost(int32, tag = "2")]
        pub max: i32,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BooleanThreshold {
    #[prost(enumeration = "Severity", tag = "1")]
    pub severity: i32,
    #[prost(bool, tag = "2")]
    pub value: bool,
}

/// Groups the scores matching `score_patterns` into one card
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScoreCardDefinition {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub kind: String,
    #[prost(string, tag = "3")]
    pub display_name: String,
    #[prost(string, tag = "4")]
    pub description: String,
    #[prost(message, optional, tag = "5")]
    pub target_resource: Option<ResourcePattern>,
    #[prost(string, repeated, tag = "6")]
    pub score_patterns: Vec<String>,
}

/// A computed score, stored as `<resource>/artifacts/score-<definition id>`
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[prost(string, tag = "4")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[prost(string, tag = "5")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[prost(string, tag = "6")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri_display_name: String,
    #[prost(string, tag = "7")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definition_name: String,
    #[prost(enumeration = "Severity", tag = "8")]
    #[serde(serialize_with = "severity_name", skip_serializing_if = "json::is_default")]
    pub severity: i32,
    #[prost(oneof = "score::Value", tags = "9, 10, 11")]
    #[serde(flatten)]
    pub value: Option<score::Value>,
}

pub mod score {
    use serde::Serialize;

    #[derive(Clone, PartialEq, ::prost::Oneof, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Value {
        #[prost(message, tag = "9")]
        IntegerValue(super::IntegerValue),
        #[prost(message, tag = "10")]
        PercentValue(super::PercentValue),
        #[prost(message, tag = "11")]
        BooleanValue(super::BooleanValue),
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegerValue {
    #[prost(int32, tag = "1")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub value: i32,
    #[prost(int32, tag = "2")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub min_value: i32,
    #[prost(int32, tag = "3")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub max_value: i32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
pub struct PercentValue {
    #[prost(float, tag = "1")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub value: f32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanValue {
    #[prost(bool, tag = "1")]
    #[serde(skip_serializing_if = "json::is_default")]
    pub value: bool,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_value: String,
}

/// Scores for one resource, in the order of the card's patterns
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCard {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[prost(string, tag = "4")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[prost(string, tag = "5")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definition_name: String,
    #[prost(message, repeated, tag = "6")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<Score>,
}
