//! Style guide conformance reports,
//! `google.cloud.apigeeregistry.applications.v1alpha1.ConformanceReport`

use super::json;
use super::style::LintLocation;
use serde::{Serialize, Serializer};

/// Lifecycle state of a style guide guideline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
#[repr(i32)]
pub enum GuidelineStatus {
    #[serde(rename = "STATUS_UNSPECIFIED")]
    Unspecified = 0,
    #[serde(rename = "PROPOSED")]
    Proposed = 1,
    #[serde(rename = "ACTIVE")]
    Active = 2,
    #[serde(rename = "DEPRECATED")]
    Deprecated = 3,
    #[serde(rename = "DISABLED")]
    Disabled = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration, Serialize)]
#[repr(i32)]
pub enum RuleSeverity {
    #[serde(rename = "SEVERITY_UNSPECIFIED")]
    Unspecified = 0,
    #[serde(rename = "ERROR")]
    Error = 1,
    #[serde(rename = "WARNING")]
    Warning = 2,
    #[serde(rename = "INFO")]
    Info = 3,
    #[serde(rename = "HINT")]
    Hint = 4,
}

fn status_name<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    json::enum_name::<GuidelineStatus, S>(value, serializer)
}

fn severity_name<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
    json::enum_name::<RuleSeverity, S>(value, serializer)
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformanceReport {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub styleguide_name: String,
    #[prost(message, repeated, tag = "3")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guideline_report_groups: Vec<GuidelineReportGroup>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidelineReport {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub guideline_name: String,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_report_groups: Vec<RuleReportGroup>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rule_name: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub spec_name: String,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub suggestion: String,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LintLocation>,
}

/// Guideline reports sharing one status
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidelineReportGroup {
    #[prost(enumeration = "GuidelineStatus", tag = "1")]
    #[serde(serialize_with = "status_name", skip_serializing_if = "json::is_default")]
    pub status: i32,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guideline_reports: Vec<GuidelineReport>,
}

/// Rule reports sharing one severity
#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReportGroup {
    #[prost(enumeration = "RuleSeverity", tag = "1")]
    #[serde(serialize_with = "severity_name", skip_serializing_if = "json::is_default")]
    pub severity: i32,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rule_reports: Vec<RuleReport>,
}
