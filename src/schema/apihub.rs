//! `google.cloud.apigeeregistry.v1.apihub.ReferenceList`

use serde::Serialize;

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceList {
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[prost(string, tag = "2")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[prost(message, repeated, tag = "3")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<reference_list::Reference>,
}

pub mod reference_list {
    use serde::Serialize;

    #[derive(Clone, PartialEq, ::prost::Message, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Reference {
        #[prost(string, tag = "1")]
        #[serde(skip_serializing_if = "String::is_empty")]
        pub id: String,
        #[prost(string, tag = "2")]
        #[serde(skip_serializing_if = "String::is_empty")]
        pub display_name: String,
        #[prost(string, tag = "3")]
        #[serde(skip_serializing_if = "String::is_empty")]
        pub category: String,
        #[prost(string, tag = "4")]
        #[serde(skip_serializing_if = "String::is_empty")]
        pub resource: String,
        #[prost(string, tag = "5")]
        #[serde(skip_serializing_if = "String::is_empty")]
        pub uri: String,
    }
}
