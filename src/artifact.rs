//! Registry artifacts and their MIME types
//!
//! Artifact contents are serialized protobuf messages. The message type is
//! carried in the MIME type as `application/octet-stream;type=<message>`;
//! a `+gzip` suffix on the MIME type marks gzip-compressed contents.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::{self, Read};

const MIME_PREFIX: &str = "application/octet-stream;type=";

pub const SCORE_DEFINITION_TYPE: &str = "google.cloud.apigeeregistry.v1.scoring.ScoreDefinition";
pub const SCORE_CARD_DEFINITION_TYPE: &str = "google.cloud.apigeeregistry.v1.scoring.ScoreCardDefinition";
pub const SCORE_TYPE: &str = "google.cloud.apigeeregistry.v1.scoring.Score";
pub const SCORE_CARD_TYPE: &str = "google.cloud.apigeeregistry.v1.scoring.ScoreCard";

/// A named blob attached to a registry resource
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub mime_type: String,
    pub contents: Vec<u8>,
    /// Set by the registry when the artifact is stored
    pub update_time: Option<DateTime<Utc>>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            contents,
            update_time: None,
        }
    }

    pub fn with_update_time(mut self, update_time: DateTime<Utc>) -> Self {
        self.update_time = Some(update_time);
        self
    }

    /// Message type named by this artifact's MIME type
    pub fn message_type(&self) -> Option<&str> {
        message_type_for_mime_type(&self.mime_type)
    }

    /// Contents with any gzip compression removed
    pub fn payload(&self) -> io::Result<Cow<'_, [u8]>> {
        decoded_contents(&self.mime_type, &self.contents)
    }
}

/// `application/octet-stream;type=<message_type>`
pub fn mime_type_for_message_type(message_type: &str) -> String {
    format!("{MIME_PREFIX}{message_type}")
}

/// Extracts the message type from a MIME type, ignoring a `+gzip` suffix
pub fn message_type_for_mime_type(mime_type: &str) -> Option<&str> {
    let message_type = mime_type.strip_prefix(MIME_PREFIX)?;
    let message_type = message_type.strip_suffix("+gzip").unwrap_or(message_type);
    (!message_type.is_empty()).then_some(message_type)
}

pub fn is_gzip_compressed(mime_type: &str) -> bool {
    mime_type.contains("+gzip")
}

/// Decompresses `contents` when the MIME type says they are gzipped
pub fn decoded_contents<'a>(mime_type: &str, contents: &'a [u8]) -> io::Result<Cow<'a, [u8]>> {
    if !is_gzip_compressed(mime_type) {
        return Ok(Cow::Borrowed(contents));
    }
    let mut decoder = GzDecoder::new(contents);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(Cow::Owned(out))
}

pub fn score_definition_mime_type() -> String {
    mime_type_for_message_type(SCORE_DEFINITION_TYPE)
}

pub fn score_card_definition_mime_type() -> String {
    mime_type_for_message_type(SCORE_CARD_DEFINITION_TYPE)
}

pub fn score_mime_type() -> String {
    mime_type_for_message_type(SCORE_TYPE)
}

pub fn score_card_mime_type() -> String {
    mime_type_for_message_type(SCORE_CARD_TYPE)
}
