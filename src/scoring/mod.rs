//! Score and score card computation
//!
//! A [`ScoreDefinition`](crate::schema::scoring::ScoreDefinition) reduces one
//! or more dependency artifacts of a resource to a scalar and classifies it
//! into a severity. A score card definition groups already computed scores.
//!
//! Both engines decide whether an existing result is stale by comparing
//! timestamps: a definition or dependency updated within the staleness
//! grace window of (or after) the existing result forces a recompute.
//! The value is always computed so evaluation errors surface, but the
//! upload only happens when something requires it.

mod batch;
mod expression;
mod score;
mod scorecard;
mod validate;

pub use batch::{
    combined_filter, combined_pattern, compute_score_cards, compute_scores, list_definitions,
    matches_target, score_resource, BatchReport, TaskFailure,
};
pub use expression::{EvalError, Evaluator, ScoreValue};
pub use score::{score_from_value, ScoreEngine};
pub use scorecard::ScoreCardEngine;
pub use validate::{validate_score_card_definition, validate_score_definition, ValidationError};

use crate::artifact::Artifact;
use crate::client::ClientError;
use crate::names::NameError;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors from computing a single score or score card
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("failed to fetch {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to upload {name}: {source}")]
    Upload {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to list {what}: {source}")]
    List {
        what: String,
        #[source]
        source: ClientError,
    },

    #[error("failed to decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("failed to decompress {name}: {source}")]
    Decompress {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid reference_id {0:?}: must be non-empty and must not contain '-'")]
    InvalidReferenceId(String),

    #[error("error processing rollup_formula.score_formulas: {0}")]
    Rollup(Box<ScoringError>),

    #[error("failed typecheck for output: expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} is out of range [{min}, {max}]")]
    OutOfRange { value: String, min: i64, max: i64 },

    #[error("target {target:?} is not compatible with {input:?}: {reason}")]
    IncompatibleTarget {
        target: String,
        input: String,
        reason: String,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type ScoringResult<T> = Result<T, ScoringError>;

/// What a computation did with its result
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The result was stored
    Uploaded(T),
    /// The result was computed but dry-run mode kept it from being stored
    DryRun(T),
    /// The stored result is current, nothing was written
    UpToDate,
}

impl<T> Outcome<T> {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, Outcome::Uploaded(_))
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Outcome::UpToDate)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Uploaded(value) | Outcome::DryRun(value) => Some(value),
            Outcome::UpToDate => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Uploaded(value) | Outcome::DryRun(value) => Some(value),
            Outcome::UpToDate => None,
        }
    }
}

/// Whether `dependency` is recent enough to invalidate `existing`
///
/// True when there is no existing result, or when the existing result was
/// written before `dependency + grace`. A dependency without a timestamp
/// never forces a recompute on its own.
pub(crate) fn is_newer(
    dependency: Option<DateTime<Utc>>,
    existing: Option<&Artifact>,
    grace: Duration,
) -> bool {
    let Some(existing) = existing else {
        return true;
    };
    let Some(existing_time) = existing.update_time else {
        return true;
    };
    let Some(dependency_time) = dependency else {
        return false;
    };
    let Ok(grace) = chrono::Duration::from_std(grace) else {
        return true;
    };
    match dependency_time.checked_add_signed(grace) {
        Some(deadline) => existing_time < deadline,
        None => true,
    }
}

/// `<project_root>/artifacts/<definition id>`
pub(crate) fn definition_name(project_root: &str, definition_id: &str) -> String {
    format!("{project_root}/artifacts/{definition_id}")
}

/// Fetches an artifact, treating absence as `None`
pub(crate) fn fetch_existing(
    client: &dyn crate::client::ArtifactClient,
    name: &str,
) -> ScoringResult<Option<Artifact>> {
    match client.get_artifact(name, false) {
        Ok(artifact) => Ok(Some(artifact)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(source) => Err(ScoringError::Fetch {
            name: name.to_string(),
            source,
        }),
    }
}

/// Decodes a protobuf artifact, undoing gzip when its MIME type says so
pub(crate) fn decode_artifact<M: prost::Message + Default>(artifact: &Artifact) -> ScoringResult<M> {
    let payload = artifact.payload().map_err(|source| ScoringError::Decompress {
        name: artifact.name.clone(),
        source,
    })?;
    M::decode(payload.as_ref()).map_err(|source| ScoringError::Decode {
        name: artifact.name.clone(),
        source,
    })
}
