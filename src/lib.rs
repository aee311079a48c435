//! Registry scoring - quality scores for API registry resources
//!
//! Score definitions stored as registry artifacts reduce a resource's
//! dependency artifacts (lint reports, complexity metrics, ...) to a
//! severity-classified score. Score card definitions group those scores.
//! Results are recomputed only when a definition or dependency changed.

pub mod artifact;
pub mod client;
pub mod config;
pub mod expr;
pub mod names;
pub mod schema;
pub mod scoring;

pub use artifact::Artifact;
pub use client::{ArtifactClient, ClientError, InMemoryRegistry, ResourceLister};
pub use config::{load_config, ScoringConfig};
pub use names::{parse_resource_pattern, ResourceInstance, ResourceName};
pub use scoring::{Outcome, ScoreCardEngine, ScoreEngine, ScoringError, ScoringResult};
