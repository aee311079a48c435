//! Score computation for a single resource

use super::{
    decode_artifact, definition_name, fetch_existing, is_newer, Evaluator, Outcome, ScoreValue, ScoringError,
    ScoringResult,
};
use crate::artifact::{score_mime_type, Artifact};
use crate::client::ArtifactClient;
use crate::config::ScoringConfig;
use crate::expr::Value;
use crate::names::{substitute_reference_entity, ResourceInstance, ResourceKind};
use crate::schema::scoring::{
    score, score_definition, BooleanValue, IntegerValue, PercentValue, RollUpFormula, Score, ScoreDefinition,
    ScoreFormula,
};
use prost::Message;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

fn score_id(definition_id: &str) -> String {
    format!("score-{definition_id}")
}

/// Computes and stores scores defined by `ScoreDefinition` artifacts
pub struct ScoreEngine<'a> {
    client: &'a dyn ArtifactClient,
    evaluator: Evaluator,
    grace: Duration,
    dry_run: bool,
}

impl<'a> ScoreEngine<'a> {
    pub fn new(client: &'a dyn ArtifactClient) -> Self {
        Self::with_config(client, &ScoringConfig::default())
    }

    pub fn with_config(client: &'a dyn ArtifactClient, config: &ScoringConfig) -> Self {
        Self {
            client,
            evaluator: Evaluator::default(),
            grace: config.staleness_grace(),
            dry_run: config.dry_run,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Evaluates the definition stored in `definition` against `resource`
    ///
    /// The score is uploaded when `take_action` is set, when no score exists
    /// yet, or when the definition or any dependency changed since the
    /// existing score was written.
    pub fn calculate_score(
        &self,
        definition: &Artifact,
        resource: &ResourceInstance,
        take_action: bool,
    ) -> ScoringResult<Outcome<Score>> {
        let score_definition: ScoreDefinition = decode_artifact(definition)?;
        let score_name = resource
            .name
            .artifact_named(&score_id(&score_definition.id))
            .to_string();

        let existing = fetch_existing(self.client, &score_name)?;
        let take_action = take_action || is_newer(definition.update_time, existing.as_ref(), self.grace);

        let (value, needs_update) = match &score_definition.formula {
            Some(score_definition::Formula::ScoreFormula(formula)) => {
                self.process_score_formula(formula, resource, existing.as_ref(), take_action)?
            }
            Some(score_definition::Formula::RollupFormula(formula)) => {
                self.process_rollup_formula(formula, resource, existing.as_ref(), take_action)?
            }
            None => return Err(ScoringError::Missing("formula")),
        };

        if !needs_update {
            debug!("Score {} is already up-to-date", score_name);
            return Ok(Outcome::UpToDate);
        }

        let score = score_from_value(&score_definition, value, &resource.name.project_root())?;
        if self.dry_run {
            debug!("Dry run, not uploading {}", score_name);
            return Ok(Outcome::DryRun(score));
        }

        debug!("Uploading {}", score_name);
        let artifact = Artifact::new(score_name.clone(), score_mime_type(), score.encode_to_vec());
        self.client
            .set_artifact(artifact)
            .map_err(|source| ScoringError::Upload {
                name: score_name,
                source,
            })?;
        Ok(Outcome::Uploaded(score))
    }

    fn process_score_formula(
        &self,
        formula: &ScoreFormula,
        resource: &ResourceInstance,
        existing: Option<&Artifact>,
        take_action: bool,
    ) -> ScoringResult<(ScoreValue, bool)> {
        let pattern = formula.artifact.as_ref().map_or("", |artifact| artifact.pattern.as_str());
        let invalid = |reason: String| ScoringError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };
        let artifact_name = substitute_reference_entity(pattern, &resource.name).map_err(|e| invalid(e.to_string()))?;
        if artifact_name.kind() != ResourceKind::Artifact || artifact_name.is_collection() {
            return Err(invalid(format!("{artifact_name} is not an artifact")));
        }
        if formula.score_expression.is_empty() {
            return Err(ScoringError::Missing("score_formula.score_expression"));
        }

        let artifact_name = artifact_name.to_string();
        let artifact = self
            .client
            .get_artifact(&artifact_name, true)
            .map_err(|source| ScoringError::Fetch {
                name: artifact_name,
                source,
            })?;

        let needs_update = take_action || is_newer(artifact.update_time, existing, self.grace);
        let value = self
            .evaluator
            .evaluate(&formula.score_expression, &artifact.mime_type, &artifact.contents)?;
        Ok((value, needs_update))
    }

    fn process_rollup_formula(
        &self,
        formula: &RollUpFormula,
        resource: &ResourceInstance,
        existing: Option<&Artifact>,
        take_action: bool,
    ) -> ScoringResult<(ScoreValue, bool)> {
        if formula.score_formulas.is_empty() {
            return Err(ScoringError::Missing("rollup_formula.score_formulas"));
        }
        if formula.rollup_expression.is_empty() {
            return Err(ScoringError::Missing("rollup_formula.rollup_expression"));
        }

        let mut needs_update = take_action;
        let mut values = BTreeMap::new();
        for score_formula in &formula.score_formulas {
            let (value, formula_needs_update) = self
                .process_score_formula(score_formula, resource, existing, take_action)
                .map_err(|e| ScoringError::Rollup(Box::new(e)))?;

            let reference_id = &score_formula.reference_id;
            if reference_id.is_empty() || reference_id.contains('-') {
                return Err(ScoringError::InvalidReferenceId(reference_id.clone()));
            }
            values.insert(reference_id.clone(), Value::from(value));
            needs_update |= formula_needs_update;
        }

        let value = self.evaluator.evaluate_with_env(&formula.rollup_expression, &values)?;
        Ok((value, needs_update))
    }
}

/// Builds the `Score` for a computed value
///
/// Integer values are truncated toward zero and must lie within the
/// definition's bounds; percentages must lie within `[0, 100]`. Severity
/// comes from the thresholds containing the value; where declared ranges
/// share a boundary the later one wins.
pub fn score_from_value(definition: &ScoreDefinition, value: ScoreValue, project_root: &str) -> ScoringResult<Score> {
    let mut score = Score {
        id: score_id(&definition.id),
        kind: "Score".to_string(),
        display_name: definition.display_name.clone(),
        description: definition.description.clone(),
        uri: definition.uri.clone(),
        uri_display_name: definition.uri_display_name.clone(),
        definition_name: definition_name(project_root, &definition.id),
        ..Default::default()
    };

    match &definition.score_type {
        Some(score_definition::Type::Integer(integer)) => {
            let truncated = match value {
                ScoreValue::Int(i) => i,
                ScoreValue::Double(d) => d.trunc() as i64,
                ScoreValue::Bool(_) => {
                    return Err(ScoringError::TypeMismatch {
                        expected: "int or double",
                        found: value.type_name(),
                    })
                }
            };
            let (min, max) = (integer.min_value, integer.max_value);
            let value = i32::try_from(truncated)
                .ok()
                .filter(|v| (min..=max).contains(v))
                .ok_or_else(|| ScoringError::OutOfRange {
                    value: truncated.to_string(),
                    min: i64::from(min),
                    max: i64::from(max),
                })?;

            score.value = Some(score::Value::IntegerValue(IntegerValue {
                value,
                min_value: min,
                max_value: max,
            }));
            if let Some(threshold) = integer
                .thresholds
                .iter()
                .rev()
                .find(|t| t.range.as_ref().is_some_and(|r| (r.min..=r.max).contains(&value)))
            {
                score.severity = threshold.severity;
            }
        }
        Some(score_definition::Type::Percent(percent)) => {
            let value = match value {
                ScoreValue::Int(i) => i as f64,
                ScoreValue::Double(d) => d,
                ScoreValue::Bool(_) => {
                    return Err(ScoringError::TypeMismatch {
                        expected: "int or double",
                        found: value.type_name(),
                    })
                }
            };
            if !(0.0..=100.0).contains(&value) {
                return Err(ScoringError::OutOfRange {
                    value: value.to_string(),
                    min: 0,
                    max: 100,
                });
            }

            let value = value as f32;
            score.value = Some(score::Value::PercentValue(PercentValue { value }));
            if let Some(threshold) = percent.thresholds.iter().rev().find(|t| {
                t.range
                    .as_ref()
                    .is_some_and(|r| value >= r.min as f32 && value <= r.max as f32)
            }) {
                score.severity = threshold.severity;
            }
        }
        Some(score_definition::Type::Boolean(boolean)) => {
            let ScoreValue::Bool(value) = value else {
                return Err(ScoringError::TypeMismatch {
                    expected: "bool",
                    found: value.type_name(),
                });
            };
            let display_value = match (value, boolean.display_true.as_str(), boolean.display_false.as_str()) {
                (true, display, _) | (false, _, display) if !display.is_empty() => display.to_string(),
                _ => value.to_string(),
            };

            score.value = Some(score::Value::BooleanValue(BooleanValue { value, display_value }));
            if let Some(threshold) = boolean.thresholds.iter().rev().find(|t| t.value == value) {
                score.severity = threshold.severity;
            }
        }
        None => return Err(ScoringError::Missing("type")),
    }

    Ok(score)
}
