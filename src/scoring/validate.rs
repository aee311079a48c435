//! Static checks for score and score card definitions
//!
//! Validation never stops at the first problem: every violation found is
//! returned so a definition can be fixed in one pass.

use crate::expr::{CelEngine, ExpressionEngine};
use crate::names::{parse_reference, parse_resource_pattern, reference_value, NameError, ResourceName};
use crate::schema::scoring::{
    score_definition, BooleanThreshold, NumberThreshold, ScoreCardDefinition, ScoreDefinition, ScoreFormula,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid target_resource.pattern: {0}")]
    TargetPattern(NameError),

    #[error("missing formula, either 'score_formula' or 'rollup_formula' should be set")]
    MissingFormula,

    #[error("missing type, either of 'percent', 'integer' or 'boolean' should be set")]
    MissingType,

    #[error("missing score_formula.score_expression")]
    MissingScoreExpression,

    #[error("invalid score_formula.reference_id: {0}, it should not contain hyphens '-'")]
    InvalidReferenceId(String),

    #[error("missing rollup_formula.score_formulas")]
    EmptyRollup,

    #[error("missing rollup_formula.rollup_expression")]
    MissingRollupExpression,

    #[error("invalid expression {expression:?}: {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("missing score_patterns")]
    MissingScorePatterns,

    #[error("invalid pattern: {pattern:?}, must always start with '$resource.(api|version|spec|artifact)'")]
    UnreferencedPattern { pattern: String },

    #[error("invalid pattern: {pattern:?}, {reason}")]
    InvalidReference { pattern: String, reason: String },

    #[error("invalid {field}: {pattern:?}, it should end with a resourceID and not a \"-\"")]
    WildcardArtifact { field: &'static str, pattern: String },

    #[error("invalid min_value({min}) and max_value({max}), min_value should be less than max_value")]
    InvalidBounds { min: i32, max: i32 },

    #[error("invalid range [{min}, {max}]: range.min cannot be greater than range.max")]
    InvertedRange { min: i32, max: i32 },

    #[error("invalid range [{min}, {max}]: should be within min_value({lower}) and max_value({upper}) limits")]
    OutOfBounds { min: i32, max: i32, lower: i32, upper: i32 },

    #[error("incomplete coverage: missing coverage between {from} and {to}")]
    Gap { from: i64, to: i64 },

    #[error("invalid thresholds [{}, {}] and [{}, {}]: thresholds must not overlap", .first.0, .first.1, .second.0, .second.1)]
    Overlap { first: (i32, i32), second: (i32, i32) },

    #[error("incomplete coverage: missing coverage between {filled} and {max}")]
    MissingMaxCoverage { filled: i64, max: i32 },

    #[error("duplicate entries for '{0}' value")]
    DuplicateBoolean(bool),

    #[error("missing coverage for one or both of the boolean values")]
    MissingBooleanCoverage,
}

/// Checks a score definition stored under the project root `parent`
pub fn validate_score_definition(parent: &str, definition: &ScoreDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let target_pattern = definition
        .target_resource
        .as_ref()
        .map_or("", |target| target.pattern.as_str());
    match parse_resource_pattern(&format!("{parent}/{target_pattern}")) {
        Ok(target) => validate_formula(&target, definition.formula.as_ref(), &mut errors),
        Err(e) => errors.push(ValidationError::TargetPattern(e)),
    }

    match &definition.score_type {
        Some(score_definition::Type::Percent(percent)) => {
            validate_number_thresholds(&percent.thresholds, 0, 100, &mut errors);
        }
        Some(score_definition::Type::Integer(integer)) => {
            if integer.min_value >= integer.max_value {
                errors.push(ValidationError::InvalidBounds {
                    min: integer.min_value,
                    max: integer.max_value,
                });
            } else {
                validate_number_thresholds(&integer.thresholds, integer.min_value, integer.max_value, &mut errors);
            }
        }
        Some(score_definition::Type::Boolean(boolean)) => {
            validate_boolean_thresholds(&boolean.thresholds, &mut errors);
        }
        None => errors.push(ValidationError::MissingType),
    }

    errors
}

/// Checks a score card definition stored under the project root `parent`
pub fn validate_score_card_definition(parent: &str, definition: &ScoreCardDefinition) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let target_pattern = definition
        .target_resource
        .as_ref()
        .map_or("", |target| target.pattern.as_str());
    let target = match parse_resource_pattern(&format!("{parent}/{target_pattern}")) {
        Ok(target) => Some(target),
        Err(e) => {
            errors.push(ValidationError::TargetPattern(e));
            None
        }
    };

    if definition.score_patterns.is_empty() {
        errors.push(ValidationError::MissingScorePatterns);
        return errors;
    }

    if let Some(target) = target {
        for pattern in &definition.score_patterns {
            validate_pattern_reference(&target, pattern, &mut errors);
            if pattern.ends_with("/-") {
                errors.push(ValidationError::WildcardArtifact {
                    field: "score_pattern",
                    pattern: pattern.clone(),
                });
            }
        }
    }

    errors
}

fn validate_formula(
    target: &ResourceName,
    formula: Option<&score_definition::Formula>,
    errors: &mut Vec<ValidationError>,
) {
    match formula {
        Some(score_definition::Formula::ScoreFormula(formula)) => {
            validate_score_formula(target, formula, errors);
        }
        Some(score_definition::Formula::RollupFormula(rollup)) => {
            if rollup.score_formulas.is_empty() {
                errors.push(ValidationError::EmptyRollup);
            }
            for formula in &rollup.score_formulas {
                validate_score_formula(target, formula, errors);
            }
            if rollup.rollup_expression.is_empty() {
                errors.push(ValidationError::MissingRollupExpression);
            } else {
                check_expression(&rollup.rollup_expression, errors);
            }
        }
        None => errors.push(ValidationError::MissingFormula),
    }
}

fn validate_score_formula(target: &ResourceName, formula: &ScoreFormula, errors: &mut Vec<ValidationError>) {
    let pattern = formula.artifact.as_ref().map_or("", |artifact| artifact.pattern.as_str());

    validate_pattern_reference(target, pattern, errors);
    if pattern.ends_with("/-") {
        errors.push(ValidationError::WildcardArtifact {
            field: "score_formula.artifact.pattern",
            pattern: pattern.to_string(),
        });
    }

    if formula.score_expression.is_empty() {
        errors.push(ValidationError::MissingScoreExpression);
    } else {
        check_expression(&formula.score_expression, errors);
    }
    if formula.reference_id.contains('-') {
        errors.push(ValidationError::InvalidReferenceId(formula.reference_id.clone()));
    }
}

fn check_expression(expression: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = CelEngine.check(expression) {
        errors.push(ValidationError::InvalidExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        });
    }
}

fn validate_pattern_reference(target: &ResourceName, pattern: &str, errors: &mut Vec<ValidationError>) {
    match parse_reference(pattern) {
        Err(e) => errors.push(ValidationError::InvalidReference {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        }),
        Ok(None) => errors.push(ValidationError::UnreferencedPattern {
            pattern: pattern.to_string(),
        }),
        Ok(Some(_)) => {
            if let Err(e) = reference_value(pattern, target) {
                errors.push(ValidationError::InvalidReference {
                    pattern: pattern.to_string(),
                    reason: format!("invalid $resource reference in pattern: {e}"),
                });
            }
        }
    }
}

/// Ranges must tile `[lower, upper]` exactly, without gaps or overlaps
fn validate_number_thresholds(
    thresholds: &[NumberThreshold],
    lower: i32,
    upper: i32,
    errors: &mut Vec<ValidationError>,
) {
    // thresholds are optional
    if thresholds.is_empty() {
        return;
    }

    let mut ranges: Vec<(i32, i32)> = thresholds
        .iter()
        .map(|t| t.range.as_ref().map_or((0, 0), |r| (r.min, r.max)))
        .collect();

    let before = errors.len();
    for &(min, max) in &ranges {
        if min > max {
            errors.push(ValidationError::InvertedRange { min, max });
        } else if min < lower || max > upper {
            errors.push(ValidationError::OutOfBounds { min, max, lower, upper });
        }
    }
    // coverage is only meaningful once every range is well formed
    if errors.len() > before {
        return;
    }

    ranges.sort_by_key(|&(min, _)| min);

    let mut filled = i64::from(lower) - 1;
    let mut previous: Option<(i32, i32)> = None;
    for &(min, max) in &ranges {
        let next = filled + 1;
        let start = i64::from(min);
        if start > next {
            errors.push(ValidationError::Gap {
                from: next,
                to: start - 1,
            });
        } else if start < next {
            if let Some(first) = previous {
                errors.push(ValidationError::Overlap {
                    first,
                    second: (min, max),
                });
            }
        }
        if i64::from(max) >= filled {
            filled = i64::from(max);
            previous = Some((min, max));
        }
    }

    if filled < i64::from(upper) {
        errors.push(ValidationError::MissingMaxCoverage { filled, max: upper });
    }
}

fn validate_boolean_thresholds(thresholds: &[BooleanThreshold], errors: &mut Vec<ValidationError>) {
    let mut true_covered = false;
    let mut false_covered = false;
    for threshold in thresholds {
        let covered = if threshold.value {
            &mut true_covered
        } else {
            &mut false_covered
        };
        if *covered {
            errors.push(ValidationError::DuplicateBoolean(threshold.value));
        }
        *covered = true;
    }
    if !true_covered || !false_covered {
        errors.push(ValidationError::MissingBooleanCoverage);
    }
}
