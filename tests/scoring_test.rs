//! End-to-end scoring against the in-memory registry
//!
//! Each test seeds a project with specs, dependency artifacts and
//! definitions, then drives the public engines and batch functions.

use chrono::{DateTime, Duration, Utc};
use prost::Message;
use registry_scoring::artifact::{
    mime_type_for_message_type, score_card_definition_mime_type, score_definition_mime_type, score_mime_type,
};
use registry_scoring::schema::scoring::{
    number_threshold::NumberRange, score, score_definition, IntegerType, NumberThreshold, PercentType,
    ResourcePattern, RollUpFormula, Score, ScoreCard, ScoreCardDefinition, ScoreDefinition, ScoreFormula, Severity,
};
use registry_scoring::schema::{metrics, style, COMPLEXITY_TYPE, LINT_TYPE};
use registry_scoring::scoring::{compute_score_cards, compute_scores, score_resource};
use registry_scoring::{
    parse_resource_pattern, Artifact, ArtifactClient, InMemoryRegistry, Outcome, ResourceInstance, ScoreEngine,
    ScoringConfig,
};

const ROOT: &str = "projects/demo/locations/global";

fn spec(version: &str) -> String {
    format!("{ROOT}/apis/petstore/versions/{version}/specs/openapi")
}

fn an_hour_ago() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

fn pattern(p: &str) -> Option<ResourcePattern> {
    Some(ResourcePattern {
        pattern: p.to_string(),
        filter: String::new(),
    })
}

fn formula(artifact: &str, expression: &str, reference_id: &str) -> ScoreFormula {
    ScoreFormula {
        artifact: pattern(artifact),
        score_expression: expression.to_string(),
        reference_id: reference_id.to_string(),
    }
}

fn threshold(severity: Severity, min: i32, max: i32) -> NumberThreshold {
    NumberThreshold {
        severity: severity as i32,
        range: Some(NumberRange { min, max }),
    }
}

fn seed_artifact(registry: &InMemoryRegistry, name: String, mime_type: String, contents: Vec<u8>) {
    registry
        .insert_artifact(Artifact::new(name, mime_type, contents).with_update_time(an_hour_ago()))
        .unwrap();
}

fn seed_spec(registry: &InMemoryRegistry, version: &str, problems: usize) {
    registry.insert_resource(&spec(version), an_hour_ago()).unwrap();
    let lint = style::Lint {
        name: "spectral".into(),
        files: vec![style::LintFile {
            file_path: "openapi.yaml".into(),
            problems: vec![style::LintProblem::default(); problems],
        }],
    };
    seed_artifact(
        registry,
        format!("{}/artifacts/lint-spectral", spec(version)),
        mime_type_for_message_type(LINT_TYPE),
        lint.encode_to_vec(),
    );
    let complexity = metrics::Complexity {
        get_count: 1,
        post_count: 1,
        put_count: 1,
        delete_count: 1,
        ..Default::default()
    };
    seed_artifact(
        registry,
        format!("{}/artifacts/complexity", spec(version)),
        mime_type_for_message_type(COMPLEXITY_TYPE),
        complexity.encode_to_vec(),
    );
}

fn lint_definition() -> ScoreDefinition {
    ScoreDefinition {
        id: "lint-errors".into(),
        target_resource: pattern("apis/-/versions/-/specs/-"),
        formula: Some(score_definition::Formula::ScoreFormula(formula(
            "$resource.spec/artifacts/lint-spectral",
            "size(files[0].problems)",
            "",
        ))),
        score_type: Some(score_definition::Type::Integer(IntegerType {
            min_value: 0,
            max_value: 10,
            thresholds: vec![
                threshold(Severity::Ok, 0, 3),
                threshold(Severity::Warning, 4, 6),
                threshold(Severity::Alert, 6, 10),
            ],
        })),
        ..Default::default()
    }
}

fn ratio_definition() -> ScoreDefinition {
    ScoreDefinition {
        id: "errors-per-operation".into(),
        target_resource: pattern("apis/-/versions/-/specs/-"),
        formula: Some(score_definition::Formula::RollupFormula(RollUpFormula {
            score_formulas: vec![
                formula(
                    "$resource.spec/artifacts/lint-spectral",
                    "size(files[0].problems)",
                    "numErrors",
                ),
                formula(
                    "$resource.spec/artifacts/complexity",
                    "getCount + postCount + putCount + deleteCount",
                    "numOperations",
                ),
            ],
            rollup_expression: "double(numErrors)/numOperations".into(),
        })),
        score_type: Some(score_definition::Type::Percent(PercentType {
            thresholds: vec![threshold(Severity::Ok, 0, 100)],
        })),
        ..Default::default()
    }
}

fn seed_definition(registry: &InMemoryRegistry, definition: &ScoreDefinition) -> Artifact {
    let artifact = Artifact::new(
        format!("{ROOT}/artifacts/{}", definition.id),
        score_definition_mime_type(),
        definition.encode_to_vec(),
    )
    .with_update_time(an_hour_ago());
    registry.insert_artifact(artifact.clone()).unwrap();
    artifact
}

fn stored_score(registry: &InMemoryRegistry, name: &str) -> Score {
    let artifact = registry.artifact(name).unwrap();
    assert_eq!(artifact.mime_type, score_mime_type());
    Score::decode(artifact.contents.as_slice()).unwrap()
}

fn instance(name: &str) -> ResourceInstance {
    ResourceInstance::parse(name, an_hour_ago()).unwrap()
}

#[test]
fn test_repeated_calculation_uploads_once() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    let definition = seed_definition(&registry, &lint_definition());
    let resource = instance(&spec("1.0.0"));

    let engine = ScoreEngine::new(&registry);
    assert!(engine.calculate_score(&definition, &resource, false).unwrap().is_uploaded());
    assert!(engine.calculate_score(&definition, &resource, false).unwrap().is_up_to_date());
    assert_eq!(registry.upload_count(), 1);

    let score = stored_score(&registry, &format!("{}/artifacts/score-lint-errors", spec("1.0.0")));
    assert_eq!(score.severity(), Severity::Ok);
    assert_eq!(score.definition_name, format!("{ROOT}/artifacts/lint-errors"));
}

#[test]
fn test_rollup_ratio() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 2);
    let definition = seed_definition(&registry, &ratio_definition());

    let outcome = ScoreEngine::new(&registry)
        .calculate_score(&definition, &instance(&spec("1.0.0")), false)
        .unwrap();
    let Some(score::Value::PercentValue(value)) = outcome.value().and_then(|s| s.value.clone()) else {
        panic!("expected a percent value");
    };
    assert_eq!(value.value, 0.5);
}

#[test]
fn test_rollup_failure_is_wrapped() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 2);
    let mut definition = ratio_definition();
    if let Some(score_definition::Formula::RollupFormula(rollup)) = &mut definition.formula {
        rollup.score_formulas[1].artifact = pattern("$resource.spec/artifacts/missing");
    }
    let definition = seed_definition(&registry, &definition);

    let err = ScoreEngine::new(&registry)
        .calculate_score(&definition, &instance(&spec("1.0.0")), false)
        .unwrap_err();
    assert!(err.to_string().starts_with("error processing rollup_formula.score_formulas"));
    assert_eq!(registry.upload_count(), 0);
}

#[test]
fn test_rollup_tracks_every_dependency() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 2);
    let definition = seed_definition(&registry, &ratio_definition());
    let resource = instance(&spec("1.0.0"));
    let engine = ScoreEngine::new(&registry);
    assert!(engine.calculate_score(&definition, &resource, false).unwrap().is_uploaded());

    // Move the computed score into the past so one dependency can land after it.
    let score_name = format!("{}/artifacts/score-errors-per-operation", spec("1.0.0"));
    let score = registry.artifact(&score_name).unwrap();
    registry
        .insert_artifact(score.with_update_time(Utc::now() - Duration::minutes(30)))
        .unwrap();

    let complexity_name = format!("{}/artifacts/complexity", spec("1.0.0"));
    let complexity = registry.artifact(&complexity_name).unwrap();
    registry
        .insert_artifact(complexity.with_update_time(Utc::now() - Duration::minutes(10)))
        .unwrap();

    assert!(engine.calculate_score(&definition, &resource, false).unwrap().is_uploaded());
    assert!(engine.calculate_score(&definition, &resource, false).unwrap().is_up_to_date());
    assert_eq!(registry.upload_count(), 2);
}

#[test]
fn test_compute_scores_for_project() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    seed_spec(&registry, "2.0.0", 5);
    seed_spec(&registry, "3.0.0", 6);
    seed_definition(&registry, &lint_definition());

    let config = ScoringConfig::default();
    let input = format!("{ROOT}/apis/-/versions/-/specs/-");
    let report = compute_scores(&registry, &input, "", &config).unwrap();
    assert_eq!(report.uploaded, 3);
    assert!(report.is_success());

    let severity = |version: &str| {
        stored_score(&registry, &format!("{}/artifacts/score-lint-errors", spec(version))).severity()
    };
    assert_eq!(severity("1.0.0"), Severity::Ok);
    assert_eq!(severity("2.0.0"), Severity::Warning);
    assert_eq!(severity("3.0.0"), Severity::Alert);

    let again = compute_scores(&registry, &input, "", &config).unwrap();
    assert_eq!(again.up_to_date, 3);
    assert_eq!(registry.upload_count(), 3);
}

#[test]
fn test_compute_scores_with_filter_and_narrow_input() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    seed_spec(&registry, "2.0.0", 1);
    seed_definition(&registry, &lint_definition());

    let config = ScoringConfig::default();
    let report = compute_scores(
        &registry,
        &format!("{ROOT}/apis/petstore/versions/-/specs/-"),
        "name.contains('2.0.0')",
        &config,
    )
    .unwrap();
    assert_eq!(report.uploaded, 1);
    assert!(registry
        .artifact(&format!("{}/artifacts/score-lint-errors", spec("2.0.0")))
        .is_some());
    assert!(registry
        .artifact(&format!("{}/artifacts/score-lint-errors", spec("1.0.0")))
        .is_none());
}

#[test]
fn test_failures_do_not_stop_the_batch() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    seed_spec(&registry, "2.0.0", 11);
    seed_definition(&registry, &lint_definition());

    let report = compute_scores(
        &registry,
        &format!("{ROOT}/apis/-/versions/-/specs/-"),
        "",
        &ScoringConfig::default(),
    )
    .unwrap();
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].resource.as_deref(), Some(spec("2.0.0").as_str()));
    assert_eq!(report.failures[0].definition, format!("{ROOT}/artifacts/lint-errors"));
}

#[test]
fn test_dry_run_config_uploads_nothing() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    seed_definition(&registry, &lint_definition());

    let config = ScoringConfig {
        dry_run: true,
        jobs: 2,
        ..Default::default()
    };
    let report = compute_scores(&registry, &format!("{ROOT}/apis/-/versions/-/specs/-"), "", &config).unwrap();
    assert_eq!(report.dry_run, 1);
    assert_eq!(registry.upload_count(), 0);
}

#[test]
fn test_definitions_for_other_kinds_are_skipped() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    let mut api_definition = lint_definition();
    api_definition.id = "api-level".into();
    api_definition.target_resource = pattern("apis/-");
    seed_definition(&registry, &api_definition);
    seed_definition(&registry, &lint_definition());

    let report = compute_scores(
        &registry,
        &format!("{ROOT}/apis/-/versions/-/specs/-"),
        "",
        &ScoringConfig::default(),
    )
    .unwrap();
    assert_eq!(report.uploaded, 1);
    assert!(report.is_success());
}

#[test]
fn test_score_resource_runs_matching_definitions() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 2);
    seed_definition(&registry, &lint_definition());
    seed_definition(&registry, &ratio_definition());
    let mut other = lint_definition();
    other.id = "other-api".into();
    other.target_resource = pattern("apis/other/versions/-/specs/-");
    seed_definition(&registry, &other);

    let report = score_resource(&registry, &instance(&spec("1.0.0")), &ScoringConfig::default()).unwrap();
    assert_eq!(report.uploaded, 2);
    assert!(registry
        .get_artifact(&format!("{}/artifacts/score-other-api", spec("1.0.0")), false)
        .is_err());
}

#[test]
fn test_score_cards_after_scores() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 2);
    seed_definition(&registry, &lint_definition());
    seed_definition(&registry, &ratio_definition());

    let card_definition = ScoreCardDefinition {
        id: "quality".into(),
        target_resource: pattern("apis/-/versions/-/specs/-"),
        score_patterns: vec![
            "$resource.spec/artifacts/score-errors-per-operation".into(),
            "$resource.spec/artifacts/score-lint-errors".into(),
        ],
        ..Default::default()
    };
    seed_artifact(
        &registry,
        format!("{ROOT}/artifacts/quality"),
        score_card_definition_mime_type(),
        card_definition.encode_to_vec(),
    );

    let config = ScoringConfig::default();
    let input = format!("{ROOT}/apis/-/versions/-/specs/-");
    compute_scores(&registry, &input, "", &config).unwrap();
    let report = compute_score_cards(&registry, &input, "", &config).unwrap();
    assert_eq!(report.uploaded, 1);

    let stored = registry
        .artifact(&format!("{}/artifacts/scorecard-quality", spec("1.0.0")))
        .unwrap();
    let card = ScoreCard::decode(stored.contents.as_slice()).unwrap();
    let ids: Vec<&str> = card.scores.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["score-errors-per-operation", "score-lint-errors"]);
}

#[test]
fn test_invalid_input_pattern() {
    let registry = InMemoryRegistry::new();
    assert!(compute_scores(&registry, "projects/demo/bogus", "", &ScoringConfig::default()).is_err());
    assert!(parse_resource_pattern("projects/demo/bogus").is_err());
}

#[test]
fn test_outcome_of_up_to_date_has_no_value() {
    let registry = InMemoryRegistry::new();
    seed_spec(&registry, "1.0.0", 1);
    let definition = seed_definition(&registry, &lint_definition());
    let resource = instance(&spec("1.0.0"));
    let engine = ScoreEngine::new(&registry);
    engine.calculate_score(&definition, &resource, false).unwrap();
    assert_eq!(engine.calculate_score(&definition, &resource, false).unwrap(), Outcome::UpToDate);
}
