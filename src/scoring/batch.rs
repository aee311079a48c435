//! Fan-out over every (definition, resource) pair of a project
//!
//! Definitions are read from `<project root>/artifacts/-` by MIME type,
//! each definition's target pattern is merged with the caller's input
//! pattern, and the engines run once per matching resource on a rayon
//! pool. One failing task never stops the others; failures are logged and
//! collected in the returned [`BatchReport`].

use super::{decode_artifact, Outcome, ScoreCardEngine, ScoreEngine, ScoringError, ScoringResult};
use crate::artifact::{score_card_definition_mime_type, score_definition_mime_type, Artifact};
use crate::client::{ArtifactClient, ResourceLister};
use crate::config::ScoringConfig;
use crate::names::{
    parse_resource_pattern, ApiName, ResourceInstance, ResourceKind, ResourceName, SpecName, VersionName, WILDCARD,
};
use crate::schema::scoring::{ResourcePattern, ScoreCardDefinition, ScoreDefinition};
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, info, warn};

/// A computation that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub definition: String,
    /// Unset when the definition itself could not be used
    pub resource: Option<String>,
    pub error: String,
}

/// Tally of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub uploaded: usize,
    pub dry_run: usize,
    pub up_to_date: usize,
    pub failures: Vec<TaskFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of computations attempted
    pub fn total(&self) -> usize {
        self.uploaded + self.dry_run + self.up_to_date + self.failures.iter().filter(|f| f.resource.is_some()).count()
    }

    fn record<T>(&mut self, definition: &str, resource: &ResourceInstance, result: ScoringResult<Outcome<T>>) {
        match result {
            Ok(Outcome::Uploaded(_)) => self.uploaded += 1,
            Ok(Outcome::DryRun(_)) => self.dry_run += 1,
            Ok(Outcome::UpToDate) => self.up_to_date += 1,
            Err(e) => {
                warn!("Failed to compute {} for {}: {}", definition, resource.name, e);
                self.fail(definition, Some(resource.name.to_string()), e);
            }
        }
    }

    fn fail(&mut self, definition: &str, resource: Option<String>, error: impl fmt::Display) {
        self.failures.push(TaskFailure {
            definition: definition.to_string(),
            resource,
            error: error.to_string(),
        });
    }
}

/// Definition artifacts of `mime_type` stored under `project_root`
pub fn list_definitions(
    client: &dyn ArtifactClient,
    project_root: &str,
    mime_type: &str,
) -> ScoringResult<Vec<Artifact>> {
    let pattern = format!("{project_root}/artifacts/-");
    client
        .list_artifacts(&pattern, &format!("mime_type == {mime_type:?}"), true)
        .map_err(|source| ScoringError::List { what: pattern, source })
}

fn incompatible(target: &ResourceName, input: &ResourceName, reason: impl Into<String>) -> ScoringError {
    ScoringError::IncompatibleTarget {
        target: target.to_string(),
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Checks that a concrete `resource` is selected by a definition's target
/// pattern, which is relative to `project_root`
pub fn matches_target(target_pattern: &str, resource: &ResourceName, project_root: &str) -> ScoringResult<()> {
    let target = parse_resource_pattern(&format!("{project_root}/{target_pattern}"))?;
    if !matches!(target.kind(), ResourceKind::Api | ResourceKind::Version | ResourceKind::Spec) {
        return Err(incompatible(&target, resource, format!("unsupported target kind {}", target.kind())));
    }
    if target.kind() != resource.kind() {
        return Err(incompatible(
            &target,
            resource,
            format!("expected a {}, got a {}", target.kind(), resource.kind()),
        ));
    }

    let segments = [
        ("api", target.api_id(), resource.api_id()),
        ("version", target.version_id(), resource.version_id()),
        ("spec", target.spec_id(), resource.spec_id()),
    ];
    for (segment, expected, actual) in segments {
        if let Some(expected) = expected {
            if expected != WILDCARD && Some(expected) != actual {
                return Err(incompatible(&target, resource, format!("{segment} mismatch")));
            }
        }
    }
    Ok(())
}

fn common_segment(a: &str, b: &str) -> Option<String> {
    match (a, b) {
        ("", _) | (_, "") => None,
        (a, b) if a == b => Some(a.to_string()),
        (WILDCARD, b) => Some(b.to_string()),
        (a, WILDCARD) => Some(a.to_string()),
        _ => None,
    }
}

/// Narrows the input pattern by a definition's target pattern
///
/// Both must name the same kind of resource. Each segment resolves to the
/// literal side when the other is `-`; two different literals cannot be
/// combined. Filters are joined with `&&`.
pub fn combined_pattern(
    target: &ResourcePattern,
    input: &ResourceName,
    input_filter: &str,
) -> ScoringResult<(ResourceName, String)> {
    let target_name = parse_resource_pattern(&format!("{}/{}", input.project_root(), target.pattern))?;
    let project_id = input.project_id().to_string();
    let merge = |a: Option<&str>, b: Option<&str>| {
        common_segment(a.unwrap_or_default(), b.unwrap_or_default())
            .ok_or_else(|| incompatible(&target_name, input, "cannot find common pattern"))
    };

    let merged = match (&target_name, input) {
        (ResourceName::Api(_), ResourceName::Api(_)) => ResourceName::Api(ApiName {
            project_id,
            api_id: merge(target_name.api_id(), input.api_id())?,
        }),
        (ResourceName::Version(_), ResourceName::Version(_)) => ResourceName::Version(VersionName {
            project_id,
            api_id: merge(target_name.api_id(), input.api_id())?,
            version_id: merge(target_name.version_id(), input.version_id())?,
        }),
        (ResourceName::Spec(_), ResourceName::Spec(_)) => ResourceName::Spec(SpecName {
            project_id,
            api_id: merge(target_name.api_id(), input.api_id())?,
            version_id: merge(target_name.version_id(), input.version_id())?,
            spec_id: merge(target_name.spec_id(), input.spec_id())?,
            revision_id: None,
        }),
        (ResourceName::Api(_) | ResourceName::Version(_) | ResourceName::Spec(_), _) => {
            return Err(incompatible(&target_name, input, "input pattern does not match target pattern"));
        }
        _ => return Err(incompatible(&target_name, input, "unsupported pattern")),
    };

    Ok((merged, combined_filter(&target.filter, input_filter)))
}

/// `(a) && (b)`, collapsing when the filters are equal or one is empty
pub fn combined_filter(a: &str, b: &str) -> String {
    match (a, b) {
        (a, b) if a == b => a.to_string(),
        ("", b) => b.to_string(),
        (a, "") => a.to_string(),
        (a, b) => format!("({a}) && ({b})"),
    }
}

/// Resolves every definition of one kind against the input pattern
fn plan_tasks<C, F>(
    client: &C,
    input: &ResourceName,
    filter: &str,
    mime_type: &str,
    target_of: F,
    report: &mut BatchReport,
) -> ScoringResult<Vec<(Artifact, ResourceInstance)>>
where
    C: ArtifactClient + ResourceLister,
    F: Fn(&Artifact) -> ScoringResult<Option<ResourcePattern>>,
{
    let definitions = list_definitions(client, &input.project_root(), mime_type)?;
    let mut tasks = Vec::new();

    for definition in definitions {
        let target = match target_of(&definition) {
            Ok(target) => target.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read definition {}: {}", definition.name, e);
                report.fail(&definition.name, None, e);
                continue;
            }
        };
        let (pattern, merged_filter) = match combined_pattern(&target, input, filter) {
            Ok(combined) => combined,
            Err(e) => {
                debug!("Skipping definition {}: {}", definition.name, e);
                continue;
            }
        };
        let resources = match client.list_resources(&pattern, &merged_filter) {
            Ok(resources) => resources,
            Err(source) => {
                let e = ScoringError::List {
                    what: pattern.to_string(),
                    source,
                };
                warn!("Skipping definition {}: {}", definition.name, e);
                report.fail(&definition.name, None, e);
                continue;
            }
        };
        if resources.is_empty() {
            debug!("No resources match {} for {}", pattern, definition.name);
        }

        tasks.extend(resources.into_iter().map(|resource| (definition.clone(), resource)));
    }

    Ok(tasks)
}

fn run_tasks<T, F>(
    tasks: &[(Artifact, ResourceInstance)],
    config: &ScoringConfig,
    compute: F,
    report: &mut BatchReport,
) -> ScoringResult<()>
where
    T: Send,
    F: Fn(&Artifact, &ResourceInstance) -> ScoringResult<Outcome<T>> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .build()?;

    let results: Vec<ScoringResult<Outcome<T>>> = pool.install(|| {
        tasks
            .par_iter()
            .map(|(definition, resource)| compute(definition, resource))
            .collect()
    });

    for ((definition, resource), result) in tasks.iter().zip(results) {
        report.record(&definition.name, resource, result);
    }
    Ok(())
}

/// Computes scores for every resource matching `input_pattern` and a score
/// definition of its project
pub fn compute_scores<C>(
    client: &C,
    input_pattern: &str,
    filter: &str,
    config: &ScoringConfig,
) -> ScoringResult<BatchReport>
where
    C: ArtifactClient + ResourceLister,
{
    let input = parse_resource_pattern(input_pattern)?;
    let mut report = BatchReport::default();

    let tasks = plan_tasks(
        client,
        &input,
        filter,
        &score_definition_mime_type(),
        |artifact| Ok(decode_artifact::<ScoreDefinition>(artifact)?.target_resource),
        &mut report,
    )?;

    let engine = ScoreEngine::with_config(client, config);
    run_tasks(
        &tasks,
        config,
        |definition, resource| engine.calculate_score(definition, resource, false),
        &mut report,
    )?;

    info!(
        "Computed {} scores for {}: {} uploaded, {} dry run, {} up-to-date, {} failed",
        report.total(),
        input,
        report.uploaded,
        report.dry_run,
        report.up_to_date,
        report.failures.len()
    );
    Ok(report)
}

/// Computes score cards for every resource matching `input_pattern` and a
/// score card definition of its project
pub fn compute_score_cards<C>(
    client: &C,
    input_pattern: &str,
    filter: &str,
    config: &ScoringConfig,
) -> ScoringResult<BatchReport>
where
    C: ArtifactClient + ResourceLister,
{
    let input = parse_resource_pattern(input_pattern)?;
    let mut report = BatchReport::default();

    let tasks = plan_tasks(
        client,
        &input,
        filter,
        &score_card_definition_mime_type(),
        |artifact| Ok(decode_artifact::<ScoreCardDefinition>(artifact)?.target_resource),
        &mut report,
    )?;

    let engine = ScoreCardEngine::with_config(client, config);
    run_tasks(
        &tasks,
        config,
        |definition, resource| engine.calculate_score_card(definition, resource, false),
        &mut report,
    )?;

    info!(
        "Computed {} score cards for {}: {} uploaded, {} dry run, {} up-to-date, {} failed",
        report.total(),
        input,
        report.uploaded,
        report.dry_run,
        report.up_to_date,
        report.failures.len()
    );
    Ok(report)
}

/// Computes every score definition of the resource's project that targets it
pub fn score_resource(
    client: &dyn ArtifactClient,
    resource: &ResourceInstance,
    config: &ScoringConfig,
) -> ScoringResult<BatchReport> {
    let project_root = resource.name.project_root();
    let engine = ScoreEngine::with_config(client, config);
    let mut report = BatchReport::default();

    for definition in list_definitions(client, &project_root, &score_definition_mime_type())? {
        let score_definition: ScoreDefinition = match decode_artifact(&definition) {
            Ok(score_definition) => score_definition,
            Err(e) => {
                warn!("Failed to read definition {}: {}", definition.name, e);
                report.fail(&definition.name, None, e);
                continue;
            }
        };
        let target = score_definition
            .target_resource
            .as_ref()
            .map_or("", |target| target.pattern.as_str());
        if let Err(e) = matches_target(target, &resource.name, &project_root) {
            debug!("Skipping definition {}: {}", definition.name, e);
            continue;
        }

        let result = engine.calculate_score(&definition, resource, false);
        report.record(&definition.name, resource, result);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryRegistry;
    use crate::names::parse_resource;
    use prost::Message;

    const ROOT: &str = "projects/demo/locations/global";

    fn target(pattern: &str, filter: &str) -> ResourcePattern {
        ResourcePattern {
            pattern: pattern.to_string(),
            filter: filter.to_string(),
        }
    }

    #[test]
    fn test_combined_filter() {
        assert_eq!(combined_filter("", ""), "");
        assert_eq!(combined_filter("a", "a"), "a");
        assert_eq!(combined_filter("a", ""), "a");
        assert_eq!(combined_filter("", "b"), "b");
        assert_eq!(combined_filter("a", "b"), "(a) && (b)");
    }

    #[test]
    fn test_combined_pattern() {
        let input = parse_resource_pattern(&format!("{ROOT}/apis/petstore/versions/-/specs/-")).unwrap();
        let (merged, filter) = combined_pattern(
            &target("apis/-/versions/-/specs/openapi", "name.contains('x')"),
            &input,
            "",
        )
        .unwrap();
        assert_eq!(merged.to_string(), format!("{ROOT}/apis/petstore/versions/-/specs/openapi"));
        assert_eq!(filter, "name.contains('x')");

        let input = parse_resource_pattern(&format!("{ROOT}/apis/-/versions/-")).unwrap();
        let (merged, _) = combined_pattern(&target("apis/-/versions/1.0.0", ""), &input, "").unwrap();
        assert_eq!(merged.to_string(), format!("{ROOT}/apis/-/versions/1.0.0"));
    }

    #[test]
    fn test_combined_pattern_conflicts() {
        let input = parse_resource_pattern(&format!("{ROOT}/apis/petstore/versions/-/specs/-")).unwrap();
        let err = combined_pattern(&target("apis/other/versions/-/specs/-", ""), &input, "").unwrap_err();
        assert!(matches!(err, ScoringError::IncompatibleTarget { .. }));

        // kinds differ
        let err = combined_pattern(&target("apis/-", ""), &input, "").unwrap_err();
        assert!(matches!(err, ScoringError::IncompatibleTarget { .. }));

        // target does not parse
        assert!(combined_pattern(&target("apis/-/specs/-", ""), &input, "").is_err());
    }

    #[test]
    fn test_matches_target() {
        let spec = parse_resource(&format!("{ROOT}/apis/petstore/versions/1.0.0/specs/openapi")).unwrap();
        assert!(matches_target("apis/-/versions/-/specs/-", &spec, ROOT).is_ok());
        assert!(matches_target("apis/petstore/versions/-/specs/openapi", &spec, ROOT).is_ok());
        assert!(matches_target("apis/other/versions/-/specs/-", &spec, ROOT).is_err());
        assert!(matches_target("apis/-/versions/2.0.0/specs/-", &spec, ROOT).is_err());
        assert!(matches_target("apis/-/versions/-", &spec, ROOT).is_err());

        let api = parse_resource(&format!("{ROOT}/apis/petstore")).unwrap();
        assert!(matches_target("apis/-", &api, ROOT).is_ok());
        assert!(matches_target("apis/-/versions/-/specs/-", &api, ROOT).is_err());
    }

    #[test]
    fn test_list_definitions_by_mime_type() {
        let registry = InMemoryRegistry::new();
        let definition = ScoreDefinition {
            id: "lint".into(),
            ..Default::default()
        };
        registry
            .insert_artifact(Artifact::new(
                format!("{ROOT}/artifacts/lint"),
                score_definition_mime_type(),
                definition.encode_to_vec(),
            ))
            .unwrap();
        registry
            .insert_artifact(Artifact::new(
                format!("{ROOT}/artifacts/card"),
                score_card_definition_mime_type(),
                vec![],
            ))
            .unwrap();

        let listed = list_definitions(&registry, ROOT, &score_definition_mime_type()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, format!("{ROOT}/artifacts/lint"));
        assert!(!listed[0].contents.is_empty());
    }

    #[test]
    fn test_report_total() {
        let mut report = BatchReport {
            uploaded: 2,
            up_to_date: 1,
            ..Default::default()
        };
        report.fail("def", None, "unreadable");
        report.fail("def", Some("spec".into()), "failed");
        assert_eq!(report.total(), 4);
        assert!(!report.is_success());
    }
}
