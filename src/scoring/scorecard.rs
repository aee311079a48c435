//! Score card assembly for a single resource

use super::{decode_artifact, definition_name, fetch_existing, is_newer, Outcome, ScoringError, ScoringResult};
use crate::artifact::{score_card_mime_type, Artifact};
use crate::client::ArtifactClient;
use crate::config::ScoringConfig;
use crate::names::{substitute_reference_entity, ResourceInstance};
use crate::schema::scoring::{Score, ScoreCard, ScoreCardDefinition};
use prost::Message;
use std::time::Duration;
use tracing::debug;

fn score_card_id(definition_id: &str) -> String {
    format!("scorecard-{definition_id}")
}

/// Collects existing scores into `ScoreCard` artifacts
pub struct ScoreCardEngine<'a> {
    client: &'a dyn ArtifactClient,
    grace: Duration,
    dry_run: bool,
}

impl<'a> ScoreCardEngine<'a> {
    pub fn new(client: &'a dyn ArtifactClient) -> Self {
        Self::with_config(client, &ScoringConfig::default())
    }

    pub fn with_config(client: &'a dyn ArtifactClient, config: &ScoringConfig) -> Self {
        Self {
            client,
            grace: config.staleness_grace(),
            dry_run: config.dry_run,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builds the card defined in `definition` for `resource`
    ///
    /// Scores appear in the order of the definition's `score_patterns`.
    pub fn calculate_score_card(
        &self,
        definition: &Artifact,
        resource: &ResourceInstance,
        take_action: bool,
    ) -> ScoringResult<Outcome<ScoreCard>> {
        let card_definition: ScoreCardDefinition = decode_artifact(definition)?;
        let card_name = resource
            .name
            .artifact_named(&score_card_id(&card_definition.id))
            .to_string();

        let existing = fetch_existing(self.client, &card_name)?;
        let mut needs_update = take_action || is_newer(definition.update_time, existing.as_ref(), self.grace);

        let mut scores = Vec::with_capacity(card_definition.score_patterns.len());
        for pattern in &card_definition.score_patterns {
            let score_name = substitute_reference_entity(pattern, &resource.name)
                .map_err(|e| ScoringError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?
                .to_string();
            let artifact = self
                .client
                .get_artifact(&score_name, true)
                .map_err(|source| ScoringError::Fetch {
                    name: score_name,
                    source,
                })?;

            needs_update |= is_newer(artifact.update_time, existing.as_ref(), self.grace);
            scores.push(decode_artifact::<Score>(&artifact)?);
        }

        if !needs_update {
            debug!("ScoreCard {} is already up-to-date", card_name);
            return Ok(Outcome::UpToDate);
        }

        let score_card = ScoreCard {
            id: score_card_id(&card_definition.id),
            kind: "ScoreCard".to_string(),
            display_name: card_definition.display_name,
            description: card_definition.description,
            definition_name: definition_name(&resource.name.project_root(), &card_definition.id),
            scores,
        };
        if self.dry_run {
            debug!("Dry run, not uploading {}", card_name);
            return Ok(Outcome::DryRun(score_card));
        }

        debug!("Uploading {}", card_name);
        let artifact = Artifact::new(card_name.clone(), score_card_mime_type(), score_card.encode_to_vec());
        self.client
            .set_artifact(artifact)
            .map_err(|source| ScoringError::Upload {
                name: card_name,
                source,
            })?;
        Ok(Outcome::Uploaded(score_card))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{score_card_definition_mime_type, score_mime_type};
    use crate::client::InMemoryRegistry;
    use crate::names::parse_resource;
    use crate::schema::scoring::{ResourcePattern, Severity};
    use chrono::{DateTime, Utc};

    const ROOT: &str = "projects/demo/locations/global";
    const SPEC: &str = "projects/demo/locations/global/apis/petstore/versions/1.0.0/specs/openapi";

    fn an_hour_ago() -> DateTime<Utc> {
        Utc::now() - chrono::Duration::hours(1)
    }

    fn insert_score(registry: &InMemoryRegistry, parent: &str, id: &str, severity: Severity) {
        let score = Score {
            id: format!("score-{id}"),
            kind: "Score".into(),
            severity: severity as i32,
            ..Default::default()
        };
        registry
            .insert_artifact(
                Artifact::new(
                    format!("{parent}/artifacts/score-{id}"),
                    score_mime_type(),
                    score.encode_to_vec(),
                )
                .with_update_time(an_hour_ago()),
            )
            .unwrap();
    }

    fn seed(registry: &InMemoryRegistry) -> (Artifact, ResourceInstance) {
        // stored out of pattern order
        insert_score(registry, SPEC, "lint", Severity::Alert);
        insert_score(registry, SPEC, "complexity", Severity::Ok);

        let definition = ScoreCardDefinition {
            id: "quality".into(),
            display_name: "Quality".into(),
            target_resource: Some(ResourcePattern {
                pattern: "apis/-/versions/-/specs/-".into(),
                filter: String::new(),
            }),
            score_patterns: vec![
                "$resource.spec/artifacts/score-complexity".into(),
                "$resource.spec/artifacts/score-lint".into(),
            ],
            ..Default::default()
        };
        let artifact = Artifact::new(
            format!("{ROOT}/artifacts/quality"),
            score_card_definition_mime_type(),
            definition.encode_to_vec(),
        )
        .with_update_time(an_hour_ago());
        registry.insert_artifact(artifact.clone()).unwrap();

        (artifact, ResourceInstance::new(parse_resource(SPEC).unwrap(), an_hour_ago()))
    }

    #[test]
    fn test_scores_follow_pattern_order() {
        let registry = InMemoryRegistry::new();
        let (definition, resource) = seed(&registry);

        let outcome = ScoreCardEngine::new(&registry)
            .calculate_score_card(&definition, &resource, false)
            .unwrap();
        let card = outcome.value().unwrap();
        let ids: Vec<&str> = card.scores.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["score-complexity", "score-lint"]);
        assert_eq!(card.id, "scorecard-quality");
        assert_eq!(card.kind, "ScoreCard");
        assert_eq!(card.definition_name, format!("{ROOT}/artifacts/quality"));

        let stored = registry.artifact(&format!("{SPEC}/artifacts/scorecard-quality")).unwrap();
        assert_eq!(stored.mime_type, score_card_mime_type());
    }

    #[test]
    fn test_second_calculation_is_up_to_date() {
        let registry = InMemoryRegistry::new();
        let (definition, resource) = seed(&registry);
        let engine = ScoreCardEngine::new(&registry);

        assert!(engine.calculate_score_card(&definition, &resource, false).unwrap().is_uploaded());
        assert!(engine.calculate_score_card(&definition, &resource, false).unwrap().is_up_to_date());
        assert_eq!(registry.upload_count(), 1);
    }

    #[test]
    fn test_updated_score_forces_upload() {
        let registry = InMemoryRegistry::new();
        let (definition, resource) = seed(&registry);
        let engine = ScoreCardEngine::new(&registry);
        engine.calculate_score_card(&definition, &resource, false).unwrap();

        let lint = registry.artifact(&format!("{SPEC}/artifacts/score-lint")).unwrap();
        registry.insert_artifact(lint.with_update_time(Utc::now())).unwrap();

        assert!(engine.calculate_score_card(&definition, &resource, false).unwrap().is_uploaded());
        assert_eq!(registry.upload_count(), 2);
    }

    #[test]
    fn test_missing_score_aborts() {
        let registry = InMemoryRegistry::new();
        let (definition, _) = seed(&registry);
        let other = ResourceInstance::new(
            parse_resource("projects/demo/locations/global/apis/petstore/versions/1.0.0/specs/other").unwrap(),
            an_hour_ago(),
        );
        let err = ScoreCardEngine::new(&registry)
            .calculate_score_card(&definition, &other, false)
            .unwrap_err();
        assert!(matches!(err, ScoringError::Fetch { .. }));
        assert_eq!(registry.upload_count(), 0);
    }

    #[test]
    fn test_dry_run() {
        let registry = InMemoryRegistry::new();
        let (definition, resource) = seed(&registry);
        let outcome = ScoreCardEngine::new(&registry)
            .dry_run(true)
            .calculate_score_card(&definition, &resource, true)
            .unwrap();
        assert!(matches!(outcome, Outcome::DryRun(ref card) if card.scores.len() == 2));
        assert_eq!(registry.upload_count(), 0);
    }
}
