//! Per-Set Critique Engine
//!
//! Evaluates a filtered group of requirements against the set qualities and
//! caches the result under (artifact, filter criteria).

use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

use crate::ai::client::{AiError, CompletionProvider};
use crate::ai::evaluator::{run_isolated, CritiqueEngine};
use crate::ai::prompts::{build_requirements_listing, build_set_prompt, SET_SYSTEM_PROMPT};
use crate::ai::query::{query_json, QueryBudget};
use crate::ai::responses::SetEvaluationResponse;
use crate::critique::{
    flagged_requirements, health_percentage, merge_critiques, structure_critiques, SetCritique,
};
use crate::error::CritiqueError;
use crate::models::{ArtifactId, FilterCriteria, ProjectContext, SetCritiqueStats, SetQuality};

/// Evaluation of one set quality, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SetQualityResult {
    pub quality: SetQuality,
    pub summary: String,
    /// Merged critiques, each naming at least two requirements
    pub critiques: Vec<SetCritique>,
    pub percentage: u8,
}

impl<'a> CritiqueEngine<'a> {
    /// Evaluates the requirements matching `filter_criteria` as a set.
    ///
    /// Returns `Ok(None)` when no requirement matches. Otherwise the cached
    /// evaluation for the key is replaced and the qualities that produced at
    /// least one critique are listed in `issues`.
    pub fn critique_requirement_set(
        &self,
        artifact_id: ArtifactId,
        filter_criteria: &str,
    ) -> Result<Option<SetCritiqueStats>, CritiqueError> {
        let artifact = self
            .store
            .get_artifact(artifact_id)?
            .ok_or_else(|| CritiqueError::artifact_not_found(artifact_id))?;

        let filter = FilterCriteria::parse(filter_criteria);
        let requirements = self.store.select_requirements(artifact_id, &filter)?;
        if requirements.is_empty() {
            info!(
                artifact_id,
                filter = filter_criteria,
                "no requirements match, nothing to evaluate"
            );
            return Ok(None);
        }

        info!(
            artifact_id,
            filter = filter_criteria,
            requirements = requirements.len(),
            "critiquing requirement set"
        );

        let evaluation_id = self.store.upsert_set_evaluation(artifact_id, filter_criteria)?;
        let listing = build_requirements_listing(&requirements);
        let total = requirements.len();
        let budget = self.options.budget();
        let provider = self.provider;
        let mut stats = SetCritiqueStats::default();

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();

            for quality in SetQuality::ALL {
                let tx = tx.clone();
                let listing = listing.as_str();
                let context = &artifact.context;
                let budget = &budget;

                scope.spawn(move || {
                    let result = run_isolated(|| {
                        evaluate_set_quality(
                            provider,
                            quality,
                            listing,
                            filter_criteria,
                            context,
                            total,
                            budget,
                        )
                    });
                    let _ = tx.send((quality, result));
                });
            }
            drop(tx);

            for (quality, result) in rx {
                self.record_set_outcome(evaluation_id, quality, result, &mut stats);
            }
        });

        info!(
            evaluation_id,
            issues = stats.issues.len(),
            failed = stats.failed.len(),
            "set critique finished"
        );
        Ok(Some(stats))
    }

    fn record_set_outcome(
        &self,
        evaluation_id: i64,
        quality: SetQuality,
        result: Result<SetQualityResult, AiError>,
        stats: &mut SetCritiqueStats,
    ) {
        let name = quality.name().to_string();

        let evaluation = match result {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(quality = %quality, error = %e, "set quality evaluation failed");
                stats.failed.push(name);
                return;
            }
        };

        let blobs: Result<Vec<String>, serde_json::Error> =
            evaluation.critiques.iter().map(serde_json::to_string).collect();
        let stored = blobs.map_err(anyhow::Error::from).and_then(|blobs| {
            self.store.add_evaluation_quality(
                evaluation_id,
                &name,
                &evaluation.summary,
                evaluation.percentage,
                &blobs,
            )
        });

        match stored {
            Ok(_) => {
                debug!(
                    quality = %quality,
                    critiques = evaluation.critiques.len(),
                    percentage = evaluation.percentage,
                    "stored set quality"
                );
                if !evaluation.critiques.is_empty() {
                    stats.issues.push(name);
                }
            }
            Err(e) => {
                warn!(quality = %quality, error = %e, "failed to store set quality");
                stats.failed.push(name);
            }
        }
    }
}

fn evaluate_set_quality(
    provider: &dyn CompletionProvider,
    quality: SetQuality,
    listing: &str,
    filter_label: &str,
    context: &ProjectContext,
    total: usize,
    budget: &QueryBudget,
) -> Result<SetQualityResult, AiError> {
    let prompt = build_set_prompt(quality, listing, filter_label, context);
    let (response, _): (SetEvaluationResponse, String) =
        query_json(provider, SET_SYSTEM_PROMPT, &prompt, budget)?;

    let critiques = merge_critiques(structure_critiques(&response.critiques, total));
    let flagged = flagged_requirements(&critiques);

    Ok(SetQualityResult {
        quality,
        summary: response.summary,
        percentage: health_percentage(flagged, total),
        critiques,
    })
}
