//! Per-Requirement Critique Engine
//!
//! Rates one requirement against every item quality in parallel. Each quality
//! runs in its own scoped thread; results are consumed in arrival order and
//! persisted on the calling thread, so storage is never touched concurrently.

use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

use crate::ai::client::{AiError, CompletionProvider};
use crate::ai::prompts::{
    build_critique_prompt, build_rating_prompt, CRITIQUE_SYSTEM_PROMPT, RATING_SYSTEM_PROMPT,
};
use crate::ai::query::{query_json, CritiqueOptions, QueryBudget};
use crate::ai::responses::{CritiquesResponse, RatingResponse};
use crate::db::CritiqueStore;
use crate::error::CritiqueError;
use crate::models::{
    ArtifactId, CritiqueStats, FeedbackLevel, ItemQuality, ProjectContext, RatingLevel,
    Requirement, RequirementId,
};

/// What one quality evaluation produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum QualityOutcome {
    /// A valid rating, with critiques for medium and low
    Rated {
        rating: RatingLevel,
        explanation: Option<String>,
        critiques: Vec<String>,
    },
    /// The rating was not one of high/medium/low
    Anomalous { raw: String },
}

/// Runs critiques against a store with an explicitly supplied provider
pub struct CritiqueEngine<'a> {
    pub(crate) store: &'a dyn CritiqueStore,
    pub(crate) provider: &'a dyn CompletionProvider,
    pub(crate) options: CritiqueOptions,
}

impl<'a> CritiqueEngine<'a> {
    pub fn new(store: &'a dyn CritiqueStore, provider: &'a dyn CompletionProvider) -> Self {
        Self::with_options(store, provider, CritiqueOptions::default())
    }

    pub fn with_options(
        store: &'a dyn CritiqueStore,
        provider: &'a dyn CompletionProvider,
        options: CritiqueOptions,
    ) -> Self {
        Self {
            store,
            provider,
            options,
        }
    }

    pub fn options(&self) -> &CritiqueOptions {
        &self.options
    }

    /// Rates a single quality without touching the store
    pub fn rate_quality(
        &self,
        quality: ItemQuality,
        requirement: &Requirement,
        context: &ProjectContext,
    ) -> Result<QualityOutcome, AiError> {
        let budget = self.options.budget();
        evaluate_quality(
            self.provider,
            quality,
            &requirement.content,
            &requirement.category_label(),
            context,
            &budget,
        )
    }

    /// Re-evaluates a requirement against all item qualities.
    ///
    /// Existing feedback is removed first. Qualities rated medium or low get
    /// a fresh feedback row; failures of individual qualities are logged and
    /// listed in `failed` without affecting the others.
    pub fn critique_requirement(
        &self,
        artifact_id: ArtifactId,
        requirement_id: RequirementId,
    ) -> Result<CritiqueStats, CritiqueError> {
        let artifact = self
            .store
            .get_artifact(artifact_id)?
            .ok_or_else(|| CritiqueError::artifact_not_found(artifact_id))?;
        let requirement = self
            .store
            .get_requirement(requirement_id)?
            .filter(|req| req.artifact_id == artifact_id)
            .ok_or_else(|| CritiqueError::requirement_not_found(requirement_id))?;

        info!(artifact_id, requirement_id, "critiquing requirement");

        let removed = self.store.delete_feedback_for_requirement(requirement_id)?;
        debug!(requirement_id, removed, "cleared previous feedback");

        let budget = self.options.budget();
        let label = requirement.category_label();
        let provider = self.provider;
        let mut stats = CritiqueStats::default();

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();

            for quality in ItemQuality::ALL {
                let tx = tx.clone();
                let content = requirement.content.as_str();
                let label = label.as_str();
                let context = &artifact.context;
                let budget = &budget;

                scope.spawn(move || {
                    let result = run_isolated(|| {
                        evaluate_quality(provider, quality, content, label, context, budget)
                    });
                    // Receiver outlives every sender inside the scope
                    let _ = tx.send((quality, result));
                });
            }
            drop(tx);

            for (quality, result) in rx {
                self.record_outcome(requirement_id, quality, result, &mut stats);
            }
        });

        info!(
            requirement_id,
            warnings = stats.warnings.len(),
            errors = stats.errors.len(),
            anomalies = stats.anomalies.len(),
            failed = stats.failed.len(),
            "requirement critique finished"
        );
        Ok(stats)
    }

    fn record_outcome(
        &self,
        requirement_id: RequirementId,
        quality: ItemQuality,
        result: Result<QualityOutcome, AiError>,
        stats: &mut CritiqueStats,
    ) {
        let name = quality.name().to_string();

        match result {
            Ok(QualityOutcome::Rated {
                rating, critiques, ..
            }) => {
                let Some(level) = rating.feedback_level() else {
                    debug!(quality = %quality, "rated high");
                    return;
                };

                match self
                    .store
                    .replace_feedback(requirement_id, &name, level, &critiques)
                {
                    Ok(_) => {
                        debug!(
                            quality = %quality,
                            %rating,
                            critiques = critiques.len(),
                            "stored feedback"
                        );
                        match level {
                            FeedbackLevel::Warning => stats.warnings.push(name),
                            FeedbackLevel::Error => stats.errors.push(name),
                        }
                    }
                    Err(e) => {
                        warn!(quality = %quality, error = %e, "failed to store feedback");
                        stats.failed.push(name);
                    }
                }
            }
            Ok(QualityOutcome::Anomalous { raw }) => {
                warn!(quality = %quality, rating = %raw, "unrecognized rating, no feedback stored");
                stats.anomalies.push(name);
            }
            Err(e) => {
                warn!(quality = %quality, error = %e, "quality evaluation failed");
                stats.failed.push(name);
            }
        }
    }
}

/// Rating query, followed by a critique query for medium and low ratings
fn evaluate_quality(
    provider: &dyn CompletionProvider,
    quality: ItemQuality,
    content: &str,
    category_label: &str,
    context: &ProjectContext,
    budget: &QueryBudget,
) -> Result<QualityOutcome, AiError> {
    let prompt = build_rating_prompt(quality, content, category_label, context);
    let (response, raw): (RatingResponse, String) =
        query_json(provider, RATING_SYSTEM_PROMPT, &prompt, budget)?;

    let Some(rating) = RatingLevel::parse(&response.eval_result) else {
        return Ok(QualityOutcome::Anomalous {
            raw: response.eval_result,
        });
    };

    let critiques = match (build_critique_prompt(rating, &prompt, &raw), rating.feedback_level()) {
        (Some(critique_prompt), Some(level)) => {
            let (reply, _): (CritiquesResponse, String) =
                query_json(provider, CRITIQUE_SYSTEM_PROMPT, &critique_prompt, budget)?;
            reply
                .critiques
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .take(level.critique_cap())
                .collect()
        }
        _ => Vec::new(),
    };

    Ok(QualityOutcome::Rated {
        rating,
        explanation: response.explanation,
        critiques,
    })
}

/// Runs one evaluation task, turning a panic into a task failure
pub(crate) fn run_isolated<T>(task: impl FnOnce() -> Result<T, AiError>) -> Result<T, AiError> {
    panic::catch_unwind(AssertUnwindSafe(task))
        .unwrap_or_else(|payload| Err(AiError::TaskPanicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
