//! Read-side views over stored critiques.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::critique::{merge_critiques, normalize_critique, SetCritique};
use crate::db::CritiqueStore;
use crate::error::CritiqueError;
use crate::models::{
    ArtifactId, CritiqueStats, FeedbackLevel, RequirementDetail, RequirementId, StoredEvaluation,
};

/// One set quality as presented to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationQualityView {
    pub name: String,
    pub summary: String,
    pub critique: Vec<SetCritique>,
    pub percentage: u8,
}

/// A cached set evaluation as presented to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEvaluationView {
    pub evaluation_id: i64,
    pub filter_criteria: String,
    pub qualities: Vec<EvaluationQualityView>,
}

impl From<StoredEvaluation> for SetEvaluationView {
    fn from(stored: StoredEvaluation) -> Self {
        let qualities = stored
            .qualities
            .into_iter()
            .map(|quality| {
                let parsed: Vec<SetCritique> = quality
                    .critiques
                    .iter()
                    .filter_map(|blob| {
                        let critique = normalize_critique(blob);
                        if critique.is_none() {
                            warn!(
                                quality = %quality.quality,
                                "skipping unreadable stored critique"
                            );
                        }
                        critique
                    })
                    .collect();

                EvaluationQualityView {
                    critique: merge_critiques(parsed),
                    name: quality.quality,
                    summary: quality.summary,
                    percentage: quality.percentage,
                }
            })
            .collect();

        Self {
            evaluation_id: stored.id,
            filter_criteria: stored.filter_criteria,
            qualities,
        }
    }
}

/// Cached evaluation for (artifact, filter criteria), if one exists
pub fn load_set_evaluation(
    store: &dyn CritiqueStore,
    artifact_id: ArtifactId,
    filter_criteria: &str,
) -> Result<Option<SetEvaluationView>, CritiqueError> {
    if store.get_artifact(artifact_id)?.is_none() {
        return Err(CritiqueError::artifact_not_found(artifact_id));
    }
    Ok(store
        .get_set_evaluation(artifact_id, filter_criteria)?
        .map(SetEvaluationView::from))
}

/// Rebuilds `{warnings, errors}` from a requirement's stored feedback
pub fn critique_stats(
    store: &dyn CritiqueStore,
    requirement_id: RequirementId,
) -> Result<CritiqueStats, CritiqueError> {
    if store.get_requirement(requirement_id)?.is_none() {
        return Err(CritiqueError::requirement_not_found(requirement_id));
    }

    let mut stats = CritiqueStats::default();
    for feedback in store.list_feedback(requirement_id)? {
        match feedback.level {
            FeedbackLevel::Warning => stats.warnings.push(feedback.quality),
            FeedbackLevel::Error => stats.errors.push(feedback.quality),
        }
    }
    Ok(stats)
}

pub fn requirement_detail(
    store: &dyn CritiqueStore,
    requirement_id: RequirementId,
) -> Result<RequirementDetail, CritiqueError> {
    let requirement = store
        .get_requirement(requirement_id)?
        .ok_or_else(|| CritiqueError::requirement_not_found(requirement_id))?;
    let feedback = store.list_feedback(requirement_id)?;
    Ok(RequirementDetail {
        requirement,
        feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_requirements, seed_store};
    use serde_json::json;

    #[test]
    fn test_view_normalizes_and_merges_both_forms() {
        let (store, artifact) = seed_store();
        let evaluation_id = store.upsert_set_evaluation(artifact.id, "All").unwrap();
        let structured = serde_json::to_string(&SetCritique {
            set: vec!["R2".to_string(), "R1".to_string()],
            critics: vec!["Overlap. Both define latency".to_string()],
        })
        .unwrap();
        store
            .add_evaluation_quality(
                evaluation_id,
                "Consistent",
                "Some overlap",
                33,
                &[
                    structured,
                    "Unit mismatch (Requirements: 1, 2). ms vs s".to_string(),
                    "Gap (Requirements: 3). Singleton".to_string(),
                    "garbage".to_string(),
                ],
            )
            .unwrap();

        let view = load_set_evaluation(&store, artifact.id, "All").unwrap().unwrap();
        assert_eq!(view.evaluation_id, evaluation_id);
        assert_eq!(view.filter_criteria, "All");
        assert_eq!(view.qualities.len(), 1);

        let quality = &view.qualities[0];
        assert_eq!(quality.name, "Consistent");
        assert_eq!(quality.percentage, 33);
        assert_eq!(quality.critique.len(), 1);
        assert_eq!(quality.critique[0].set, vec!["R1", "R2"]);
        assert_eq!(
            quality.critique[0].critics,
            vec!["Overlap. Both define latency", "Unit mismatch. ms vs s"]
        );
    }

    #[test]
    fn test_view_json_shape() {
        let (store, artifact) = seed_store();
        let evaluation_id = store.upsert_set_evaluation(artifact.id, "Fairness").unwrap();
        store
            .add_evaluation_quality(evaluation_id, "Complete", "Fine", 100, &[])
            .unwrap();

        let view = load_set_evaluation(&store, artifact.id, "Fairness").unwrap().unwrap();
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(
            value,
            json!({
                "evaluation_id": evaluation_id,
                "filter_criteria": "Fairness",
                "qualities": [
                    {"name": "Complete", "summary": "Fine", "critique": [], "percentage": 100}
                ]
            })
        );
        assert!(load_set_evaluation(&store, artifact.id, "All").unwrap().is_none());
    }

    #[test]
    fn test_critique_stats_from_feedback() {
        let (store, artifact) = seed_store();
        let reqs = seed_requirements(&store, &artifact, &[("The model shall be fast", &[])]);
        store
            .replace_feedback(reqs[0].id, "Unambiguous", FeedbackLevel::Warning, &[])
            .unwrap();
        store
            .replace_feedback(reqs[0].id, "Verifiable", FeedbackLevel::Error, &[])
            .unwrap();

        let stats = critique_stats(&store, reqs[0].id).unwrap();
        assert_eq!(stats.warnings, vec!["Unambiguous"]);
        assert_eq!(stats.errors, vec!["Verifiable"]);

        let detail = requirement_detail(&store, reqs[0].id).unwrap();
        assert_eq!(detail.requirement.content, "The model shall be fast");
        assert_eq!(detail.feedback.len(), 2);

        assert!(critique_stats(&store, 999).is_err());
        assert!(requirement_detail(&store, 999).is_err());
    }
}
