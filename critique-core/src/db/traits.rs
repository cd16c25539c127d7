//! Repository abstraction
//!
//! The orchestrators only talk to storage through this trait, so any backend
//! (or an in-memory one in tests) can stand behind them.

use anyhow::Result;

use crate::models::{
    Artifact, ArtifactId, Feedback, FeedbackLevel, FilterCriteria, ProjectContext, Requirement,
    RequirementId, StoredEvaluation,
};

/// Storage operations used by the critique engine and the CLI
pub trait CritiqueStore: Send + Sync {
    // =========================================================================
    // Artifacts
    // =========================================================================

    fn create_artifact(&self, name: &str, context: &ProjectContext) -> Result<Artifact>;

    fn get_artifact(&self, id: ArtifactId) -> Result<Option<Artifact>>;

    /// Replaces the name and project context of an artifact
    fn update_artifact(&self, id: ArtifactId, name: &str, context: &ProjectContext) -> Result<()>;

    fn list_artifacts(&self) -> Result<Vec<Artifact>>;

    // =========================================================================
    // Requirements
    // =========================================================================

    fn add_requirement(
        &self,
        artifact_id: ArtifactId,
        card_index: i64,
        content: &str,
    ) -> Result<Requirement>;

    fn get_requirement(&self, id: RequirementId) -> Result<Option<Requirement>>;

    /// All requirements of an artifact in card order
    fn list_requirements(&self, artifact_id: ArtifactId) -> Result<Vec<Requirement>>;

    /// Changes the text of a requirement and bumps `content_updated_at`
    fn update_requirement_content(&self, id: RequirementId, content: &str) -> Result<Requirement>;

    /// Replaces the category tags of a requirement
    fn set_requirement_categories(&self, id: RequirementId, categories: &[String]) -> Result<()>;

    /// Requirements of an artifact selected by a filter, in card order
    fn select_requirements(
        &self,
        artifact_id: ArtifactId,
        filter: &FilterCriteria,
    ) -> Result<Vec<Requirement>> {
        Ok(self
            .list_requirements(artifact_id)?
            .into_iter()
            .filter(|req| filter.matches(req))
            .collect())
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    /// Removes every feedback row (and its critiques) of a requirement
    fn delete_feedback_for_requirement(&self, requirement_id: RequirementId) -> Result<usize>;

    /// Atomically replaces the feedback for one (requirement, quality) pair
    fn replace_feedback(
        &self,
        requirement_id: RequirementId,
        quality: &str,
        level: FeedbackLevel,
        critiques: &[String],
    ) -> Result<Feedback>;

    fn list_feedback(&self, requirement_id: RequirementId) -> Result<Vec<Feedback>>;

    // =========================================================================
    // Set evaluations
    // =========================================================================

    /// Returns the evaluation id for the cache key, clearing the qualities of
    /// an existing row or inserting a new one
    fn upsert_set_evaluation(&self, artifact_id: ArtifactId, filter_criteria: &str) -> Result<i64>;

    fn add_evaluation_quality(
        &self,
        evaluation_id: i64,
        quality: &str,
        summary: &str,
        percentage: u8,
        critiques: &[String],
    ) -> Result<i64>;

    fn get_set_evaluation(
        &self,
        artifact_id: ArtifactId,
        filter_criteria: &str,
    ) -> Result<Option<StoredEvaluation>>;

    fn list_set_evaluations(&self, artifact_id: ArtifactId) -> Result<Vec<StoredEvaluation>>;
}
