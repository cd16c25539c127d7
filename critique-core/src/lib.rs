pub mod ai;
pub mod config;
pub mod critique;
pub mod db;
pub mod error;
pub mod models;
pub mod version;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use ai::{
    AiClient, AiError, AiMode, CancelFlag, CompletionProvider, CritiqueEngine, CritiqueOptions,
    QualityOutcome,
};
pub use config::{get_config_path, Settings};
pub use critique::{merge_critiques, normalize_critique, SetCritique};
pub use db::{open_database, CritiqueStore, SqliteBackend};
pub use error::{CritiqueError, SubjectKind};
pub use models::{
    Artifact, ArtifactId, CritiqueStats, Feedback, FeedbackLevel, FilterCriteria, ItemQuality,
    ProjectContext, RatingLevel, Requirement, RequirementDetail, RequirementId, SetCritiqueStats,
    SetQuality, StoredEvaluation, StoredEvaluationQuality,
};
pub use version::{compute_version, version_digest};
pub use views::{
    critique_stats, load_set_evaluation, requirement_detail, EvaluationQualityView,
    SetEvaluationView,
};
