//! AI Integration Module
//!
//! Quality critique of requirements through a text-completion capability:
//! prompt building, JSON extraction with retries, and the per-requirement
//! and per-set orchestrators.

pub mod client;
pub mod evaluator;
pub mod prompts;
pub mod query;
pub mod responses;
pub mod set_evaluator;

pub use client::{AiClient, AiError, AiMode, CompletionProvider};
pub use evaluator::{CritiqueEngine, QualityOutcome};
pub use query::{query_json, CancelFlag, CritiqueOptions, QueryBudget, DEFAULT_MAX_RETRIES};
pub use responses::{CritiquesResponse, RatingResponse, SetEvaluationResponse};
