//! Test helpers: a scripted completion provider and store seeding.

use std::sync::Mutex;

use crate::ai::client::{AiError, CompletionProvider};
use crate::db::{CritiqueStore, SqliteBackend};
use crate::models::{Artifact, ItemQuality, ProjectContext, Requirement, SetQuality};

type Responder = dyn Fn(&str, &str) -> Result<String, AiError> + Send + Sync;

/// Completion provider answering with a closure of (system prompt, user prompt)
pub(crate) struct ScriptedProvider {
    responder: Box<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String, AiError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// User prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionProvider for ScriptedProvider {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        (self.responder)(system_prompt, user_prompt)
    }
}

/// Per-item quality a rating or critique prompt is about
pub(crate) fn item_quality_in(prompt: &str) -> Option<ItemQuality> {
    ItemQuality::ALL
        .into_iter()
        .find(|q| prompt.contains(&format!("{} means:", q.name())))
}

/// Set quality a set prompt is about
pub(crate) fn set_quality_in(prompt: &str) -> Option<SetQuality> {
    SetQuality::ALL
        .into_iter()
        .find(|q| prompt.contains(&format!("{} as a set means:", q.name())))
}

/// True for the follow-up prompt that asks for critiques of a rating
pub(crate) fn is_critique_request(prompt: &str) -> bool {
    prompt.contains("## Previous Step")
}

pub(crate) fn rating_json(rating: &str) -> String {
    serde_json::json!({"eval_result": rating, "explanation": format!("Rated {}", rating)})
        .to_string()
}

pub(crate) fn critiques_json(critiques: &[&str]) -> String {
    serde_json::json!({ "critiques": critiques }).to_string()
}

pub(crate) fn test_context() -> ProjectContext {
    ProjectContext {
        project_description: "Credit scoring for small business loans".to_string(),
        ml_task: Some("Binary classification".to_string()),
        usage_context: Some("Loan officers review model output".to_string()),
        target_audience: None,
        dataset_description: None,
    }
}

/// In-memory store with one artifact
pub(crate) fn seed_store() -> (SqliteBackend, Artifact) {
    let store = SqliteBackend::in_memory().unwrap();
    let artifact = store.create_artifact("Loans", &test_context()).unwrap();
    (store, artifact)
}

/// Adds requirements in card order, each with its categories
pub(crate) fn seed_requirements(
    store: &SqliteBackend,
    artifact: &Artifact,
    requirements: &[(&str, &[&str])],
) -> Vec<Requirement> {
    requirements
        .iter()
        .enumerate()
        .map(|(i, (content, categories))| {
            let req = store.add_requirement(artifact.id, i as i64, content).unwrap();
            let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
            store.set_requirement_categories(req.id, &categories).unwrap();
            store.get_requirement(req.id).unwrap().unwrap()
        })
        .collect()
}
