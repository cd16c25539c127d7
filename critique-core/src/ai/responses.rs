//! Response Parsing Module
//!
//! JSON shapes returned by the completion capability.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Reply to a per-requirement rating prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingResponse {
    pub eval_result: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Reply to a critique prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiquesResponse {
    pub critiques: Vec<String>,
}

/// Reply to a set-level prompt.
///
/// Critiques are kept as raw values; entries that are not objects are
/// skipped later instead of failing the whole reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetEvaluationResponse {
    pub summary: String,
    #[serde(default)]
    pub critiques: Vec<serde_json::Value>,
}

/// One grouped critique as produced by the completion capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSetCritique {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub requirement_ids: Vec<serde_json::Value>,
    #[serde(default)]
    pub explanation: String,
}

/// Parses a reply as strict JSON. Surrounding whitespace is the only
/// tolerated decoration; code fences or prose are a parse failure.
pub fn parse_strict<T: DeserializeOwned>(response: &str) -> Result<T, String> {
    let trimmed = response.trim();
    serde_json::from_str(trimmed).map_err(|e| {
        let preview: String = trimmed.chars().take(200).collect();
        format!("{}. JSON: {}", e, preview)
    })
}
