//! Version digest for cached set evaluations
//!
//! The digest fingerprints the content timestamps of the requirements a
//! filter selects. Clients compare it for equality to tell whether a cached
//! evaluation is stale.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::db::CritiqueStore;
use crate::error::CritiqueError;
use crate::models::{ArtifactId, FilterCriteria};

/// Hex SHA-256 over the sorted, concatenated RFC 3339 timestamps.
///
/// Input order does not matter.
pub fn version_digest<'t>(timestamps: impl IntoIterator<Item = &'t DateTime<Utc>>) -> String {
    let mut stamps: Vec<String> = timestamps
        .into_iter()
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true))
        .collect();
    stamps.sort_unstable();

    let mut hasher = Sha256::new();
    for stamp in &stamps {
        hasher.update(stamp.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Digest of the requirements `filter_criteria` selects in an artifact
pub fn compute_version(
    store: &dyn CritiqueStore,
    artifact_id: ArtifactId,
    filter_criteria: &str,
) -> Result<String, CritiqueError> {
    if store.get_artifact(artifact_id)?.is_none() {
        return Err(CritiqueError::artifact_not_found(artifact_id));
    }

    let filter = FilterCriteria::parse(filter_criteria);
    let requirements = store.select_requirements(artifact_id, &filter)?;
    Ok(version_digest(
        requirements.iter().map(|req| &req.content_updated_at),
    ))
}
