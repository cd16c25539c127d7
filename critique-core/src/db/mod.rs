//! Database layer for artifacts, requirements, feedback and cached set
//! evaluations.

mod sqlite_backend;
mod traits;

pub use sqlite_backend::SqliteBackend;
pub use traits::CritiqueStore;

use anyhow::Result;
use std::path::Path;

/// Opens the SQLite database at `path`, creating it and its schema if needed
pub fn open_database(path: &Path) -> Result<Box<dyn CritiqueStore>> {
    Ok(Box::new(SqliteBackend::new(path)?))
}
