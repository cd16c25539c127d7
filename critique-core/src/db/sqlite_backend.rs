//! SQLite database storage backend
//!
//! Stores artifacts, requirements, feedback and cached set evaluations in a
//! single SQLite file. Timestamps are stored as RFC 3339 text with fixed
//! microsecond precision so that lexical order matches time order.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::models::{
    Artifact, ArtifactId, Feedback, FeedbackLevel, ProjectContext, Requirement, RequirementId,
    StoredEvaluation, StoredEvaluationQuality,
};

use super::traits::CritiqueStore;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const ARTIFACT_COLUMNS: &str = "id, name, project_description, ml_task, usage_context, \
     target_audience, dataset_description, created_at";

const REQUIREMENT_COLUMNS: &str = "id, artifact_id, card_index, content, content_updated_at";

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens (or creates) a database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Creates a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        };
        backend.init_schema()?;
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))
                .context("Failed to create database schema")?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Database connection lock poisoned"))
    }

    fn now_timestamp() -> String {
        format_timestamp(&Utc::now())
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn artifact_from_row(row: &Row<'_>) -> rusqlite::Result<Artifact> {
    let created_at: String = row.get(7)?;
    Ok(Artifact {
        id: row.get(0)?,
        name: row.get(1)?,
        context: ProjectContext {
            project_description: row.get(2)?,
            ml_task: row.get(3)?,
            usage_context: row.get(4)?,
            target_audience: row.get(5)?,
            dataset_description: row.get(6)?,
        },
        created_at: parse_timestamp(7, &created_at)?,
    })
}

/// Categories are filled in separately by `load_categories`
fn requirement_from_row(row: &Row<'_>) -> rusqlite::Result<Requirement> {
    let updated_at: String = row.get(4)?;
    Ok(Requirement {
        id: row.get(0)?,
        artifact_id: row.get(1)?,
        card_index: row.get(2)?,
        content: row.get(3)?,
        categories: Vec::new(),
        content_updated_at: parse_timestamp(4, &updated_at)?,
    })
}

fn load_categories(conn: &Connection, requirement_id: RequirementId) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT c.name FROM categories c
         JOIN requirement_categories rc ON rc.category_id = c.id
         WHERE rc.requirement_id = ?1
         ORDER BY c.name",
    )?;
    let names = stmt
        .query_map([requirement_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn load_requirement(conn: &Connection, id: RequirementId) -> Result<Option<Requirement>> {
    let sql = format!("SELECT {} FROM requirements WHERE id = ?1", REQUIREMENT_COLUMNS);
    let req = conn
        .query_row(&sql, [id], requirement_from_row)
        .optional()?;

    match req {
        Some(mut req) => {
            req.categories = load_categories(conn, req.id)?;
            Ok(Some(req))
        }
        None => Ok(None),
    }
}

fn insert_critiques(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
    critiques: &[String],
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} ({}, position, content) VALUES (?1, ?2, ?3)",
        table, owner_column
    );
    let mut stmt = conn.prepare(&sql)?;
    for (position, critique) in critiques.iter().enumerate() {
        stmt.execute(params![owner_id, position as i64, critique])?;
    }
    Ok(())
}

fn load_critiques(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    owner_id: i64,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT content FROM {} WHERE {} = ?1 ORDER BY position, id",
        table, owner_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let critiques = stmt
        .query_map([owner_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(critiques)
}

fn load_evaluation_qualities(
    conn: &Connection,
    evaluation_id: i64,
) -> Result<Vec<StoredEvaluationQuality>> {
    let mut stmt = conn.prepare(
        "SELECT id, quality, summary, percentage FROM evaluation_qualities
         WHERE evaluation_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([evaluation_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut qualities = Vec::with_capacity(rows.len());
    for (id, quality, summary, percentage) in rows {
        qualities.push(StoredEvaluationQuality {
            id,
            quality,
            summary,
            percentage: percentage.clamp(0, 100) as u8,
            critiques: load_critiques(conn, "evaluation_critiques", "evaluation_quality_id", id)?,
        });
    }
    Ok(qualities)
}

fn evaluation_from_row(row: &Row<'_>) -> rusqlite::Result<StoredEvaluation> {
    let evaluated_at: String = row.get(3)?;
    Ok(StoredEvaluation {
        id: row.get(0)?,
        artifact_id: row.get(1)?,
        filter_criteria: row.get(2)?,
        evaluated_at: parse_timestamp(3, &evaluated_at)?,
        qualities: Vec::new(),
    })
}

impl CritiqueStore for SqliteBackend {
    fn create_artifact(&self, name: &str, context: &ProjectContext) -> Result<Artifact> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO artifacts (name, project_description, ml_task, usage_context,
                                    target_audience, dataset_description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                name,
                context.project_description,
                context.ml_task,
                context.usage_context,
                context.target_audience,
                context.dataset_description,
                Self::now_timestamp(),
            ],
        )
        .context("Failed to insert artifact")?;

        let id = conn.last_insert_rowid();
        let sql = format!("SELECT {} FROM artifacts WHERE id = ?1", ARTIFACT_COLUMNS);
        Ok(conn.query_row(&sql, [id], artifact_from_row)?)
    }

    fn get_artifact(&self, id: ArtifactId) -> Result<Option<Artifact>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM artifacts WHERE id = ?1", ARTIFACT_COLUMNS);
        conn.query_row(&sql, [id], artifact_from_row)
            .optional()
            .map_err(|e| e.into())
    }

    fn update_artifact(&self, id: ArtifactId, name: &str, context: &ProjectContext) -> Result<()> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE artifacts SET name = ?2, project_description = ?3, ml_task = ?4,
                    usage_context = ?5, target_audience = ?6, dataset_description = ?7
             WHERE id = ?1",
            params![
                id,
                name,
                context.project_description,
                context.ml_task,
                context.usage_context,
                context.target_audience,
                context.dataset_description,
            ],
        )?;
        if rows_affected == 0 {
            anyhow::bail!("Artifact not found: {}", id)
        }
        Ok(())
    }

    fn list_artifacts(&self) -> Result<Vec<Artifact>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM artifacts ORDER BY id", ARTIFACT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let artifacts = stmt
            .query_map([], artifact_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artifacts)
    }

    fn add_requirement(
        &self,
        artifact_id: ArtifactId,
        card_index: i64,
        content: &str,
    ) -> Result<Requirement> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO requirements (artifact_id, card_index, content, content_updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![artifact_id, card_index, content, Self::now_timestamp()],
        )
        .with_context(|| format!("Failed to add requirement to artifact {}", artifact_id))?;

        let id = conn.last_insert_rowid();
        load_requirement(&conn, id)?
            .with_context(|| format!("Requirement {} vanished after insert", id))
    }

    fn get_requirement(&self, id: RequirementId) -> Result<Option<Requirement>> {
        let conn = self.conn()?;
        load_requirement(&conn, id)
    }

    fn list_requirements(&self, artifact_id: ArtifactId) -> Result<Vec<Requirement>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM requirements WHERE artifact_id = ?1 ORDER BY card_index, id",
            REQUIREMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut requirements = stmt
            .query_map([artifact_id], requirement_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for req in &mut requirements {
            req.categories = load_categories(&conn, req.id)?;
        }
        Ok(requirements)
    }

    fn update_requirement_content(&self, id: RequirementId, content: &str) -> Result<Requirement> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE requirements SET content = ?2, content_updated_at = ?3 WHERE id = ?1",
            params![id, content, Self::now_timestamp()],
        )?;
        if rows_affected == 0 {
            anyhow::bail!("Requirement not found: {}", id)
        }
        load_requirement(&conn, id)?.with_context(|| format!("Requirement not found: {}", id))
    }

    fn set_requirement_categories(&self, id: RequirementId, categories: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists = tx
            .query_row("SELECT 1 FROM requirements WHERE id = ?1", [id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            anyhow::bail!("Requirement not found: {}", id)
        }

        tx.execute(
            "DELETE FROM requirement_categories WHERE requirement_id = ?1",
            [id],
        )?;

        for name in categories.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            tx.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [name])?;
            let category_id: i64 =
                tx.query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "INSERT OR IGNORE INTO requirement_categories (requirement_id, category_id)
                 VALUES (?1, ?2)",
                params![id, category_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_feedback_for_requirement(&self, requirement_id: RequirementId) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM feedback WHERE requirement_id = ?1",
            [requirement_id],
        )?;
        Ok(deleted)
    }

    fn replace_feedback(
        &self,
        requirement_id: RequirementId,
        quality: &str,
        level: FeedbackLevel,
        critiques: &[String],
    ) -> Result<Feedback> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM feedback WHERE requirement_id = ?1 AND quality = ?2",
            params![requirement_id, quality],
        )?;
        tx.execute(
            "INSERT INTO feedback (requirement_id, level, quality) VALUES (?1, ?2, ?3)",
            params![requirement_id, level.as_str(), quality],
        )
        .with_context(|| {
            format!(
                "Failed to store {} feedback for requirement {}",
                quality, requirement_id
            )
        })?;

        let id = tx.last_insert_rowid();
        insert_critiques(&tx, "feedback_critiques", "feedback_id", id, critiques)?;
        tx.commit()?;

        Ok(Feedback {
            id,
            requirement_id,
            level,
            quality: quality.to_string(),
            critiques: critiques.to_vec(),
        })
    }

    fn list_feedback(&self, requirement_id: RequirementId) -> Result<Vec<Feedback>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, level, quality FROM feedback WHERE requirement_id = ?1 ORDER BY quality",
        )?;
        let rows = stmt
            .query_map([requirement_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut feedback = Vec::with_capacity(rows.len());
        for (id, level, quality) in rows {
            feedback.push(Feedback {
                id,
                requirement_id,
                level: level.parse()?,
                quality,
                critiques: load_critiques(&conn, "feedback_critiques", "feedback_id", id)?,
            });
        }
        Ok(feedback)
    }

    fn upsert_set_evaluation(&self, artifact_id: ArtifactId, filter_criteria: &str) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Self::now_timestamp();

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM set_evaluations WHERE artifact_id = ?1 AND filter_criteria = ?2",
                params![artifact_id, filter_criteria],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute("DELETE FROM evaluation_qualities WHERE evaluation_id = ?1", [id])?;
                tx.execute(
                    "UPDATE set_evaluations SET evaluated_at = ?2 WHERE id = ?1",
                    params![id, now],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO set_evaluations (artifact_id, filter_criteria, evaluated_at)
                     VALUES (?1, ?2, ?3)",
                    params![artifact_id, filter_criteria, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        Ok(id)
    }

    fn add_evaluation_quality(
        &self,
        evaluation_id: i64,
        quality: &str,
        summary: &str,
        percentage: u8,
        critiques: &[String],
    ) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO evaluation_qualities (evaluation_id, quality, summary, percentage)
             VALUES (?1, ?2, ?3, ?4)",
            params![evaluation_id, quality, summary, i64::from(percentage)],
        )
        .with_context(|| format!("Failed to store {} for evaluation {}", quality, evaluation_id))?;

        let id = tx.last_insert_rowid();
        insert_critiques(&tx, "evaluation_critiques", "evaluation_quality_id", id, critiques)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_set_evaluation(
        &self,
        artifact_id: ArtifactId,
        filter_criteria: &str,
    ) -> Result<Option<StoredEvaluation>> {
        let conn = self.conn()?;
        let evaluation = conn
            .query_row(
                "SELECT id, artifact_id, filter_criteria, evaluated_at FROM set_evaluations
                 WHERE artifact_id = ?1 AND filter_criteria = ?2",
                params![artifact_id, filter_criteria],
                evaluation_from_row,
            )
            .optional()?;

        match evaluation {
            Some(mut evaluation) => {
                evaluation.qualities = load_evaluation_qualities(&conn, evaluation.id)?;
                Ok(Some(evaluation))
            }
            None => Ok(None),
        }
    }

    fn list_set_evaluations(&self, artifact_id: ArtifactId) -> Result<Vec<StoredEvaluation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, artifact_id, filter_criteria, evaluated_at FROM set_evaluations
             WHERE artifact_id = ?1 ORDER BY filter_criteria",
        )?;
        let mut evaluations = stmt
            .query_map([artifact_id], evaluation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for evaluation in &mut evaluations {
            evaluation.qualities = load_evaluation_qualities(&conn, evaluation.id)?;
        }
        Ok(evaluations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilterCriteria;
    use tempfile::NamedTempFile;

    fn test_context() -> ProjectContext {
        ProjectContext {
            project_description: "Loan approval model".to_string(),
            ml_task: Some("Binary classification".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_sqlite_backend_create_and_reopen() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let artifact_id = {
            let backend = SqliteBackend::new(temp_file.path()).unwrap();
            backend.create_artifact("Loans", &test_context()).unwrap().id
        };

        let backend = SqliteBackend::new(temp_file.path()).unwrap();
        let artifact = backend.get_artifact(artifact_id).unwrap().unwrap();
        assert_eq!(artifact.name, "Loans");
        assert_eq!(artifact.context, test_context());
        assert_eq!(backend.list_artifacts().unwrap().len(), 1);
    }

    #[test]
    fn test_update_artifact() {
        let backend = SqliteBackend::in_memory().unwrap();
        let artifact = backend.create_artifact("Loans", &test_context()).unwrap();

        let mut context = test_context();
        context.target_audience = Some("Loan officers".to_string());
        backend.update_artifact(artifact.id, "Loans v2", &context).unwrap();

        let loaded = backend.get_artifact(artifact.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Loans v2");
        assert_eq!(loaded.context.target_audience.as_deref(), Some("Loan officers"));
        assert!(backend.update_artifact(999, "x", &context).is_err());
    }

    #[test]
    fn test_requirements_in_card_order_with_categories() {
        let backend = SqliteBackend::in_memory().unwrap();
        let artifact = backend.create_artifact("Loans", &test_context()).unwrap();
        let second = backend.add_requirement(artifact.id, 1, "Second").unwrap();
        let first = backend.add_requirement(artifact.id, 0, "First").unwrap();

        backend
            .set_requirement_categories(
                first.id,
                &["Performance".to_string(), "Fairness".to_string(), " ".to_string()],
            )
            .unwrap();

        let reqs = backend.list_requirements(artifact.id).unwrap();
        assert_eq!(reqs[0].id, first.id);
        assert_eq!(reqs[1].id, second.id);
        assert_eq!(reqs[0].categories, vec!["Fairness", "Performance"]);
        assert!(reqs[1].categories.is_empty());

        backend
            .set_requirement_categories(first.id, &["Privacy".to_string()])
            .unwrap();
        let reloaded = backend.get_requirement(first.id).unwrap().unwrap();
        assert_eq!(reloaded.categories, vec!["Privacy"]);
    }

    #[test]
    fn test_select_requirements_by_filter() {
        let backend = SqliteBackend::in_memory().unwrap();
        let artifact = backend.create_artifact("Loans", &test_context()).unwrap();
        let a = backend.add_requirement(artifact.id, 0, "A").unwrap();
        let b = backend.add_requirement(artifact.id, 1, "B").unwrap();
        backend.add_requirement(artifact.id, 2, "C").unwrap();
        backend.set_requirement_categories(a.id, &["Fairness".to_string()]).unwrap();
        backend.set_requirement_categories(b.id, &["Security".to_string()]).unwrap();

        let all = backend.select_requirements(artifact.id, &FilterCriteria::All).unwrap();
        assert_eq!(all.len(), 3);

        let union = backend
            .select_requirements(artifact.id, &FilterCriteria::parse("Fairness,Security"))
            .unwrap();
        let ids: Vec<i64> = union.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);

        let none = backend
            .select_requirements(artifact.id, &FilterCriteria::parse("Privacy"))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_update_content_bumps_timestamp() {
        let backend = SqliteBackend::in_memory().unwrap();
        let artifact = backend.create_artifact("Loans", &test_context()).unwrap();
        let req = backend.add_requirement(artifact.id, 0, "Old").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let updated = backend.update_requirement_content(req.id, "New").unwrap();
        assert_eq!(updated.content, "New");
        assert!(updated.content_updated_at > req.content_updated_at);
        assert!(backend.update_requirement_content(999, "x").is_err());
    }

    #[test]
    fn test_replace_feedback_keeps_one_row_per_quality() {
        let backend = SqliteBackend::in_memory().unwrap();
        let artifact = backend.create_artifact("Loans", &test_context()).unwrap();
        let req = backend.add_requirement(artifact.id, 0, "The model shall be fast").unwrap();

        backend
            .replace_feedback(
                req.id,
                "Unambiguous",
                FeedbackLevel::Warning,
                &["'fast' is vague".to_string()],
            )
            .unwrap();
        backend
            .replace_feedback(
                req.id,
                "Unambiguous",
                FeedbackLevel::Error,
                &["a".to_string(), "b".to_string()],
            )
            .unwrap();
        backend
            .replace_feedback(req.id, "Verifiable", FeedbackLevel::Warning, &[])
            .unwrap();

        let feedback = backend.list_feedback(req.id).unwrap();
        assert_eq!(feedback.len(), 2);
        assert_eq!(feedback[0].quality, "Unambiguous");
        assert_eq!(feedback[0].level, FeedbackLevel::Error);
        assert_eq!(feedback[0].critiques, vec!["a", "b"]);
        assert!(feedback[1].critiques.is_empty());

        assert_eq!(backend.delete_feedback_for_requirement(req.id).unwrap(), 2);
        assert!(backend.list_feedback(req.id).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_set_evaluation_clears_qualities() {
        let backend = SqliteBackend::in_memory().unwrap();
        let artifact = backend.create_artifact("Loans", &test_context()).unwrap();

        let first = backend.upsert_set_evaluation(artifact.id, "All").unwrap();
        backend
            .add_evaluation_quality(first, "Complete", "Mostly", 50, &["x".to_string()])
            .unwrap();

        let second = backend.upsert_set_evaluation(artifact.id, "All").unwrap();
        assert_eq!(first, second);
        let evaluation = backend.get_set_evaluation(artifact.id, "All").unwrap().unwrap();
        assert!(evaluation.qualities.is_empty());

        backend
            .add_evaluation_quality(second, "Consistent", "Fine", 100, &[])
            .unwrap();
        let other = backend.upsert_set_evaluation(artifact.id, "Fairness").unwrap();
        assert_ne!(other, second);

        let evaluations = backend.list_set_evaluations(artifact.id).unwrap();
        assert_eq!(evaluations.len(), 2);
        assert_eq!(evaluations[0].filter_criteria, "All");
        assert_eq!(evaluations[0].qualities.len(), 1);
        assert_eq!(evaluations[0].qualities[0].percentage, 100);
    }

    #[test]
    fn test_missing_rows_are_none() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert!(backend.get_artifact(1).unwrap().is_none());
        assert!(backend.get_requirement(1).unwrap().is_none());
        assert!(backend.get_set_evaluation(1, "All").unwrap().is_none());
        assert!(backend.set_requirement_categories(1, &[]).is_err());
    }
}
