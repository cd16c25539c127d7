//! Set-level critique model, merge and normalization
//!
//! A set critique names the requirements it concerns as `R<n>` labels, where
//! `n` is the requirement's position in the evaluated listing. Critiques that
//! name the exact same group of requirements are merged into one entry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::ai::responses::RawSetCritique;

/// A critique shared by a group of at least two requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCritique {
    /// Requirement labels ("R1", "R3")
    pub set: Vec<String>,
    /// One entry per issue raised against this group
    pub critics: Vec<String>,
}

/// Label used for the requirement at 1-based listing position `n`
pub fn requirement_label(n: usize) -> String {
    format!("R{}", n)
}

fn label_number(label: &str) -> Option<u64> {
    let trimmed = label.trim();
    let digits = trimmed
        .strip_prefix('R')
        .or_else(|| trimmed.strip_prefix('r'))
        .unwrap_or(trimmed);
    digits.parse().ok()
}

/// Sorts labels numerically ("R2" before "R10") and drops duplicates
fn sorted_labels(labels: &[String]) -> Vec<String> {
    let mut sorted = labels.to_vec();
    sorted.sort_by_key(|l| (label_number(l).is_none(), label_number(l).unwrap_or(0), l.clone()));
    sorted.dedup();
    sorted
}

fn requirement_number(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
        serde_json::Value::String(s) => label_number(s).map(|n| n as usize),
        _ => None,
    }
}

fn join_critic(issue: &str, explanation: &str) -> String {
    let issue = issue.trim();
    let explanation = explanation.trim();
    if explanation.is_empty() {
        issue.to_string()
    } else {
        format!("{}. {}", issue.trim_end_matches('.'), explanation)
    }
}

/// Converts raw completion critiques into `SetCritique`s.
///
/// Requirement ids outside `1..=total` are ignored and duplicates collapse;
/// a critique left with fewer than two requirements is dropped.
pub fn structure_critiques(raw: &[serde_json::Value], total: usize) -> Vec<SetCritique> {
    let mut structured = Vec::new();

    for value in raw {
        let critique: RawSetCritique = match serde_json::from_value(value.clone()) {
            Ok(critique) => critique,
            Err(e) => {
                warn!(error = %e, "skipping set critique that is not an object");
                continue;
            }
        };

        let mut ids: Vec<usize> = critique
            .requirement_ids
            .iter()
            .filter_map(requirement_number)
            .filter(|n| (1..=total).contains(n))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        if ids.len() < 2 {
            debug!(
                issue = %critique.issue,
                "dropping set critique with fewer than two requirements"
            );
            continue;
        }

        structured.push(SetCritique {
            set: ids.into_iter().map(requirement_label).collect(),
            critics: vec![join_critic(&critique.issue, &critique.explanation)],
        });
    }

    structured
}

/// Groups critiques by their sorted requirement set, concatenating critics.
///
/// Output keeps the order in which each group first appears.
pub fn merge_critiques(critiques: impl IntoIterator<Item = SetCritique>) -> Vec<SetCritique> {
    let mut merged: Vec<SetCritique> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();

    for critique in critiques {
        let key = sorted_labels(&critique.set);
        match index.get(&key) {
            Some(&i) => merged[i].critics.extend(critique.critics),
            None => {
                index.insert(key.clone(), merged.len());
                merged.push(SetCritique {
                    set: key,
                    critics: critique.critics,
                });
            }
        }
    }

    merged
}

/// Number of distinct requirements named by any critique
pub fn flagged_requirements(critiques: &[SetCritique]) -> usize {
    critiques
        .iter()
        .flat_map(|c| c.set.iter())
        .collect::<HashSet<_>>()
        .len()
}

/// Share of requirements not flagged by any critique, as a percentage.
///
/// Exact halves round to the nearest even integer.
pub fn health_percentage(flagged: usize, total: usize) -> u8 {
    if total == 0 || flagged == 0 {
        return 100;
    }
    let scaled = 100 * (total - flagged.min(total));
    let quotient = scaled / total;
    let twice_remainder = 2 * (scaled % total);

    let rounded = match twice_remainder.cmp(&total) {
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    };
    rounded as u8
}

/// Parses a stored blob in the structured `{set, critics}` form
pub fn parse_structured(blob: &str) -> Option<SetCritique> {
    let critique: SetCritique = serde_json::from_str(blob).ok()?;
    let set = sorted_labels(&critique.set);
    if set.len() < 2 {
        return None;
    }
    Some(SetCritique {
        set,
        critics: critique.critics,
    })
}

fn legacy_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^(.*?)\(Requirements:\s*([^)]*)\)\.(.*)$")
            .expect("legacy critique pattern is valid")
    })
}

/// Parses the older plain-text form "Issue (Requirements: 1, 2). Explanation".
///
/// Only purely numeric ids are kept. Remove once stored evaluations have all
/// been re-run in the structured form.
pub fn parse_legacy(blob: &str) -> Option<SetCritique> {
    let captures = legacy_pattern().captures(blob)?;
    let issue = captures.get(1).map_or("", |m| m.as_str()).trim();
    let ids = captures.get(2).map_or("", |m| m.as_str());
    let explanation = captures.get(3).map_or("", |m| m.as_str()).trim();

    let set: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(|id| format!("R{}", id))
        .collect();

    if set.len() < 2 {
        return None;
    }

    Some(SetCritique {
        set,
        critics: vec![format!("{}. {}", issue, explanation)],
    })
}

/// Reads one stored critique blob in either form
pub fn normalize_critique(blob: &str) -> Option<SetCritique> {
    parse_structured(blob).or_else(|| parse_legacy(blob))
}
