//! JSON Query Module
//!
//! Calls the completion capability and parses the reply as strict JSON,
//! retrying with the same prompt when the reply does not parse.

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::ai::client::{AiError, CompletionProvider};
use crate::ai::responses;

/// Attempts made per query before giving up with `MalformedResponse`
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Shared flag used to abandon in-flight critiques
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for one orchestration call
#[derive(Debug, Clone)]
pub struct CritiqueOptions {
    /// Attempts per JSON query (values below 1 are treated as 1)
    pub max_retries: u32,
    pub cancel: CancelFlag,
    /// Wall-clock budget for the whole orchestration call
    pub deadline: Option<Duration>,
}

impl Default for CritiqueOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            cancel: CancelFlag::new(),
            deadline: None,
        }
    }
}

impl CritiqueOptions {
    /// Starts the clock for one orchestration call
    pub fn budget(&self) -> QueryBudget {
        QueryBudget {
            max_retries: self.max_retries.max(1),
            cancel: self.cancel.clone(),
            deadline: self.deadline.map(|d| Instant::now() + d),
        }
    }
}

/// Per-call limits shared by every query an orchestration issues
#[derive(Debug, Clone)]
pub struct QueryBudget {
    pub max_retries: u32,
    cancel: CancelFlag,
    deadline: Option<Instant>,
}

impl QueryBudget {
    /// Fails if the call was cancelled or ran out of time
    pub fn check(&self) -> Result<(), AiError> {
        if self.cancel.is_cancelled() {
            return Err(AiError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(AiError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Sends `prompt` and parses the reply as `T`.
///
/// Returns the parsed value together with the raw reply text. Parse failures
/// are retried with the unchanged prompt up to the budget's attempt count;
/// upstream failures are returned immediately.
pub fn query_json<T: DeserializeOwned>(
    provider: &dyn CompletionProvider,
    system_prompt: &str,
    prompt: &str,
    budget: &QueryBudget,
) -> Result<(T, String), AiError> {
    let mut last_reason = String::new();

    for attempt in 1..=budget.max_retries {
        budget.check()?;

        let raw = provider.complete(system_prompt, prompt)?;
        match responses::parse_strict::<T>(&raw) {
            Ok(value) => {
                debug!(attempt, "parsed JSON response");
                return Ok((value, raw));
            }
            Err(reason) => {
                warn!(attempt, max = budget.max_retries, %reason, "response was not valid JSON");
                last_reason = reason;
            }
        }
    }

    Err(AiError::MalformedResponse {
        attempts: budget.max_retries,
        reason: last_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::responses::RatingResponse;
    use crate::testing::ScriptedProvider;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_first_valid_response_is_returned() {
        let provider = ScriptedProvider::new(|_, _| {
            Ok(r#"{"eval_result": "high", "explanation": "Clear"}"#.to_string())
        });
        let budget = CritiqueOptions::default().budget();

        let (rating, raw): (RatingResponse, String) =
            query_json(&provider, "system", "prompt", &budget).unwrap();
        assert_eq!(rating.eval_result, "high");
        assert!(raw.contains("Clear"));
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_retries_until_valid_json() {
        let attempts = AtomicUsize::new(0);
        let provider = ScriptedProvider::new(move |_, _| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Ok("Sure! Here is my rating: high".to_string())
            } else {
                Ok(r#"{"eval_result": "low", "explanation": "Vague"}"#.to_string())
            }
        });
        let budget = CritiqueOptions::default().budget();

        let (rating, _): (RatingResponse, String) =
            query_json(&provider, "system", "prompt", &budget).unwrap();
        assert_eq!(rating.eval_result, "low");
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_gives_up_after_retry_budget() {
        let provider = ScriptedProvider::new(|_, _| Ok("not json".to_string()));
        let budget = CritiqueOptions::default().budget();

        let result: Result<(RatingResponse, String), AiError> =
            query_json(&provider, "system", "prompt", &budget);
        match result {
            Err(AiError::MalformedResponse { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("unexpected result: {:?}", other.map(|(_, raw)| raw)),
        }
        assert_eq!(provider.call_count(), 5);
    }

    #[test]
    fn test_same_prompt_is_resent() {
        let provider = ScriptedProvider::new(|_, _| Ok("{}".to_string()));
        let budget = CritiqueOptions {
            max_retries: 3,
            ..Default::default()
        }
        .budget();

        let _: Result<(RatingResponse, String), AiError> =
            query_json(&provider, "system", "the prompt", &budget);
        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p == "the prompt"));
    }

    #[test]
    fn test_upstream_failure_is_not_retried() {
        let provider =
            ScriptedProvider::new(|_, _| Err(AiError::UpstreamFailure("rate limited".to_string())));
        let budget = CritiqueOptions::default().budget();

        let result: Result<(RatingResponse, String), AiError> =
            query_json(&provider, "system", "prompt", &budget);
        assert!(matches!(result, Err(AiError::UpstreamFailure(_))));
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let provider = ScriptedProvider::new(|_, _| {
            Ok(r#"{"eval_result": "medium", "explanation": null}"#.to_string())
        });
        let budget = CritiqueOptions {
            max_retries: 0,
            ..Default::default()
        }
        .budget();

        let result: Result<(RatingResponse, String), AiError> =
            query_json(&provider, "system", "prompt", &budget);
        assert!(result.is_ok());
    }

    #[test]
    fn test_cancelled_budget_makes_no_calls() {
        let provider = ScriptedProvider::new(|_, _| Ok("{}".to_string()));
        let options = CritiqueOptions::default();
        options.cancel.cancel();
        let budget = options.budget();

        let result: Result<(RatingResponse, String), AiError> =
            query_json(&provider, "system", "prompt", &budget);
        assert!(matches!(result, Err(AiError::Cancelled)));
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_expired_deadline_makes_no_calls() {
        let provider = ScriptedProvider::new(|_, _| Ok("{}".to_string()));
        let budget = CritiqueOptions {
            deadline: Some(Duration::ZERO),
            ..Default::default()
        }
        .budget();

        let result: Result<(RatingResponse, String), AiError> =
            query_json(&provider, "system", "prompt", &budget);
        assert!(matches!(result, Err(AiError::DeadlineExceeded)));
        assert_eq!(provider.call_count(), 0);
    }
}
