//! AI Client Module
//!
//! Defines the text-completion capability used by the critique engine and
//! the Claude CLI implementation of it.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;

/// Errors that can occur during AI operations
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Claude CLI not found at {0}")]
    CliNotFound(PathBuf),

    #[error("Completion request failed: {0}")]
    UpstreamFailure(String),

    #[error("Malformed response after {attempts} attempt(s): {reason}")]
    MalformedResponse { attempts: u32, reason: String },

    #[error("AI integration not available")]
    NotAvailable,

    #[error("Critique was cancelled")]
    Cancelled,

    #[error("Critique deadline exceeded")]
    DeadlineExceeded,

    #[error("Evaluation task panicked: {0}")]
    TaskPanicked(String),
}

/// Single-turn chat completion: (system prompt, user prompt) -> response text
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError>;
}

/// AI operation mode
#[derive(Debug, Clone, Default)]
pub enum AiMode {
    /// Use Claude CLI in print mode
    ClaudeCli { path: PathBuf, model: Option<String> },
    /// AI features disabled
    #[default]
    Disabled,
}

/// AI Client for interacting with Claude
#[derive(Debug, Clone)]
pub struct AiClient {
    mode: AiMode,
}

impl Default for AiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AiClient {
    /// Create a new AI client with auto-detected mode
    pub fn new() -> Self {
        let mode = match Self::find_claude_cli() {
            Some(path) => AiMode::ClaudeCli { path, model: None },
            None => AiMode::Disabled,
        };
        Self { mode }
    }

    /// Create a client with a specific mode
    pub fn with_mode(mode: AiMode) -> Self {
        Self { mode }
    }

    /// Create a client from settings, falling back to auto-detection
    pub fn from_settings(settings: &Settings) -> Self {
        let path = settings.claude_cli.clone().or_else(Self::find_claude_cli);
        let mode = match path {
            Some(path) => AiMode::ClaudeCli {
                path,
                model: settings.model.clone(),
            },
            None => AiMode::Disabled,
        };
        Self { mode }
    }

    /// Find the claude CLI executable
    fn find_claude_cli() -> Option<PathBuf> {
        if let Ok(output) = Command::new("which").arg("claude").output() {
            if output.status.success() {
                let path_str = String::from_utf8_lossy(&output.stdout);
                let path = PathBuf::from(path_str.trim());
                if path.exists() {
                    return Some(path);
                }
            }
        }

        let candidates = ["/usr/local/bin/claude", "/usr/bin/claude"];
        if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
            return Some(path);
        }

        dirs::home_dir()
            .map(|home| home.join(".npm-global/bin/claude"))
            .filter(|p| p.exists())
    }

    /// Check if AI features are available
    pub fn is_available(&self) -> bool {
        match &self.mode {
            AiMode::ClaudeCli { path, .. } => path.exists(),
            AiMode::Disabled => false,
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> &AiMode {
        &self.mode
    }

    /// Get a description of the current mode
    pub fn mode_description(&self) -> String {
        match &self.mode {
            AiMode::ClaudeCli { path, model: Some(model) } => {
                format!("Claude CLI ({}, model {})", path.display(), model)
            }
            AiMode::ClaudeCli { path, model: None } => format!("Claude CLI ({})", path.display()),
            AiMode::Disabled => "Disabled".to_string(),
        }
    }

    /// Send request via Claude CLI
    fn send_cli_request(
        &self,
        cli_path: &Path,
        model: Option<&str>,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<String, AiError> {
        if !cli_path.exists() {
            return Err(AiError::CliNotFound(cli_path.to_path_buf()));
        }

        let mut command = Command::new(cli_path);
        command
            .arg("--print")
            .arg("--append-system-prompt")
            .arg(system_prompt);
        if let Some(model) = model {
            command.arg("--model").arg(model);
        }
        command.arg(prompt);

        debug!(cli = %cli_path.display(), prompt_len = prompt.len(), "sending completion request");
        let output = command
            .output()
            .map_err(|e| AiError::UpstreamFailure(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AiError::UpstreamFailure(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if response.is_empty() {
            return Err(AiError::UpstreamFailure(
                "Empty response from CLI".to_string(),
            ));
        }

        Ok(response)
    }
}

impl CompletionProvider for AiClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError> {
        match &self.mode {
            AiMode::ClaudeCli { path, model } => {
                self.send_cli_request(path, model.as_deref(), system_prompt, user_prompt)
            }
            AiMode::Disabled => Err(AiError::NotAvailable),
        }
    }
}
