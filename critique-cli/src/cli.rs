use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Critique the quality of requirements with an LLM")]
pub struct Cli {
    /// Path to the settings file (defaults to $CRITIQUE_CONFIG or ~/.critique.yaml)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database (overrides the settings file)
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage artifacts (requirement documents)
    #[clap(subcommand)]
    Artifact(ArtifactCommand),

    /// Manage requirements
    #[clap(subcommand)]
    Req(ReqCommand),

    /// Run a critique through the language model
    #[clap(subcommand)]
    Critique(CritiqueCommand),

    /// Show cached set evaluations
    #[clap(subcommand)]
    Evaluation(EvaluationCommand),

    /// Print the version digest of a requirement selection
    Version {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// "All" or a comma-separated list of categories
        #[clap(long, default_value = "All")]
        filter: String,
    },

    /// Print warnings and errors stored for a requirement
    Stats {
        /// Requirement ID
        id: i64,
    },

    /// Manage the settings file
    #[clap(subcommand)]
    Config(ConfigCommand),
}

/// Project context fields shared by `artifact add` and `artifact update`
#[derive(Args, Debug, Default)]
pub struct ContextArgs {
    /// Description of the project
    #[clap(long)]
    pub description: Option<String>,

    /// Machine learning task the project performs
    #[clap(long)]
    pub ml_task: Option<String>,

    /// How the system will be used
    #[clap(long)]
    pub usage_context: Option<String>,

    /// Who the system is for
    #[clap(long)]
    pub target_audience: Option<String>,

    /// Data the model is trained and evaluated on
    #[clap(long)]
    pub dataset_description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ArtifactCommand {
    /// Create a new artifact
    Add {
        /// Name of the artifact
        name: String,

        #[clap(flatten)]
        context: ContextArgs,
    },

    /// Update the name or project context of an artifact
    Update {
        /// Artifact ID
        id: i64,

        /// New name for the artifact
        #[clap(long)]
        name: Option<String>,

        #[clap(flatten)]
        context: ContextArgs,
    },

    /// Show an artifact with its context and cached evaluations
    Show {
        /// Artifact ID
        id: i64,
    },

    /// List all artifacts
    List,
}

#[derive(Subcommand, Debug)]
pub enum ReqCommand {
    /// Add a requirement card to an artifact
    Add {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// Requirement text
        content: String,

        /// Card position (defaults to after the last card)
        #[clap(long)]
        index: Option<i64>,

        /// Comma-separated categories
        #[clap(long)]
        categories: Option<String>,
    },

    /// Change the text of a requirement
    Update {
        /// Requirement ID
        id: i64,

        /// New requirement text
        content: String,
    },

    /// Replace the categories of a requirement
    Categories {
        /// Requirement ID
        id: i64,

        /// Comma-separated categories (empty to clear)
        categories: String,
    },

    /// List the requirements of an artifact
    List {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// "All" or a comma-separated list of categories
        #[clap(long, default_value = "All")]
        filter: String,
    },

    /// Show a requirement with its feedback
    Show {
        /// Requirement ID
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum CritiqueCommand {
    /// Rate one requirement against every item quality
    Requirement {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// Requirement ID
        id: i64,
    },

    /// Rate one requirement against a single quality without storing feedback
    Quality {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// Requirement ID
        id: i64,

        /// Quality name (e.g. Unambiguous)
        quality: String,
    },

    /// Evaluate a group of requirements against the set qualities
    Set {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// "All" or a comma-separated list of categories
        #[clap(long, default_value = "All")]
        filter: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvaluationCommand {
    /// Show the cached evaluation for a filter
    Show {
        /// Artifact ID
        #[clap(long)]
        artifact: i64,

        /// "All" or a comma-separated list of categories
        #[clap(long, default_value = "All")]
        filter: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings
    Show,

    /// Write a settings file with default values
    Init {
        /// Overwrite an existing file
        #[clap(long)]
        force: bool,
    },
}
