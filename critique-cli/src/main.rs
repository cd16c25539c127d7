mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use critique_core::{
    compute_version, critique_stats, get_config_path, load_set_evaluation, open_database,
    requirement_detail, AiClient, AiError, CritiqueEngine, CritiqueError, CritiqueStore,
    FeedbackLevel, FilterCriteria, ItemQuality, ProjectContext, Settings,
};

use crate::cli::{
    ArtifactCommand, Cli, Command, ConfigCommand, ContextArgs, CritiqueCommand,
    EvaluationCommand, ReqCommand,
};

/// Exit code for a missing artifact or requirement
const EXIT_NOT_FOUND: i32 = 2;
/// Exit code for an unrecognized quality name
const EXIT_UNKNOWN_CRITERION: i32 = 3;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(exit_code(&err));
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CritiqueError>() {
        Some(CritiqueError::SubjectNotFound { .. }) => EXIT_NOT_FOUND,
        Some(CritiqueError::UnknownCriterion(_)) => EXIT_UNKNOWN_CRITERION,
        _ => 1,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let settings = Settings::load_or_default(&config_path)?;

    if let Command::Config(config_cmd) = &cli.command {
        return handle_config_command(config_cmd, &config_path, &settings);
    }

    let db_path = cli.db.clone().unwrap_or_else(|| settings.database.clone());
    let store = open_database(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let store = store.as_ref();

    match &cli.command {
        Command::Artifact(cmd) => handle_artifact_command(cmd, store),
        Command::Req(cmd) => handle_req_command(cmd, store),
        Command::Critique(cmd) => handle_critique_command(cmd, store, &settings),
        Command::Evaluation(EvaluationCommand::Show { artifact, filter }) => {
            match load_set_evaluation(store, *artifact, filter)? {
                Some(view) => print_json(&view),
                None => {
                    println!(
                        "{}",
                        format!("No cached evaluation for filter '{}'.", filter).yellow()
                    );
                    Ok(())
                }
            }
        }
        Command::Version { artifact, filter } => {
            println!("{}", compute_version(store, *artifact, filter)?);
            Ok(())
        }
        Command::Stats { id } => print_json(&critique_stats(store, *id)?),
        Command::Config(_) => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn split_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn require_artifact(store: &dyn CritiqueStore, id: i64) -> Result<critique_core::Artifact> {
    store
        .get_artifact(id)?
        .ok_or_else(|| CritiqueError::artifact_not_found(id).into())
}

/// Applies the flags that were given on top of `base`
fn merge_context(base: ProjectContext, args: &ContextArgs) -> ProjectContext {
    ProjectContext {
        project_description: args
            .description
            .clone()
            .unwrap_or(base.project_description),
        ml_task: args.ml_task.clone().or(base.ml_task),
        usage_context: args.usage_context.clone().or(base.usage_context),
        target_audience: args.target_audience.clone().or(base.target_audience),
        dataset_description: args.dataset_description.clone().or(base.dataset_description),
    }
}

fn handle_artifact_command(cmd: &ArtifactCommand, store: &dyn CritiqueStore) -> Result<()> {
    match cmd {
        ArtifactCommand::Add { name, context } => {
            let context = merge_context(ProjectContext::default(), context);
            let artifact = store.create_artifact(name, &context)?;
            println!("{}", "Artifact added successfully!".green());
            println!("ID: {}", artifact.id.to_string().green());
        }
        ArtifactCommand::Update { id, name, context } => {
            let artifact = require_artifact(store, *id)?;
            let name = name.clone().unwrap_or(artifact.name);
            let context = merge_context(artifact.context, context);
            store.update_artifact(*id, &name, &context)?;
            println!("{}", "Artifact updated successfully!".green());
        }
        ArtifactCommand::Show { id } => {
            let artifact = require_artifact(store, *id)?;
            println!("{}: {}", "ID".blue(), artifact.id);
            println!("{}: {}", "Name".blue(), artifact.name);
            println!("{}: {}", "Created".blue(), artifact.created_at);
            for (label, value) in artifact.context.fields() {
                println!("{}: {}", label.blue(), value);
            }

            let requirements = store.list_requirements(*id)?;
            println!("{}: {}", "Requirements".blue(), requirements.len());

            let evaluations = store.list_set_evaluations(*id)?;
            if !evaluations.is_empty() {
                println!("\n{}:", "Cached Evaluations".green());
                for evaluation in evaluations {
                    println!(
                        "  {} {} ({} qualities)",
                        evaluation.filter_criteria.cyan(),
                        evaluation.evaluated_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                        evaluation.qualities.len()
                    );
                }
            }
        }
        ArtifactCommand::List => {
            let artifacts = store.list_artifacts()?;
            if artifacts.is_empty() {
                println!("{}", "No artifacts found.".yellow());
                return Ok(());
            }
            println!("{:<6} | {:<30} | {}", "ID", "Name", "Project");
            println!("{}", "-".repeat(80));
            for artifact in artifacts {
                println!(
                    "{:<6} | {:<30} | {}",
                    artifact.id,
                    artifact.name,
                    artifact.context.project_description.dimmed()
                );
            }
        }
    }
    Ok(())
}

fn handle_req_command(cmd: &ReqCommand, store: &dyn CritiqueStore) -> Result<()> {
    match cmd {
        ReqCommand::Add {
            artifact,
            content,
            index,
            categories,
        } => {
            require_artifact(store, *artifact)?;
            let index = match index {
                Some(index) => *index,
                None => store
                    .list_requirements(*artifact)?
                    .iter()
                    .map(|r| r.card_index + 1)
                    .max()
                    .unwrap_or(0),
            };

            let req = store.add_requirement(*artifact, index, content)?;
            if let Some(categories) = categories {
                store.set_requirement_categories(req.id, &split_categories(categories))?;
            }
            println!("{}", "Requirement added successfully!".green());
            println!("ID: {}", req.id.to_string().green());
        }
        ReqCommand::Update { id, content } => {
            if store.get_requirement(*id)?.is_none() {
                return Err(CritiqueError::requirement_not_found(*id).into());
            }
            store.update_requirement_content(*id, content)?;
            println!("{}", "Requirement updated successfully!".green());
        }
        ReqCommand::Categories { id, categories } => {
            if store.get_requirement(*id)?.is_none() {
                return Err(CritiqueError::requirement_not_found(*id).into());
            }
            store.set_requirement_categories(*id, &split_categories(categories))?;
            println!("{}", "Categories updated successfully!".green());
        }
        ReqCommand::List { artifact, filter } => {
            require_artifact(store, *artifact)?;
            let requirements =
                store.select_requirements(*artifact, &FilterCriteria::parse(filter))?;
            if requirements.is_empty() {
                println!("{}", "No requirements found.".yellow());
                return Ok(());
            }

            println!("{:<6} | {:<5} | {:<25} | {}", "ID", "Card", "Categories", "Content");
            println!("{}", "-".repeat(100));
            for req in requirements {
                println!(
                    "{:<6} | {:<5} | {:<25} | {}",
                    req.id,
                    req.card_index,
                    req.category_label(),
                    req.content
                );
            }
        }
        ReqCommand::Show { id } => {
            let detail = requirement_detail(store, *id)?;
            let req = &detail.requirement;
            println!("{}: {}", "ID".blue(), req.id);
            println!("{}: {}", "Artifact".blue(), req.artifact_id);
            println!("{}: {}", "Content".blue(), req.content);
            if !req.categories.is_empty() {
                println!("{}: {}", "Categories".blue(), req.category_label());
            }
            println!("{}: {}", "Updated".blue(), req.content_updated_at);

            if !detail.feedback.is_empty() {
                println!("\n{}:", "Feedback".green());
                for feedback in &detail.feedback {
                    let level = match feedback.level {
                        FeedbackLevel::Warning => feedback.level.as_str().yellow(),
                        FeedbackLevel::Error => feedback.level.as_str().red(),
                    };
                    println!("  [{}] {}", level, feedback.quality.bold());
                    for critique in &feedback.critiques {
                        println!("    - {}", critique);
                    }
                }
            }
        }
    }
    Ok(())
}

fn ai_client(settings: &Settings) -> Result<AiClient> {
    let client = AiClient::from_settings(settings);
    if !client.is_available() {
        return Err(AiError::NotAvailable)
            .context("Install the Claude CLI or set claude_cli in the settings file");
    }
    info!(mode = %client.mode_description(), "using completion provider");
    Ok(client)
}

fn handle_critique_command(
    cmd: &CritiqueCommand,
    store: &dyn CritiqueStore,
    settings: &Settings,
) -> Result<()> {
    let client = ai_client(settings)?;
    let engine = CritiqueEngine::with_options(store, &client, settings.critique_options());

    match cmd {
        CritiqueCommand::Requirement { artifact, id } => {
            print_json(&engine.critique_requirement(*artifact, *id)?)
        }
        CritiqueCommand::Quality {
            artifact,
            id,
            quality,
        } => {
            let quality: ItemQuality = quality.parse()?;
            let artifact = require_artifact(store, *artifact)?;
            let requirement = store
                .get_requirement(*id)?
                .filter(|req| req.artifact_id == artifact.id)
                .ok_or_else(|| CritiqueError::requirement_not_found(*id))?;
            print_json(&engine.rate_quality(quality, &requirement, &artifact.context)?)
        }
        CritiqueCommand::Set { artifact, filter } => {
            match engine.critique_requirement_set(*artifact, filter)? {
                Some(stats) => print_json(&stats),
                None => {
                    println!(
                        "{}",
                        "No requirements match the filter; nothing to evaluate.".yellow()
                    );
                    Ok(())
                }
            }
        }
    }
}

fn handle_config_command(cmd: &ConfigCommand, path: &Path, settings: &Settings) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("{}: {}", "Settings file".blue(), path.display());
            print!("{}", serde_yaml::to_string(settings)?);
        }
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                println!(
                    "{} Settings file already exists: {} (use --force to overwrite)",
                    "!".yellow(),
                    path.display()
                );
                return Ok(());
            }
            Settings::default().save(path)?;
            println!("{} Wrote {}", "✓".green(), path.display());
        }
    }
    Ok(())
}
