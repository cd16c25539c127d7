//! Prompt Templates for AI Operations
//!
//! Every template has the same four parts: an introduction defining the
//! quality, the project context, the request, and the response format.
//! Builders are pure; the quality enums make the template choice exhaustive.

use crate::models::{ItemQuality, ProjectContext, RatingLevel, Requirement, SetQuality};

pub const RATING_SYSTEM_PROMPT: &str = "You are an expert in analyzing requirement quality.";

pub const CRITIQUE_SYSTEM_PROMPT: &str =
    "You are an expert in analyzing requirement quality and providing critiques.";

pub const SET_SYSTEM_PROMPT: &str =
    "You are an expert in analyzing requirement sets and their quality.";

const RAW_JSON_RULES: &str = "Respond with raw JSON only. Do not wrap the JSON in a code block \
(no ``` fences) and do not add any text before or after it. Property names must be enclosed in \
double quotes.";

fn item_definition(quality: ItemQuality) -> &'static str {
    match quality {
        ItemQuality::Necessary => {
            "The requirement defines an essential capability, characteristic, constraint or \
quality factor. If it were removed, a deficiency would exist that no other requirement fills. \
It is currently applicable and has not been made obsolete; planned expiration or applicability \
dates are clearly identified."
        }
        ItemQuality::Appropriate => {
            "The intent and amount of detail of the requirement suit the level of the entity it \
refers to. It avoids unnecessary constraints on the architecture or design and leaves the \
implementation as independent as possible."
        }
        ItemQuality::Unambiguous => {
            "The requirement is stated so that it can be interpreted in only one way. It is \
stated simply and is easy to understand."
        }
        ItemQuality::Complete => {
            "The requirement sufficiently describes the necessary capability, characteristic, \
constraint or quality factor to meet the entity need without needing other information to be \
understood."
        }
        ItemQuality::Singular => {
            "The requirement states a single capability, characteristic, constraint or quality \
factor. It may still list several conditions under which that single item must be met."
        }
        ItemQuality::Feasible => {
            "The requirement can be realized within system constraints (cost, schedule, \
technical) with acceptable risk."
        }
        ItemQuality::Verifiable => {
            "The requirement is structured and worded so that its realization can be proven to \
the customer's satisfaction at the level the requirement exists. Measurable requirements are \
easier to verify."
        }
        ItemQuality::Correct => {
            "The requirement is an accurate representation of the entity need from which it was \
derived."
        }
        ItemQuality::Conforming => {
            "The requirement conforms to an approved standard template and style for writing \
requirements, when one applies."
        }
    }
}

fn item_guidance(quality: ItemQuality) -> Option<&'static str> {
    match quality {
        ItemQuality::Unambiguous => Some(
            r#"Signs of an unambiguous requirement:
1. It uses precise, well-defined terms.
2. It avoids subjective words such as "good", "fast" or "efficient" and uses measurable criteria instead.
3. It does not depend on unstated context or implicit assumptions.
Signs of an ambiguous requirement:
1. Vague adjectives ("The system shall work well").
2. Subjective descriptions ("The interface should be user-friendly").
3. Relative terms without a reference point ("The model shall be better than before").
4. Implicit assumptions ("The data shall be secure" - secure against what?).
"#,
        ),
        _ => None,
    }
}

fn set_definition(quality: SetQuality) -> &'static str {
    match quality {
        SetQuality::Complete => {
            "The set stands alone and sufficiently describes the capabilities, characteristics, \
constraints or quality factors needed to meet the entity needs without further information. \
It contains no To Be Defined (TBD), To Be Specified (TBS) or To Be Resolved (TBR) clauses, \
other than ones with an accepted resolution timeframe."
        }
        SetQuality::Consistent => {
            "The individual requirements are unique, do not conflict with or overlap one \
another, and use homogeneous units and measurement systems. Terminology is used consistently: \
the same term means the same thing throughout the set."
        }
        SetQuality::Feasible => {
            "The complete set can be realized within entity constraints (cost, schedule, \
technical) with acceptable risk."
        }
        SetQuality::Comprehensible => {
            "The set is written so that it is clear what is expected of the entity and how it \
relates to the system it is part of."
        }
        SetQuality::AbleToBeValidated => {
            "It is possible to confirm that realizing the set will satisfy the entity needs \
within the entity constraints, including the stakeholders' intended use and operational \
concept."
        }
    }
}

/// Build context about the project from its non-empty fields
pub fn build_context_block(context: &ProjectContext) -> String {
    let fields = context.fields();
    if fields.is_empty() {
        return "## Project Context\n(no project context provided)".to_string();
    }

    let lines: Vec<String> = fields
        .iter()
        .map(|(label, value)| format!("- {}: {}", label, value))
        .collect();
    format!("## Project Context\n{}", lines.join("\n"))
}

/// Build prompt for rating one requirement against one quality
pub fn build_rating_prompt(
    quality: ItemQuality,
    requirement: &str,
    category_label: &str,
    context: &ProjectContext,
) -> String {
    let subject = if category_label.is_empty() {
        "requirement".to_string()
    } else {
        format!("{} requirement", category_label)
    };
    let name = quality.name();
    let lower = name.to_lowercase();
    let guidance = item_guidance(quality)
        .map(|g| format!("\n{}", g))
        .unwrap_or_default();
    let context_block = build_context_block(context);

    format!(
        r#"The user has provided a requirement: {requirement}

Your task is to evaluate the quality of a {subject}.
Evaluate whether the requirement is {lower}.
{name} means: {definition}

{context_block}

## Task
Based on the project context and the definition of the quality, rate this requirement as high, medium, or low.
{guidance}The result must be exactly one of: high, medium, low.
Explain why you chose that rating.

## Response Format
{rules}
Use exactly these fields:
{{"eval_result": "<high|medium|low>", "explanation": "<why the requirement earned this rating>"}}"#,
        definition = item_definition(quality),
        rules = RAW_JSON_RULES,
    )
}

/// Build the follow-up prompt asking for critiques of a medium or low rating.
///
/// Returns `None` for a high rating, which gets no critiques.
pub fn build_critique_prompt(
    rating: RatingLevel,
    rating_prompt: &str,
    rating_response: &str,
) -> Option<String> {
    let cap = rating.feedback_level()?.critique_cap();

    Some(format!(
        r#"## Previous Step
The requirement was first rated for this quality as high, medium, or low.

### Rating Request
{rating_prompt}

### Rating Response
{rating_response}

### Final Rating
{rating}

## Task
The requirement is rated as {rating} quality. Count the problematic expressions in the requirement sentence.
If there are more than {cap}, write critiques for the {cap} most severe ones only; otherwise write one critique for each.
- Each critique is one or two short sentences.
- Each critique targets one specific part of the sentence.
- Avoid high-level judgments such as "missing goals" or "unclear background".
- Do not criticize the same part of the sentence more than once.

## Response Format
{rules}
Use exactly this field:
{{"critiques": ["<critique 1>", "<critique 2>"]}}"#,
        rules = RAW_JSON_RULES,
    ))
}

/// Number the requirements of a set ("Requirement 1: ...")
pub fn build_requirements_listing(requirements: &[Requirement]) -> String {
    requirements
        .iter()
        .enumerate()
        .map(|(i, req)| format!("Requirement {}: {}", i + 1, req.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build prompt for evaluating a group of requirements against a set quality
pub fn build_set_prompt(
    quality: SetQuality,
    listing: &str,
    filter_label: &str,
    context: &ProjectContext,
) -> String {
    let name = quality.name();
    let lower = name.to_lowercase();
    let context_block = build_context_block(context);

    format!(
        r#"Your task is to evaluate the quality of a set of requirements with categories: {filter_label}.
Evaluate whether the following set of requirements is {lower} as a set.
{name} as a set means: {definition}

{context_block}

## Requirements to Evaluate
{listing}

## Task
Based on the project context, the requirements set, and the definition above, evaluate whether the set is {lower}.
Write a summary paragraph explaining which aspects of this quality the set meets or fails to meet.

Then identify issues that affect GROUPS of requirements, not individual requirements:
1. Each critique must name a combination of at least 2 requirements that together cause the problem.
2. Never write two critiques for exactly the same combination of requirements.
3. Critiques may share requirements as long as their combinations differ.
4. Always list the requirement numbers involved.
If there are no set-level issues, return an empty critiques array.

## Response Format
{rules}
Use exactly this structure:
{{"summary": "<summary paragraph>", "critiques": [{{"issue": "<description of the issue>", "requirement_ids": [1, 3], "explanation": "<why these requirements together create the problem>"}}]}}"#,
        definition = set_definition(quality),
        rules = RAW_JSON_RULES,
    )
}
