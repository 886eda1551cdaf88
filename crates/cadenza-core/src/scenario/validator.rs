//! Scenario well-formedness checks.
//!
//! `validate_definition` guards the declarative form before the builder
//! lowers it; `validate_runtime_scenario` guards built scenarios arriving
//! through administrative flows.

use std::collections::HashSet;

use crate::error::ValidationIssue;
use crate::types::{
    ResponseFormat, ScenarioDefinition, ScenarioPrompt, StageDefinition, TurnRole,
};

/// Validate a scenario definition; an empty result means well-formed.
pub fn validate_definition(definition: &ScenarioDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if definition.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "must not be empty"));
    }
    if definition.valid_models.is_empty() {
        issues.push(ValidationIssue::new("validModels", "must not be empty"));
    }
    if definition.stages.is_empty() {
        issues.push(ValidationIssue::new("stages", "must not be empty"));
    }

    let mut seen_ids = HashSet::new();
    for (index, stage) in definition.stages.iter().enumerate() {
        let path = format!("stages[{}]", index);
        if !seen_ids.insert(stage.id) {
            issues.push(ValidationIssue::new(
                format!("{}.id", path),
                format!("duplicate stage id {}", stage.id),
            ));
        }
        validate_stage(stage, &path, &mut issues);
    }

    issues
}

fn validate_stage(stage: &StageDefinition, path: &str, issues: &mut Vec<ValidationIssue>) {
    if stage.user_prompts.is_empty() {
        issues.push(ValidationIssue::new(
            format!("{}.userPrompts", path),
            "at least one user prompt is required",
        ));
    }

    check_unit_range(stage.temperature, &format!("{}.temperature", path), issues);
    check_unit_range(stage.top_p, &format!("{}.topP", path), issues);
    check_positive(stage.max_tokens, &format!("{}.maxTokens", path), issues);

    for (index, prompt) in stage.user_prompts.iter().enumerate() {
        let prompt_path = format!("{}.userPrompts[{}]", path, index);
        if prompt.template.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("{}.template", prompt_path),
                "must not be empty",
            ));
        }
        check_unit_range(
            prompt.temperature,
            &format!("{}.temperature", prompt_path),
            issues,
        );
        check_unit_range(prompt.top_p, &format!("{}.topP", prompt_path), issues);
        check_positive(
            prompt.max_tokens,
            &format!("{}.maxTokens", prompt_path),
            issues,
        );
    }
}

fn check_unit_range(value: Option<f64>, path: &str, issues: &mut Vec<ValidationIssue>) {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            issues.push(ValidationIssue::new(
                path,
                format!("must be between 0 and 1, got {}", v),
            ));
        }
    }
}

fn check_positive(value: Option<u32>, path: &str, issues: &mut Vec<ValidationIssue>) {
    if value == Some(0) {
        issues.push(ValidationIssue::new(path, "must be greater than zero"));
    }
}

/// Validate a built scenario; an empty result means well-formed.
pub fn validate_runtime_scenario(scenario: &ScenarioPrompt) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if scenario.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "must not be empty"));
    }

    let mut seen_ids = HashSet::new();
    for (index, stage) in scenario.stages.iter().enumerate() {
        let path = format!("stages[{}]", index);
        if !seen_ids.insert(stage.id) {
            issues.push(ValidationIssue::new(
                format!("{}.id", path),
                format!("duplicate stage id {}", stage.id),
            ));
        }

        let system_turns = stage
            .turns
            .iter()
            .filter(|t| t.role == TurnRole::System)
            .count();
        if system_turns > 1 {
            issues.push(ValidationIssue::new(
                format!("{}.turns", path),
                "at most one system turn is allowed",
            ));
        }
        if stage.user_turns().next().is_none() {
            issues.push(ValidationIssue::new(
                format!("{}.turns", path),
                "at least one user turn is required",
            ));
        }

        for (turn_index, turn) in stage.turns.iter().enumerate() {
            if let Some(ResponseFormat::JsonSchema { schema }) =
                &turn.parameters.response_format
            {
                if schema.trim().is_empty() {
                    issues.push(ValidationIssue::new(
                        format!("{}.turns[{}].responseFormat", path, turn_index),
                        "json_schema response format requires a non-empty schema",
                    ));
                }
            }
        }
    }

    issues
}
