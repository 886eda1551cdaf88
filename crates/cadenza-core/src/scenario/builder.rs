//! Lowers validated scenario definitions to the runtime representation.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{DefinitionError, ValidationIssue};
use crate::schema::SchemaProvider;
use crate::store::keys;
use crate::types::{
    FunctionCallConfig, FunctionCallRule, FunctionDefinition, FunctionSpec, FunctionsDefinition,
    PromptTurn, ResponseFormat, ResponseFormatConfig, ResponseFormatKind, RuntimeStage,
    ScenarioDefinition, ScenarioPrompt, StageDefinition, ToolSpec, TurnParameters, TurnRole,
};

use super::validator::validate_definition;

/// Builds runtime scenarios from validated definitions.
///
/// Named response/parameter types are resolved through the attached schema
/// provider.
pub struct ScenarioBuilder {
    schemas: Arc<dyn SchemaProvider>,
}

impl ScenarioBuilder {
    /// Create a builder backed by the given schema provider
    pub fn new(schemas: Arc<dyn SchemaProvider>) -> Self {
        Self { schemas }
    }

    /// Lower a definition to its runtime form, rejecting invalid definitions
    pub fn build(&self, definition: &ScenarioDefinition) -> Result<ScenarioPrompt, DefinitionError> {
        let issues = validate_definition(definition);
        if !issues.is_empty() {
            return Err(DefinitionError::Invalid {
                name: definition.name.clone(),
                issues,
            });
        }

        let stages = definition
            .stages
            .iter()
            .map(|stage| self.build_stage(definition, stage))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            scenario = %definition.name,
            stage_count = stages.len(),
            "scenario built"
        );

        Ok(ScenarioPrompt {
            name: definition.name.clone(),
            stages,
            metadata: definition.metadata.clone(),
        })
    }

    fn build_stage(
        &self,
        definition: &ScenarioDefinition,
        stage: &StageDefinition,
    ) -> Result<RuntimeStage, DefinitionError> {
        let functions = stage
            .functions
            .as_ref()
            .map(|f| self.build_function_config(&definition.name, f));
        let tools = stage
            .tools
            .as_ref()
            .map(|tools| {
                tools
                    .iter()
                    .map(|tool| ToolSpec {
                        function: self.build_function_spec(&definition.name, &tool.function),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut turns = Vec::with_capacity(stage.user_prompts.len() + 1);
        if let Some(system) = &stage.system_prompt {
            if !system.trim().is_empty() {
                turns.push(PromptTurn::system(system.clone()));
            }
        }

        for (index, prompt) in stage.user_prompts.iter().enumerate() {
            let response_format = self.resolve_response_format(
                &definition.name,
                prompt.response_format_config.as_ref(),
            )?;
            let parameters = TurnParameters {
                temperature: prompt.temperature.or(stage.temperature),
                top_p: prompt.top_p.or(stage.top_p),
                max_tokens: prompt.max_tokens.or(stage.max_tokens),
                response_format,
                functions: functions.clone(),
                tools: tools.clone(),
                extras: prompt.parameters.clone(),
            };
            turns.push(
                PromptTurn::new(TurnRole::User, prompt.template.clone())
                    .with_name(keys::stage_key(stage.id, index))
                    .with_parameters(parameters),
            );
        }

        let stage_parameters = TurnParameters {
            temperature: stage.temperature,
            top_p: stage.top_p,
            max_tokens: stage.max_tokens,
            response_format: None,
            functions,
            tools,
            extras: stage.parameters.clone(),
        };

        let model = stage
            .model
            .clone()
            .or_else(|| definition.valid_models.first().cloned());

        Ok(RuntimeStage {
            id: stage.id,
            name: stage.name.clone(),
            turns,
            model,
            parameters: stage_parameters,
        })
    }

    fn resolve_response_format(
        &self,
        scenario: &str,
        config: Option<&ResponseFormatConfig>,
    ) -> Result<Option<ResponseFormat>, DefinitionError> {
        let Some(config) = config else {
            return Ok(None);
        };

        match config.kind {
            ResponseFormatKind::Text => Ok(Some(ResponseFormat::Text)),
            ResponseFormatKind::JsonObject => Ok(Some(ResponseFormat::JsonObject)),
            ResponseFormatKind::JsonSchema => {
                match (&config.schema, &config.response_type_name) {
                    (Some(schema), None) if !schema.trim().is_empty() => {
                        Ok(Some(ResponseFormat::JsonSchema {
                            schema: schema.clone(),
                        }))
                    }
                    (None, Some(type_name)) => match self.schemas.resolve(type_name) {
                        Some(schema) => Ok(Some(ResponseFormat::JsonSchema { schema })),
                        None => {
                            info!(
                                scenario,
                                type_name = %type_name,
                                "response type not registered; downgrading to json_object"
                            );
                            Ok(Some(ResponseFormat::JsonObject))
                        }
                    },
                    _ => Err(DefinitionError::Invalid {
                        name: scenario.to_string(),
                        issues: vec![ValidationIssue::new(
                            "responseFormatConfig",
                            "JsonSchema requires exactly one of schema or responseTypeName",
                        )],
                    }),
                }
            }
        }
    }

    fn build_function_config(
        &self,
        scenario: &str,
        definition: &FunctionsDefinition,
    ) -> FunctionCallConfig {
        let functions = definition
            .functions
            .iter()
            .map(|f| self.build_function_spec(scenario, f))
            .collect();
        let call = match definition.function_call.as_deref() {
            None | Some("auto") => FunctionCallRule::Auto,
            Some("none") => FunctionCallRule::None,
            Some(name) => FunctionCallRule::Specific(name.to_string()),
        };
        FunctionCallConfig { functions, call }
    }

    fn build_function_spec(
        &self,
        scenario: &str,
        definition: &FunctionDefinition,
    ) -> FunctionSpec {
        let parameters = self.resolve_function_parameters(scenario, definition);
        FunctionSpec {
            name: definition.name.clone(),
            description: definition.description.clone().unwrap_or_default(),
            parameters,
        }
    }

    /// Named type first, then the literal schema, then an empty object.
    fn resolve_function_parameters(
        &self,
        scenario: &str,
        definition: &FunctionDefinition,
    ) -> Value {
        if let Some(type_name) = &definition.parameters_type {
            if let Some(schema) = self.schemas.resolve(type_name) {
                match serde_json::from_str(&schema) {
                    Ok(value) => return value,
                    Err(e) => warn!(
                        scenario,
                        function = %definition.name,
                        type_name = %type_name,
                        error = %e,
                        "registered parameter schema is not valid JSON"
                    ),
                }
            } else {
                info!(
                    scenario,
                    function = %definition.name,
                    type_name = %type_name,
                    "parameter type not registered; falling back"
                );
            }
        }

        if let Some(literal) = &definition.parameters {
            match serde_json::from_str(literal) {
                Ok(value) => return value,
                Err(e) => warn!(
                    scenario,
                    function = %definition.name,
                    error = %e,
                    "literal parameter schema is not valid JSON; using empty object"
                ),
            }
        }

        json!({})
    }
}
