//! Basic usage example for Cadenza
//!
//! This example demonstrates:
//! - Building a scenario from an inline YAML definition
//! - Registering a tool function the model can call
//! - Running the standard stage pipeline against a scripted chat client
//! - Reading cross-stage state back out of the context store

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

// Import from cadenza crates
use cadenza_core::prelude::*;
use cadenza_llm::{ChatClient, ChatCompletion, ChatCompletionAdapter, ScriptedChatClient};
use cadenza_runtime::middleware::standard_pipeline;
use cadenza_runtime::{ScenarioOrchestrator, ScenarioRegistry};
use cadenza_stores::{
    InMemoryItemStore, InMemoryScenarioStore, InMemoryTurnStore, TurnStoreOptions,
};

const SCENARIO_YAML: &str = r#"
name: report
validModels: [gpt-4o-mini]
stages:
  - id: 1
    name: collect
    systemPrompt: You summarize numbers.
    userPrompts:
      - template: "Sum the figures for session {{sessionId}}"
    functions:
      functions:
        - name: sum
          description: Add two numbers
          parameters: '{"type":"object","properties":{"a":{"type":"integer"},"b":{"type":"integer"}},"required":["a","b"]}'
  - id: 2
    name: present
    userPrompts:
      - template: "Write one line about: {{1-1:output}}"
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Cadenza Basic Usage Example ===\n");

    // Register the tool function the model may call
    let functions = Arc::new(FunctionRegistry::new());
    functions.register_fn("sum", |args: Value| {
        let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
        let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
        Ok((a + b).to_string())
    })?;

    // Build the scenario and put it in a registry
    let builder = ScenarioBuilder::new(Arc::new(SchemaRegistry::new()));
    let definition = parse_definition(&PathBuf::from("report.yaml"), SCENARIO_YAML)?;
    let scenario = builder.build(&definition)?;
    println!("Built scenario '{}' with {} stages", scenario.name, scenario.stages.len());

    let store = Arc::new(InMemoryScenarioStore::new());
    store.store_scenario(scenario).await?;
    let registry = ScenarioRegistry::new(vec![store]);

    // A scripted client stands in for the provider: one tool round, then
    // terminal answers for both stages.
    let client = Arc::new(ScriptedChatClient::new(vec![
        ChatCompletion {
            tool_calls: vec![cadenza_llm::ToolCallRequest {
                id: "call_1".to_string(),
                name: "sum".to_string(),
                arguments: r#"{"a":19,"b":23}"#.to_string(),
            }],
            finish_reason: Some("tool_calls".to_string()),
            ..ChatCompletion::default()
        },
        ChatCompletion {
            id: Some("resp-1".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            content: Some("The figures add up to 42.".to_string()),
            finish_reason: Some("stop".to_string()),
            ..ChatCompletion::default()
        },
        ChatCompletion {
            id: Some("resp-2".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            content: Some("Everything adds up.".to_string()),
            finish_reason: Some("stop".to_string()),
            ..ChatCompletion::default()
        },
    ]));
    let mut clients: HashMap<String, Arc<dyn ChatClient>> = HashMap::new();
    clients.insert("gpt-4o-mini".to_string(), client);
    let adapter = Arc::new(ChatCompletionAdapter::with_clients(
        clients, functions, false, None,
    ));

    // Wire the standard pipeline and run the scenario
    let items = Arc::new(InMemoryItemStore::new());
    let turns = Arc::new(InMemoryTurnStore::new(TurnStoreOptions::default())?);
    let pipeline = standard_pipeline(items.clone(), turns, adapter);
    let orchestrator = ScenarioOrchestrator::new(registry, pipeline);

    let results = orchestrator
        .execute_scenario("demo-session", "report", &CancellationToken::new())
        .await?;

    for (stage_index, stage_results) in results.iter().enumerate() {
        for result in stage_results {
            println!("Stage {} -> {}", stage_index + 1, result.content);
            for call in &result.metadata.tool_calls {
                println!("  tool {}({}) = {}", call.function_name, call.arguments, call.result);
            }
        }
    }

    // Cross-stage state lives in the context store under canonical keys
    let output = items
        .load_item("demo-session", "stage:1-1:output")
        .await?
        .unwrap_or(Value::Null);
    println!("\nContext store stage:1-1:output = {}", output);

    Ok(())
}
