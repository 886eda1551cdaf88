//! End-to-end scenario flows against in-memory stores and a scripted chat
//! client.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use cadenza_core::adapter::CancellationToken;
use cadenza_core::functions::FunctionRegistry;
use cadenza_core::scenario::{parse_definition, ScenarioBuilder, ScenarioStore};
use cadenza_core::schema::SchemaRegistry;
use cadenza_core::store::ItemStore;
use cadenza_llm::{
    ChatClient, ChatCompletion, ChatCompletionAdapter, ScriptedChatClient, TokenUsage,
    ToolCallRequest,
};
use cadenza_runtime::middleware::standard_pipeline;
use cadenza_runtime::{
    AdapterError, OrchestratorError, PipelineError, ScenarioOrchestrator, ScenarioRegistry,
};
use cadenza_stores::{
    InMemoryItemStore, InMemoryScenarioStore, InMemoryTurnStore, TurnStoreOptions,
};

struct Harness {
    orchestrator: ScenarioOrchestrator,
    items: Arc<InMemoryItemStore>,
    client: Arc<ScriptedChatClient>,
}

impl Harness {
    async fn item(&self, key: &str) -> Option<Value> {
        self.items.load_item("sess-1", key).await.expect("load item")
    }
}

async fn harness(
    yaml: &str,
    responses: Vec<ChatCompletion>,
    functions: FunctionRegistry,
) -> Harness {
    let builder = ScenarioBuilder::new(Arc::new(SchemaRegistry::new()));
    let definition =
        parse_definition(&PathBuf::from("scenario.yaml"), yaml).expect("parse definition");
    let scenario = builder.build(&definition).expect("build scenario");

    let store = Arc::new(InMemoryScenarioStore::new());
    store.store_scenario(scenario).await.expect("store scenario");
    let registry = ScenarioRegistry::new(vec![store]);

    let client = Arc::new(ScriptedChatClient::new(responses));
    let mut clients: HashMap<String, Arc<dyn ChatClient>> = HashMap::new();
    clients.insert("m".to_string(), client.clone());
    let adapter = Arc::new(ChatCompletionAdapter::with_clients(
        clients,
        Arc::new(functions),
        false,
        None,
    ));

    let items = Arc::new(InMemoryItemStore::new());
    let turns = Arc::new(InMemoryTurnStore::new(TurnStoreOptions::default()).expect("options"));
    let pipeline = standard_pipeline(items.clone(), turns, adapter);

    Harness {
        orchestrator: ScenarioOrchestrator::new(registry, pipeline),
        items,
        client,
    }
}

fn terminal(content: &str) -> ChatCompletion {
    ChatCompletion {
        id: Some("r1".to_string()),
        model: Some("m".to_string()),
        content: Some(content.to_string()),
        finish_reason: Some("stop".to_string()),
        usage: Some(TokenUsage {
            input_tokens: 12,
            output_tokens: 3,
            total_tokens: 15,
        }),
        ..ChatCompletion::default()
    }
}

const ECHO_YAML: &str = r#"
name: echo
validModels: [m]
stages:
  - id: 1
    name: greet
    userPrompts:
      - template: "Hello {{sessionId}}"
"#;

#[tokio::test]
async fn test_single_stage_echo() {
    let h = harness(ECHO_YAML, vec![terminal("hi")], FunctionRegistry::new()).await;

    let results = h
        .orchestrator
        .execute_scenario("sess-1", "echo", &CancellationToken::new())
        .await
        .expect("execute");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].len(), 1);
    let result = &results[0][0];
    assert_eq!(result.content, "hi");
    assert_eq!(result.user_prompt.content, "Hello sess-1");
    assert_eq!(result.metadata.id.as_deref(), Some("r1"));

    assert_eq!(h.item("stage:1-1:output").await, Some(json!("hi")));
    assert_eq!(
        h.item("stage:1-1:metadata:output_model").await,
        Some(json!("m"))
    );
    assert_eq!(
        h.item("stage:1-1:input:user_prompt").await,
        Some(json!("Hello sess-1"))
    );
}

const SUM_YAML: &str = r#"
name: calculator
validModels: [m]
stages:
  - id: 1
    name: compute
    userPrompts:
      - template: "add 2 and 3"
    functions:
      functions:
        - name: sum
          description: Add two numbers
          parameters: '{"type":"object","properties":{"a":{"type":"integer"},"b":{"type":"integer"}},"required":["a","b"]}'
"#;

#[tokio::test]
async fn test_tool_call_round_trip() {
    let functions = FunctionRegistry::new();
    functions
        .register_fn("sum", |args| {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
            Ok((a + b).to_string())
        })
        .expect("register");

    let tool_round = ChatCompletion {
        tool_calls: vec![ToolCallRequest {
            id: "call_1".to_string(),
            name: "sum".to_string(),
            arguments: r#"{"a":2,"b":3}"#.to_string(),
        }],
        finish_reason: Some("tool_calls".to_string()),
        ..ChatCompletion::default()
    };
    let h = harness(
        SUM_YAML,
        vec![tool_round, terminal("the answer is 5")],
        functions,
    )
    .await;

    let results = h
        .orchestrator
        .execute_scenario("sess-1", "calculator", &CancellationToken::new())
        .await
        .expect("execute");

    let result = &results[0][0];
    assert_eq!(result.content, "the answer is 5");
    assert_eq!(result.metadata.tool_calls.len(), 1);
    let audit = &result.metadata.tool_calls[0];
    assert_eq!(audit.arguments, json!({"a":2,"b":3}));
    assert_eq!(audit.result, "5");

    let stored = h
        .item("stage:1-1:tool:sum:call_1")
        .await
        .expect("tool audit entry");
    assert_eq!(stored["functionName"], json!("sum"));
    assert_eq!(stored["result"], json!("5"));
}

const CROSS_STAGE_YAML: &str = r#"
name: chained
validModels: [m]
stages:
  - id: 1
    name: produce
    userPrompts:
      - template: "give JSON {x:1}"
  - id: 2
    name: consume
    userPrompts:
      - template: "echo {{1-1:output:x}}"
"#;

#[tokio::test]
async fn test_cross_stage_reference() {
    let h = harness(
        CROSS_STAGE_YAML,
        vec![terminal(r#"{"x":1}"#), terminal("got it")],
        FunctionRegistry::new(),
    )
    .await;

    let results = h
        .orchestrator
        .execute_scenario("sess-1", "chained", &CancellationToken::new())
        .await
        .expect("execute");

    assert_eq!(results.len(), 2);
    assert_eq!(results[1][0].user_prompt.content, "echo 1");

    // The literal JSON braces of stage 1 were sent untouched.
    let requests = h.client.requests();
    assert_eq!(
        requests[0].messages[0].content.as_deref(),
        Some("give JSON {x:1}")
    );
}

const UNRESOLVED_YAML: &str = r#"
name: broken
validModels: [m]
stages:
  - id: 1
    name: greet
    userPrompts:
      - template: "Hi {{nope}}"
"#;

#[tokio::test]
async fn test_unresolved_placeholder_fails_before_any_provider_call() {
    let h = harness(UNRESOLVED_YAML, vec![terminal("never")], FunctionRegistry::new()).await;

    let result = h
        .orchestrator
        .execute_scenario("sess-1", "broken", &CancellationToken::new())
        .await;

    match result {
        Err(OrchestratorError::Stage { source, .. }) => {
            assert!(matches!(
                source,
                PipelineError::UnresolvedPlaceholder { marker, .. } if marker == "{{nope}}"
            ));
        }
        other => panic!("expected stage failure, got {:?}", other.err()),
    }
    assert!(h.client.requests().is_empty());
    assert_eq!(h.item("stage:1-1:output").await, None);
}

#[tokio::test]
async fn test_unknown_tool_aborts_without_an_audit_entry() {
    let tool_round = ChatCompletion {
        tool_calls: vec![ToolCallRequest {
            id: "call_1".to_string(),
            name: "unknown_fn".to_string(),
            arguments: "{}".to_string(),
        }],
        ..ChatCompletion::default()
    };
    let h = harness(
        ECHO_YAML,
        vec![tool_round, terminal("never")],
        FunctionRegistry::new(),
    )
    .await;

    let result = h
        .orchestrator
        .execute_scenario("sess-1", "echo", &CancellationToken::new())
        .await;

    match result {
        Err(OrchestratorError::Stage { source, .. }) => {
            assert!(matches!(
                source,
                PipelineError::Adapter(AdapterError::ToolMissing(name)) if name == "unknown_fn"
            ));
        }
        other => panic!("expected stage failure, got {:?}", other.err()),
    }
    assert_eq!(h.item("stage:1-1:tool:unknown_fn:call_1").await, None);
    assert_eq!(h.item("stage:1-1:output").await, None);
}

const TWO_TURN_YAML: &str = r#"
name: pair
validModels: [m]
stages:
  - id: 1
    name: both
    systemPrompt: Be terse.
    userPrompts:
      - template: "first"
      - template: "second"
"#;

#[tokio::test]
async fn test_result_shape_matches_stage_and_turn_counts() {
    let h = harness(
        TWO_TURN_YAML,
        vec![terminal("one"), terminal("two")],
        FunctionRegistry::new(),
    )
    .await;

    let results = h
        .orchestrator
        .execute_scenario("sess-1", "pair", &CancellationToken::new())
        .await
        .expect("execute");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].len(), 2);
    // Second turn persists under its own turn index.
    assert_eq!(h.item("stage:1-1:output").await, Some(json!("one")));
    assert_eq!(h.item("stage:1-2:output").await, Some(json!("two")));
    // history_depth distinguishes the turns on the request side.
    assert_eq!(
        h.item("stage:1-1:input:params:history_depth").await,
        Some(json!("0"))
    );
    assert_eq!(
        h.item("stage:1-2:input:params:history_depth").await,
        Some(json!("1"))
    );
}

#[tokio::test]
async fn test_execute_stage_runs_one_stage_by_id() {
    let h = harness(
        CROSS_STAGE_YAML,
        vec![terminal(r#"{"x":1}"#)],
        FunctionRegistry::new(),
    )
    .await;

    let results = h
        .orchestrator
        .execute_stage("sess-1", "chained", 1, &CancellationToken::new())
        .await
        .expect("execute stage");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, r#"{"x":1}"#);

    let missing = h
        .orchestrator
        .execute_stage("sess-1", "chained", 9, &CancellationToken::new())
        .await;
    assert!(matches!(
        missing,
        Err(OrchestratorError::StageNotFound { stage_id: 9, .. })
    ));
}

#[tokio::test]
async fn test_unknown_scenario_is_not_found() {
    let h = harness(ECHO_YAML, Vec::new(), FunctionRegistry::new()).await;

    let result = h
        .orchestrator
        .execute_scenario("sess-1", "missing", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(OrchestratorError::ScenarioNotFound(_))));
}

#[tokio::test]
async fn test_cancelled_run_issues_no_provider_calls() {
    let h = harness(ECHO_YAML, vec![terminal("never")], FunctionRegistry::new()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = h
        .orchestrator
        .execute_scenario("sess-1", "echo", &cancel)
        .await;

    match result {
        Err(OrchestratorError::Stage { source, .. }) => {
            assert!(matches!(source, PipelineError::Cancelled));
        }
        other => panic!("expected cancelled stage, got {:?}", other.err()),
    }
    assert!(h.client.requests().is_empty());
    assert_eq!(h.item("stage:1-1:output").await, None);
}
