//! Integration tests for the agent loop
//!
//! The model is replaced by a scripted provider that replays canned responses
//! and records every request it receives.

use agentcraft_agent::{Agent, AgentConfig, SYSTEM_PROMPT};
use agentcraft_error::ErrorKind;
use agentcraft_runtime::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, Part, ProviderError,
    ProviderType, Role, ToolCall, ToolOutcome, Usage,
};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Scripted provider
// ============================================================================

struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    /// Replayed once the script runs out
    repeat: Option<CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn repeating(response: CompletionResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(Vec::new())
        }
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| ProviderError::Other("script exhausted".into())),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn text(answer: &str) -> Result<CompletionResponse, ProviderError> {
    Ok(CompletionResponse::new(
        "scripted-model",
        Message::model(vec![Part::Text(answer.into())]),
    )
    .with_usage(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    }))
}

fn call(id: &str, name: &str, args: Value) -> Part {
    let args: Map<String, Value> = match args {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Part::FunctionCall(ToolCall::new(id, name, args))
}

fn calls(parts: Vec<Part>) -> CompletionResponse {
    CompletionResponse::new("scripted-model", Message::model(parts))
}

fn sandbox() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("main.py"), "print('hi')\n").unwrap();
    std::fs::create_dir(dir.path().join("pkg")).unwrap();
    dir
}

fn agent(provider: ScriptedProvider, root: &TempDir) -> Agent<ScriptedProvider> {
    let config = AgentConfig::new(ProviderType::Gemini, "test-key")
        .with_working_dir(root.path())
        .with_model("scripted-model");
    Agent::new(provider, config).unwrap()
}

fn outcomes(message: &Message) -> Vec<(String, ToolOutcome)> {
    message
        .tool_results_iter()
        .map(|r| (r.id.clone(), r.outcome.clone()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_final_answer_in_one_cycle() {
    let root = sandbox();
    let mut agent = agent(ScriptedProvider::new(vec![text("The answer is 42.")]), &root);

    let result = assert_ok!(agent.run("what is the answer?").await);

    assert_eq!(result.answer, "The answer is 42.");
    assert_eq!(result.iterations, 1);
    assert_eq!(result.conversation.len(), 2);
    assert_eq!(result.usage.total_calls, 1);
    assert_eq!(result.usage.total_tokens(), 15);
}

#[tokio::test]
async fn test_first_request_shape() {
    let root = sandbox();
    let mut agent = agent(ScriptedProvider::new(vec![text("done")]), &root);
    assert_ok!(agent.run("list the files").await);

    let requests = agent.provider().requests();
    assert_eq!(requests.len(), 1);

    let first = &requests[0];
    assert_eq!(first.messages.len(), 1);
    assert_eq!(first.messages[0].role, Role::User);
    assert_eq!(first.messages[0].text().as_deref(), Some("list the files"));
    assert_eq!(first.system_instruction.as_deref(), Some(SYSTEM_PROMPT));
    assert_eq!(first.model.as_deref(), Some("scripted-model"));

    let names: Vec<&str> = first.tools.iter().map(|t| t.name).collect();
    assert_eq!(
        names,
        vec!["get_files_info", "get_file_content", "run_python_file", "write_file"]
    );
    for tool in &first.tools {
        assert!(tool.params.iter().all(|p| p.name != "working_directory"));
    }
}

#[tokio::test]
async fn test_two_calls_keep_order_when_one_fails() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![
        Ok(calls(vec![
            call("call_0", "get_file_content", json!({ "file_path": "missing.py" })),
            call("call_1", "get_files_info", json!({ "directory": "." })),
        ])),
        text("main.py is the only script."),
    ]);
    let mut agent = agent(provider, &root);

    let result = assert_ok!(agent.run("what is here?").await);
    assert_eq!(result.answer, "main.py is the only script.");
    assert_eq!(result.iterations, 2);

    let messages = result.conversation.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].role, Role::Tool);

    let results = outcomes(&messages[2]);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "call_0");
    assert!(results[0].1.is_error());
    assert!(results[0].1.text().contains("does not exist"));
    assert_eq!(results[1].0, "call_1");
    assert!(!results[1].1.is_error());
    assert!(results[1].1.text().contains("- main.py: size=12, is_dir=false"));
    assert!(results[1].1.text().contains("- pkg: size="));

    // The second request carries the whole history.
    let requests = agent.provider().requests();
    assert_eq!(requests[1].messages.len(), 3);
}

#[tokio::test]
async fn test_unknown_tool_payload() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![
        Ok(calls(vec![call("call_0", "delete_everything", json!({}))])),
        text("sorry"),
    ]);
    let mut agent = agent(provider, &root);

    let result = assert_ok!(agent.run("clean up").await);
    let results = outcomes(&result.conversation.messages()[2]);

    assert_eq!(
        results[0].1.to_payload(),
        json!({ "error": "Unknown function: delete_everything" })
    );
}

#[tokio::test]
async fn test_escape_attempt_is_reported_to_model() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![
        Ok(calls(vec![call(
            "call_0",
            "get_file_content",
            json!({ "file_path": "../../etc/passwd", "working_directory": "/" }),
        )])),
        text("I cannot read that."),
    ]);
    let mut agent = agent(provider, &root);

    let result = assert_ok!(agent.run("show /etc/passwd").await);
    let results = outcomes(&result.conversation.messages()[2]);

    assert_eq!(
        results[0].1.text(),
        "Error: Cannot read \"../../etc/passwd\" as it is outside the permitted working directory"
    );
}

#[tokio::test]
async fn test_write_then_read_through_loop() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![
        Ok(calls(vec![call(
            "call_0",
            "write_file",
            json!({ "file_path": "pkg/new.txt", "content": "hello" }),
        )])),
        Ok(calls(vec![call(
            "call_0",
            "get_file_content",
            json!({ "file_path": "pkg/new.txt" }),
        )])),
        text("wrote it"),
    ]);
    let mut agent = agent(provider, &root);

    let result = assert_ok!(agent.run("write hello").await);
    assert_eq!(result.iterations, 3);

    let messages = result.conversation.messages();
    assert_eq!(
        outcomes(&messages[2])[0].1.text(),
        "Successfully wrote to \"pkg/new.txt\" (5 characters written)"
    );
    assert_eq!(outcomes(&messages[4])[0].1.text(), "hello");
    assert_eq!(std::fs::read_to_string(root.path().join("pkg/new.txt")).unwrap(), "hello");
}

#[tokio::test]
async fn test_iteration_cap() {
    let root = sandbox();
    let provider = ScriptedProvider::repeating(calls(vec![call(
        "call_0",
        "get_files_info",
        json!({}),
    )]));
    let mut agent = agent(provider, &root);

    let err = assert_err!(agent.run("loop forever").await);

    assert_eq!(err.kind(), ErrorKind::IterationExhausted);
    assert!(!err.is_recoverable());
    assert_eq!(agent.provider().requests().len(), 20);
}

#[tokio::test]
async fn test_custom_iteration_cap() {
    let root = sandbox();
    let provider = ScriptedProvider::repeating(calls(vec![call(
        "call_0",
        "get_files_info",
        json!({}),
    )]));
    let config = AgentConfig::new(ProviderType::Gemini, "test-key")
        .with_working_dir(root.path())
        .with_max_iterations(3);
    let mut agent = Agent::new(provider, config).unwrap();

    let err = assert_err!(agent.run("loop").await);
    assert_eq!(err.kind(), ErrorKind::IterationExhausted);
    assert_eq!(err.message(), "Reached maximum number of iterations (3)");
    assert_eq!(agent.provider().requests().len(), 3);
}

#[tokio::test]
async fn test_transport_error_aborts() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![
        Ok(calls(vec![call("call_0", "get_files_info", json!({}))])),
        Err(ProviderError::Network("connection refused".into())),
        text("never reached"),
    ]);
    let mut agent = agent(provider, &root);

    let err = assert_err!(agent.run("hello").await);

    assert_eq!(err.kind(), ErrorKind::TransportFailed);
    assert!(err.message().contains("connection refused"));
    assert_eq!(agent.provider().requests().len(), 2);
}

#[tokio::test]
async fn test_authentication_error() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![Err(ProviderError::AuthenticationFailed)]);
    let mut agent = agent(provider, &root);

    let err = assert_err!(agent.run("hello").await);
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
}

#[tokio::test]
async fn test_empty_final_response() {
    let root = sandbox();
    let provider = ScriptedProvider::new(vec![Ok(calls(Vec::new()))]);
    let mut agent = agent(provider, &root);

    let result = assert_ok!(agent.run("say nothing").await);
    assert_eq!(result.answer, "");
    assert_eq!(result.iterations, 1);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let root = sandbox();
    let config = AgentConfig::new(ProviderType::Gemini, "k")
        .with_working_dir(root.path())
        .with_max_iterations(0);

    match Agent::new(ScriptedProvider::new(Vec::new()), config) {
        Ok(_) => panic!("a zero iteration cap must be rejected"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::ConfigInvalid),
    }
}
