//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI, Azure OpenAI, vLLM, Ollama, and other OpenAI-compatible APIs.

use super::*;
use crate::message::{Part, ToolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or("https://api.openai.com/v1")
    }
}

impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("gpt-4o")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model());
        let api_request = OpenAIRequest::build(model, &request);

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url()))
            .json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text, retry_after));
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        api_response.into_completion()
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl OpenAIRequest {
    fn build(model: &str, request: &CompletionRequest) -> Self {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_instruction {
            messages.push(OpenAIMessage::plain("system", system.clone()));
        }
        for message in &request.messages {
            messages.extend(OpenAIMessage::expand(message));
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| OpenAITool {
                        r#type: "function".into(),
                        function: OpenAIFunction {
                            name: t.name.to_string(),
                            description: Some(t.description.clone()),
                            parameters: Some(t.to_json_schema()),
                        },
                    })
                    .collect(),
            )
        };

        Self {
            model: model.to_string(),
            messages,
            tools,
        }
    }
}

impl OpenAIMessage {
    fn plain(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// One conversation message can become several wire messages: OpenAI wants
    /// one `tool` message per result.
    fn expand(message: &Message) -> Vec<Self> {
        match message.role {
            Role::User => vec![Self::plain("user", message.text().unwrap_or_default())],
            Role::Model => {
                let calls: Vec<OpenAIToolCall> = message
                    .tool_calls()
                    .into_iter()
                    .map(|tc| OpenAIToolCall {
                        id: tc.id.clone(),
                        r#type: "function".into(),
                        function: OpenAIFunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.args_json(),
                        },
                    })
                    .collect();
                vec![Self {
                    role: "assistant".into(),
                    content: message.text(),
                    tool_calls: if calls.is_empty() { None } else { Some(calls) },
                    tool_call_id: None,
                }]
            }
            Role::Tool => message
                .tool_results_iter()
                .map(|result| Self {
                    role: "tool".into(),
                    content: Some(result.outcome.to_payload().to_string()),
                    tool_calls: None,
                    tool_call_id: Some(result.id.clone()),
                })
                .collect(),
        }
    }
}

impl OpenAIResponse {
    fn into_completion(self) -> Result<CompletionResponse, ProviderError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No choices in response".into()))?;

        let mut parts = Vec::new();
        if let Some(content) = choice.message.content.filter(|c| !c.is_empty()) {
            parts.push(Part::Text(content));
        }
        for tc in choice.message.tool_calls.unwrap_or_default() {
            let args = match serde_json::from_str::<Value>(&tc.function.arguments) {
                Ok(Value::Object(map)) => map,
                _ => {
                    tracing::warn!(
                        tool = %tc.function.name,
                        "tool call arguments are not a JSON object: {}",
                        tc.function.arguments
                    );
                    Map::new()
                }
            };
            parts.push(Part::FunctionCall(ToolCall::new(tc.id, tc.function.name, args)));
        }

        let usage = self
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse::new(self.model, Message::model(parts)).with_usage(usage))
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    r#type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}
