//! Google Gemini provider implementation (`generateContent` REST API)

use super::*;
use crate::message::{Part, ToolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        self.config
            .default_model
            .as_deref()
            .unwrap_or("gemini-2.0-flash-001")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model().to_string());
        let api_request = GeminiRequest::from(&request);

        let mut req = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url(), model))
            .json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.header("x-goog-api-key", api_key);
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

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        api_response.into_completion(model)
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<&CompletionRequest> for GeminiRequest {
    fn from(request: &CompletionRequest) -> Self {
        let contents = request
            .messages
            .iter()
            .map(|m| GeminiContent {
                role: Some(plain_role(m.role).to_string()),
                parts: m.parts.iter().map(GeminiPart::from).collect(),
            })
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.to_string(),
                        description: t.description.clone(),
                        parameters: t.to_gemini_schema(),
                    })
                    .collect(),
            }])
        };

        Self {
            contents,
            system_instruction: request.system_instruction.as_ref().map(|s| GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(s.clone())],
            }),
            tools,
        }
    }
}

impl From<&Part> for GeminiPart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => GeminiPart::text(text.clone()),
            Part::FunctionCall(call) => GeminiPart {
                function_call: Some(GeminiFunctionCall {
                    name: call.name.clone(),
                    args: Some(call.args.clone()),
                }),
                ..Default::default()
            },
            Part::FunctionResponse(result) => GeminiPart {
                function_response: Some(GeminiFunctionResponse {
                    name: result.name.clone(),
                    response: result.outcome.to_payload(),
                }),
                ..Default::default()
            },
        }
    }
}

impl GeminiResponse {
    fn into_completion(self, requested_model: String) -> Result<CompletionResponse, ProviderError> {
        let candidate = match self.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                let reason = self
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                return Err(ProviderError::Other(format!("No candidates in response: {}", reason)));
            }
        };

        let mut parts = Vec::new();
        let mut call_index = 0;
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                parts.push(Part::Text(text));
            }
            if let Some(call) = part.function_call {
                // Gemini does not number its calls; ids only need to be unique per turn.
                let id = format!("call_{}", call_index);
                call_index += 1;
                parts.push(Part::FunctionCall(ToolCall::new(
                    id,
                    call.name,
                    call.args.unwrap_or_default(),
                )));
            }
        }

        let usage = self
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse::new(
            self.model_version.unwrap_or(requested_model),
            Message::model(parts),
        )
        .with_usage(usage))
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolResult;
    use crate::schema::{ParamSpec, ParamType};
    use serde_json::json;

    #[test]
    fn test_request_encoding() {
        let call = ToolCall::new("call_0", "get_file_content", {
            let mut args = Map::new();
            args.insert("file_path".into(), json!("main.py"));
            args
        });
        let request = CompletionRequest::new(vec![
            Message::user("what is in main.py?"),
            Message::model(vec![Part::FunctionCall(call.clone())]),
            Message::tool_results(vec![ToolResult::success(&call, "print(1)")]),
        ])
        .with_system_instruction("be brief")
        .with_tools(vec![ToolSchema::new("get_file_content", "Read a file").with_param(
            ParamSpec::required("file_path", ParamType::String, "path"),
        )]);

        let body = serde_json::to_value(GeminiRequest::from(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["name"], "get_file_content");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["args"]["file_path"], "main.py");
        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"],
            json!({ "result": "print(1)" })
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["parameters"]["type"],
            "OBJECT"
        );
    }

    #[test]
    fn test_response_decoding() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Checking." },
                        { "functionCall": { "name": "get_files_info", "args": { "directory": "pkg" } } },
                        { "functionCall": { "name": "get_file_content", "args": { "file_path": "main.py" } } }
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 7, "totalTokenCount": 19 },
            "modelVersion": "gemini-2.0-flash-001"
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("fallback".into()).unwrap();

        assert_eq!(completion.model, "gemini-2.0-flash-001");
        assert_eq!(completion.usage.total_tokens, 19);
        assert_eq!(completion.message.text().as_deref(), Some("Checking."));

        let calls = completion.message.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_0");
        assert_eq!(calls[0].args["directory"], "pkg");
        assert_eq!(calls[1].id, "call_1");
        assert_eq!(calls[1].name, "get_file_content");
    }

    #[test]
    fn test_call_without_args() {
        let raw = json!({
            "candidates": [{ "content": { "parts": [{ "functionCall": { "name": "get_files_info" } }] } }]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("m".into()).unwrap();
        assert!(completion.message.tool_calls()[0].args.is_empty());
        assert_eq!(completion.model, "m");
    }

    #[test]
    fn test_blocked_prompt() {
        let raw = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let err = response.into_completion("m".into()).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_candidate_without_content() {
        let raw = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("m".into()).unwrap();
        assert!(completion.message.parts.is_empty());
    }
}
