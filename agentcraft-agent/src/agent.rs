//! Agent implementation - orchestrates the model <-> tool loop

use crate::config::AgentConfig;
use crate::prompt::SYSTEM_PROMPT;
use agentcraft_error::{Error, ErrorKind, Result};
use agentcraft_runtime::{
    CompletionRequest, Conversation, LlmProvider, Message, PathGuard, ProviderError, ToolCall,
    ToolGateway, ToolRegistry, ToolResult, UsageTracker,
};
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Result from a finished run
#[derive(Debug)]
pub struct AgentResult {
    /// Text of the final model response
    pub answer: String,
    /// Model round trips it took, including the final one
    pub iterations: usize,
    /// Every message exchanged, starting with the user prompt
    pub conversation: Conversation,
    pub usage: UsageTracker,
}

/// The agent orchestrator - owns the conversation loop
pub struct Agent<P: LlmProvider> {
    provider: P,
    registry: ToolRegistry,
    gateway: ToolGateway,
    config: AgentConfig,
    usage: UsageTracker,
}

impl<P: LlmProvider> Agent<P> {
    /// Build an agent confined to `config.working_dir`
    pub fn new(provider: P, config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let guard = PathGuard::new(&config.working_dir)?;
        let gateway = ToolGateway::new(guard, config.gateway_limits());
        let registry = ToolRegistry::new(config.max_file_chars);

        tracing::debug!(
            provider = provider.name(),
            model = %config.model,
            root = %gateway.root().display(),
            "agent ready"
        );

        Ok(Self {
            provider,
            registry,
            gateway,
            config,
            usage: UsageTracker::new(),
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn gateway(&self) -> &ToolGateway {
        &self.gateway
    }

    /// Usage accumulated over every run of this agent
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Run one prompt until the model answers without calling tools.
    ///
    /// Tool failures are fed back to the model. Provider failures and hitting
    /// the iteration cap end the run with an error.
    pub async fn run(&mut self, prompt: &str) -> Result<AgentResult> {
        let verbose = self.config.verbose;
        if verbose {
            println!("User prompt: {}\n", prompt);
        }

        let mut conversation = Conversation::new(prompt);
        let tools = self.registry.schemas();

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!("Agent iteration {}", iteration);

            let request = CompletionRequest::new(conversation.messages().to_vec())
                .with_tools(tools.clone())
                .with_system_instruction(SYSTEM_PROMPT)
                .with_model(self.config.model.as_str());

            let response = self
                .provider
                .complete(request)
                .await
                .map_err(|e| provider_error(e, iteration))?;

            self.usage.track(&response.model, &response.usage);
            tracing::debug!(
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "model responded"
            );
            if verbose {
                println!("Prompt tokens: {}", response.usage.prompt_tokens);
                println!("Response tokens: {}", response.usage.completion_tokens);
            }

            let calls: Vec<ToolCall> = response.message.tool_calls().into_iter().cloned().collect();
            let text = response.message.text();
            conversation.push(response.message);

            if calls.is_empty() {
                return Ok(AgentResult {
                    answer: text.unwrap_or_default(),
                    iterations: iteration,
                    conversation,
                    usage: self.usage.clone(),
                });
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                results.push(self.call_tool(call).await);
            }
            conversation.push(Message::tool_results(results));
        }

        Err(Error::iteration_exhausted(self.config.max_iterations).with_operation("agent::run"))
    }

    /// Dispatch one call; a panicking tool becomes an error result
    async fn call_tool(&self, call: &ToolCall) -> ToolResult {
        println!("{}", call_banner(call, self.config.verbose));
        tracing::debug!(tool = %call.name, id = %call.id, "dispatching tool call");

        let result = catch_tool_panic(call, self.registry.dispatch(&self.gateway, call)).await;

        if self.config.verbose {
            println!("-> {}", result.outcome.to_payload());
        }
        result
    }
}

fn call_banner(call: &ToolCall, verbose: bool) -> String {
    if verbose {
        format!(" - Calling function: {}({})", call.name, call.args_json())
    } else {
        format!(" - Calling function: {}", call.name)
    }
}

/// Await a tool future, turning a panic inside it into an error result for `call`
async fn catch_tool_panic<F>(call: &ToolCall, dispatch: F) -> ToolResult
where
    F: Future<Output = ToolResult>,
{
    match AssertUnwindSafe(dispatch).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            tracing::error!(tool = %call.name, "tool panicked: {}", reason);
            ToolResult::error(call, format!("Error calling function {}: {}", call.name, reason))
        }
    }
}

/// Wrap a provider failure; the loop never retries
fn provider_error(err: ProviderError, iteration: usize) -> Error {
    let kind = match &err {
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::Parse(_) => ErrorKind::ResponseInvalid,
        _ => ErrorKind::TransportFailed,
    };
    Error::new(kind, format!("Model request failed: {}", err))
        .with_operation("agent::complete")
        .with_context("iteration", iteration.to_string())
        .set_source(err)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
