//! # agentcraft runtime
//!
//! Everything the agent loop needs below the conversation: a sandbox rooted at
//! one working directory, the four tools that act inside it, and the model
//! backends that decide which tools to call.
//!
//! ## Core Concepts
//! - **PathGuard**: Resolves model-supplied relative paths and rejects anything outside the root
//! - **ToolGateway**: Listing, bounded reads, writes and time-limited script runs
//! - **ToolRegistry**: Tool schemas advertised to the model plus name-based dispatch
//! - **Message**: Provider-neutral conversation turns (text, tool calls, tool results)
//! - **Provider**: Trait-based LLM communication (Gemini, OpenAI-compatible)

pub mod gateway;
pub mod guard;
pub mod message;
pub mod provider;
pub mod registry;
pub mod schema;

pub use agentcraft_error::{Error, ErrorKind, ErrorStatus, Result};
pub use gateway::{format_output, GatewayLimits, ToolGateway, NO_OUTPUT};
pub use guard::PathGuard;
pub use message::{Conversation, Message, Part, Role, ToolCall, ToolOutcome, ToolResult};
pub use provider::{
    AnyProvider, CompletionRequest, CompletionResponse, GeminiProvider, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, ProviderType, Usage, UsageTracker,
};
pub use registry::{ToolInvocation, ToolKind, ToolRegistry};
pub use schema::{ParamSpec, ParamType, ToolSchema};
