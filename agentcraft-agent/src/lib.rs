//! # agentcraft agent
//!
//! The agent drives the model <-> tool loop:
//! 1. The user prompt becomes the first message of the conversation
//! 2. The model sees the conversation, the tool schemas and the system prompt
//! 3. Every tool call it makes runs through the registry inside the working root
//! 4. All results of one turn go back as a single message
//! 5. A turn without tool calls ends the loop with its text as the answer
//!
//! The loop is capped; a model that never stops calling tools ends in an
//! `IterationExhausted` error.

mod agent;
mod config;
mod prompt;

pub use agent::{Agent, AgentResult};
pub use config::AgentConfig;
pub use prompt::SYSTEM_PROMPT;
