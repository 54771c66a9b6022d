//! Conversational agent playing the interviewer.
//!
//! This module provides:
//! * [`ConversationAgent`]: async trait: open a conversation, send turns,
//!   close it.
//! * [`ApiAgent`]: OpenAI-compatible chat-completions backend with an
//!   agent-side [`ConversationStore`].
//! * [`UnconfiguredAgent`]: placeholder that reports a [`ConfigError`]
//!   on every call.
//! * [`prompt`]: persona, seed and evaluation prompt text.
//!
//! [`ConfigError`]: crate::config::ConfigError

pub mod client;
pub mod history;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{AgentError, ApiAgent, ConversationAgent, ConversationHandle, UnconfiguredAgent};
pub use history::{ChatMessage, ConversationStore, Role};
pub use prompt::{seed_message, system_instruction, FEEDBACK_PROMPT};
