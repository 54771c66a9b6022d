//! Agent-side conversation store.
//!
//! The chat-completions API is stateless, so [`ApiAgent`](super::ApiAgent)
//! keeps every open conversation here, keyed by its
//! [`ConversationHandle`].  A turn is only committed once the model has
//! replied, so a failed request leaves the history exactly as it was.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::client::{AgentError, ConversationHandle};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Chat-completions message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of a conversation, serialised verbatim into the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationStore
// ---------------------------------------------------------------------------

/// Histories of all open conversations.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Mutex<HashMap<ConversationHandle, Vec<ChatMessage>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new conversation whose history starts with `system`.
    pub fn open(&self, system: &str) -> ConversationHandle {
        let handle = ConversationHandle::new();
        self.lock()
            .insert(handle, vec![ChatMessage::new(Role::System, system)]);
        handle
    }

    /// The history of `handle` followed by the pending `user` message.
    ///
    /// Nothing is stored; call [`commit`](Self::commit) once the reply is in.
    pub fn request_messages(
        &self,
        handle: ConversationHandle,
        user: &str,
    ) -> Result<Vec<ChatMessage>, AgentError> {
        let conversations = self.lock();
        let history = conversations
            .get(&handle)
            .ok_or(AgentError::UnknownConversation)?;
        let mut messages = history.clone();
        messages.push(ChatMessage::new(Role::User, user));
        Ok(messages)
    }

    /// Append a completed exchange.
    ///
    /// Fails when the conversation was closed while the request was in
    /// flight; the exchange is then dropped.
    pub fn commit(
        &self,
        handle: ConversationHandle,
        user: &str,
        reply: &str,
    ) -> Result<(), AgentError> {
        let mut conversations = self.lock();
        let history = conversations
            .get_mut(&handle)
            .ok_or(AgentError::UnknownConversation)?;
        history.push(ChatMessage::new(Role::User, user));
        history.push(ChatMessage::new(Role::Assistant, reply));
        Ok(())
    }

    /// Forget `handle`.  Returns `false` if it was not open.
    pub fn close(&self, handle: ConversationHandle) -> bool {
        self.lock().remove(&handle).is_some()
    }

    /// Number of messages stored for `handle`, system instruction included.
    pub fn len(&self, handle: ConversationHandle) -> Option<usize> {
        self.lock().get(&handle).map(Vec::len)
    }

    /// Number of open conversations.
    pub fn open_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationHandle, Vec<ChatMessage>>> {
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
