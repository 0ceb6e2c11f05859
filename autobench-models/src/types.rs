//! Chat message types shared by the backends.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message setting context/behavior.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat history kept by a backend between calls.
///
/// Starts with an optional system message; each completed call appends the
/// user prompt and the assistant reply.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Mutex<Vec<ChatMessage>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all turns and start over from `system_prompt`.
    ///
    /// An empty system prompt leaves the history empty.
    pub fn reset(&self, system_prompt: &str) {
        let mut messages = self.lock();
        messages.clear();
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
    }

    /// The history followed by a new user turn, for sending.
    pub fn with_user_turn(&self, prompt: &str) -> Vec<ChatMessage> {
        let mut messages = self.lock().clone();
        messages.push(ChatMessage::user(prompt));
        messages
    }

    /// Append a completed exchange.
    pub fn record_exchange(&self, prompt: &str, response: &str) {
        let mut messages = self.lock();
        messages.push(ChatMessage::user(prompt));
        messages.push(ChatMessage::assistant(response));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChatMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
