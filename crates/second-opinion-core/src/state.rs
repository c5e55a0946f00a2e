//! UI-agnostic conversation state
//!
//! The log is shared by every presentation (tab view, split view, the one-shot
//! `ask` command) and doesn't depend on any UI framework. Only the
//! orchestrator appends to it; everything else reads.

use serde::{Deserialize, Serialize};

use crate::backend::Backend;

/// Identity of a message within one conversation. Ids grow in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message in the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: MessageId,
    role: ChatRole,
    text: String,
    backend: Backend,
    submission: MessageId,
    placeholder: bool,
}

impl ChatMessage {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// User messages carry the backend view that was active when they were sent.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Id of the user message that started this round.
    pub fn submission(&self) -> MessageId {
        self.submission
    }

    /// True for the synthesized message shown in place of a failed reply.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// Ordered, append-only sequence of messages for one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append_user(&mut self, text: String, backend: Backend) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(ChatMessage {
            id,
            role: ChatRole::User,
            text,
            backend,
            submission: id,
            placeholder: false,
        });
        id
    }

    pub(crate) fn append_assistant(
        &mut self,
        submission: MessageId,
        backend: Backend,
        text: String,
    ) -> MessageId {
        self.push_assistant(submission, backend, text, false)
    }

    pub(crate) fn append_placeholder(
        &mut self,
        submission: MessageId,
        backend: Backend,
        text: &str,
    ) -> MessageId {
        self.push_assistant(submission, backend, text.to_string(), true)
    }

    fn push_assistant(
        &mut self,
        submission: MessageId,
        backend: Backend,
        text: String,
        placeholder: bool,
    ) -> MessageId {
        let id = self.allocate_id();
        self.messages.push(ChatMessage {
            id,
            role: ChatRole::Assistant,
            text,
            backend,
            submission,
            placeholder,
        });
        id
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// All user messages plus the assistant messages tagged `backend`, in
    /// insertion order.
    pub fn visible(&self, backend: Backend) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User || m.backend == backend)
            .collect()
    }

    /// Assistant messages produced for one submission.
    pub fn replies_to(&self, submission: MessageId) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::Assistant && m.submission == submission)
            .collect()
    }
}
