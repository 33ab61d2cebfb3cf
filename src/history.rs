//! Conversation state, keyed by conversation identity.
//!
//! The store replaces a global mutable history map with an explicit
//! `get_or_create` interface backed by one mutex per conversation
//! identity, so concurrent turns on the same conversation serialize
//! instead of racing. Contexts live until process exit; memory per
//! conversation is bounded by history truncation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::agent::message::{ChatMessage, Role, assistant_message, user_message};

/// Number of non-system messages kept per conversation.
///
/// The system message plus the last ten turns, matching the token budget
/// the reasoning service is provisioned for.
const MAX_HISTORY_MESSAGES: usize = 10;

/// Identity of a conversation.
///
/// A pair of opaque session-scoping tokens from the chat surface, or the
/// sentinel default identity when the surface provides none.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationId {
    /// A channel/thread pair from the chat surface.
    Thread {
        /// Channel token.
        channel: String,
        /// Thread token.
        thread: String,
    },
    /// Sentinel identity used when no channel/thread is supplied.
    Default,
}

impl ConversationId {
    /// Builds an identity from optional channel and thread tokens.
    ///
    /// Both tokens must be present to form a thread identity; anything
    /// less collapses to [`ConversationId::Default`].
    #[must_use]
    pub fn new(channel: Option<&str>, thread: Option<&str>) -> Self {
        match (channel, thread) {
            (Some(channel), Some(thread)) => Self::Thread {
                channel: channel.to_string(),
                thread: thread.to_string(),
            },
            _ => Self::Default,
        }
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thread { channel, thread } => write!(f, "{channel}_{thread}"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// Mutable per-conversation state.
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
}

impl ConversationState {
    /// Appends a user message and truncates the history.
    pub fn push_user(&mut self, content: &str) {
        self.messages.push(user_message(content));
        self.truncate();
    }

    /// Appends an assistant message and truncates the history.
    pub fn push_assistant(&mut self, content: &str) {
        self.messages.push(assistant_message(content));
        self.truncate();
    }

    /// The ordered message history (most recent last).
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Keeps only the last [`MAX_HISTORY_MESSAGES`] messages.
    ///
    /// System messages are not stored here (each agent carries its own
    /// system prompt), so truncation is a plain tail window.
    fn truncate(&mut self) {
        if self.messages.len() > MAX_HISTORY_MESSAGES {
            let drop = self.messages.len() - MAX_HISTORY_MESSAGES;
            self.messages.drain(..drop);
        }
    }

    /// Number of user turns currently retained.
    #[must_use]
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .count()
    }
}

/// Read-only view of a conversation handed to concurrently running agents.
///
/// Specialists never write through this; derived state flows back through
/// the service layer after the batch completes, which removes the shared
/// mutable context hazard from the concurrent path.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    /// Display name of the person asking.
    pub display_name: String,
    /// Channel token, when the chat surface supplied one.
    pub channel: Option<String>,
    /// Thread token, when the chat surface supplied one.
    pub thread: Option<String>,
    /// Whether this is the first message of the conversation.
    pub first_interaction: bool,
    /// Message history up to and including the current user turn.
    pub history: Vec<ChatMessage>,
}

/// Process-lifetime store of conversation state.
///
/// `get_or_create` returns a per-conversation handle; holding its mutex
/// for the duration of a turn serializes concurrent turns on the same
/// identity.
#[derive(Debug, Default)]
pub struct ConversationStore {
    inner: Mutex<HashMap<ConversationId, Arc<Mutex<ConversationState>>>>,
}

impl ConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state handle for `id`, creating it on first use.
    ///
    /// The boolean is `true` when the conversation was just created
    /// (first interaction).
    pub async fn get_or_create(&self, id: &ConversationId) -> (Arc<Mutex<ConversationState>>, bool) {
        let mut map = self.inner.lock().await;
        if let Some(existing) = map.get(id) {
            return (Arc::clone(existing), false);
        }
        let state = Arc::new(Mutex::new(ConversationState::default()));
        map.insert(id.clone(), Arc::clone(&state));
        (state, true)
    }

    /// Number of live conversations.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the store holds no conversations.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
