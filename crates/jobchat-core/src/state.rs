//! UI-agnostic conversation state types
//!
//! These types are owned by the [`ChatController`](crate::ChatController) and
//! read by whichever front end draws the chat screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::render::{render, RenderedText};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message in the conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub sender: ChatRole,
    pub content: RenderedText,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: ChatRole, text: &str) -> Self {
        Self {
            sender,
            content: render(text),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: &str) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::new(ChatRole::Assistant, text)
    }

    pub fn text(&self) -> String {
        self.content.to_plain()
    }
}

/// Append-only message list for one open chat screen.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
    /// Index of the assistant message currently being revealed, if any.
    streaming: Option<usize>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append an empty assistant message whose content will grow tick by tick.
    pub(crate) fn push_placeholder(&mut self) {
        self.messages.push(Message::assistant(""));
        self.streaming = Some(self.messages.len() - 1);
    }

    /// Replace the placeholder's content with a longer prefix of the reply.
    pub(crate) fn update_placeholder(&mut self, text: &str) {
        if let Some(message) = self.streaming.and_then(|idx| self.messages.get_mut(idx)) {
            message.content = render(text);
        }
    }

    /// Freeze the placeholder; after this it is as immutable as any other message.
    pub(crate) fn seal_placeholder(&mut self) {
        self.streaming = None;
    }

    pub fn streaming_index(&self) -> Option<usize> {
        self.streaming
    }
}

/// What the controller is doing with the current chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    /// Chat request in flight.
    AwaitingReply,
    /// Reply received and being revealed incrementally.
    Streaming,
}

/// Voice capture pipeline state, independent of [`TurnState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Transcribing,
}

/// Blocking notices that are shown to the user instead of being logged as messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    MicrophoneUnavailable,
    NoRecordedAudio,
}

impl Alert {
    pub fn message(&self) -> &'static str {
        match self {
            Alert::MicrophoneUnavailable => {
                "마이크 접근에 실패했습니다. 마이크 권한을 확인해주세요."
            }
            Alert::NoRecordedAudio => "녹음된 음성이 없습니다.",
        }
    }
}
