//! Inbound turn input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discriminator for an inbound activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A user message.
    Message,
    /// A named system or application event.
    Event,
    /// Members joined or left the conversation.
    ConversationUpdate,
    /// The channel ended the conversation.
    EndOfConversation,
    /// The user is typing.
    Typing,
}

/// One inbound turn's input.
///
/// The engine inspects only the type discriminator, the text and the
/// addressing fields. Everything else is left to recognizers and other
/// collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: Uuid,
    /// Activity type.
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Channel the activity arrived on.
    pub channel_id: String,
    /// Stable conversation identity.
    pub conversation_id: String,
    /// Stable identity of the sender.
    pub from_id: String,
    /// Message text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Event name for `Event` activities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// When the activity was produced.
    pub timestamp: DateTime<Utc>,
}

impl Activity {
    /// Creates a message activity.
    #[must_use]
    pub fn message(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        from_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type: ActivityType::Message,
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            from_id: from_id.into(),
            text: Some(text.into()),
            name: None,
            value: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a named event activity.
    #[must_use]
    pub fn event(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        from_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type: ActivityType::Event,
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            from_id: from_id.into(),
            text: None,
            name: Some(name.into()),
            value: None,
            timestamp: Utc::now(),
        }
    }

    /// Returns `true` for user messages.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.activity_type == ActivityType::Message
    }

    /// Message text with surrounding whitespace removed, if any.
    #[must_use]
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim)
    }
}
