//! Message Record domain types.
//!
//! A [`MessageRecord`] is one turn's contribution to a conversation's history:
//! the human-readable form as it was received or produced, the exact payload
//! replayed to the model, and the token cost of that payload. Records are
//! immutable once created; the context store trusts the cached cost forever.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier grouping messages into one independent context
/// (a channel, a thread, a DM).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message in the model-facing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions and provenance notes
    System,
    /// A conversation participant
    User,
    /// The agent's final answers
    Assistant,
    /// Output of a tool invocation (turn-scoped scaffolding)
    ToolResult,
}

/// One typed segment of multi-part content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { url: String },
}

/// Model-facing content: plain text or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Build content for a text with optional image attachments.
    ///
    /// Without images this is plain text; with images the text part comes
    /// first, followed by one image part per URL.
    pub fn with_images(text: impl Into<String>, images: &[String]) -> Self {
        let text = text.into();
        if images.is_empty() {
            return Self::Text(text);
        }
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(ContentPart::Text { text });
        parts.extend(images.iter().map(|url| ContentPart::Image { url: url.clone() }));
        Self::Parts(parts)
    }

    /// All text segments joined by newlines.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn image_count(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::Image { .. }))
                .count(),
        }
    }

    /// The same content with every image part removed.
    pub fn without_images(&self) -> Self {
        match self {
            Self::Text(_) => self.clone(),
            Self::Parts(_) => Self::Text(self.text()),
        }
    }
}

/// The exact structured payload replayed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: Role,

    pub content: MessageContent,

    /// The tool that produced this message (only for `ToolResult`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,

    /// The participant who authored this message (only for `User`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

impl ModelMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
            tool_name: None,
            author_id: None,
        }
    }

    pub fn user(content: MessageContent, author_id: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content,
            tool_name: None,
            author_id: Some(author_id.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
            tool_name: None,
            author_id: None,
        }
    }

    pub fn tool_result(tool_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: MessageContent::Text(payload.into()),
            tool_name: Some(tool_name.into()),
            author_id: None,
        }
    }
}

/// The human-readable side of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayContent {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    pub author_id: String,

    pub author_name: String,
}

impl DisplayContent {
    pub fn new(text: impl Into<String>, author_id: impl Into<String>, author_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
            author_id: author_id.into(),
            author_name: author_name.into(),
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// One stored contribution to a conversation's history.
///
/// Fields are private so the cached `token_cost` cannot drift from the
/// payload it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    conversation_id: ConversationId,
    display: DisplayContent,
    model: ModelMessage,
    token_cost: usize,
    created_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn new(
        conversation_id: ConversationId,
        display: DisplayContent,
        model: ModelMessage,
        token_cost: usize,
    ) -> Self {
        Self {
            conversation_id,
            display,
            model,
            token_cost,
            created_at: Utc::now(),
        }
    }

    /// Stamp the record with an explicit creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn display(&self) -> &DisplayContent {
        &self.display
    }

    pub fn model(&self) -> &ModelMessage {
        &self.model
    }

    pub fn role(&self) -> Role {
        self.model.role
    }

    pub fn token_cost(&self) -> usize {
        self.token_cost
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether images on this record are too old to be resent.
    pub fn is_stale(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        now - self.created_at > staleness
    }

    /// The model-facing message to send on this replay.
    ///
    /// Images older than `staleness` are replayed as text only.
    pub fn replay(&self, now: DateTime<Utc>, staleness: Duration) -> ModelMessage {
        if self.model.content.image_count() > 0 && self.is_stale(now, staleness) {
            ModelMessage {
                content: self.model.content.without_images(),
                ..self.model.clone()
            }
        } else {
            self.model.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_converts_from_owned_and_borrowed() {
        let owned: ConversationId = String::from("general").into();
        let borrowed: ConversationId = "general".into();
        assert_eq!(owned, borrowed);
        assert_eq!(owned.as_str(), "general");
        assert_eq!(ConversationId::from("dm-7").to_string(), "dm-7");
    }

    fn photo_record(created_at: DateTime<Utc>) -> MessageRecord {
        let images = vec!["https://cdn.example.com/cat.png".to_string()];
        MessageRecord::new(
            ConversationId::from("general"),
            DisplayContent::new("look at this", "42", "Alice").with_images(images.clone()),
            ModelMessage::user(MessageContent::with_images("look at this", &images), "42"),
            12,
        )
        .with_created_at(created_at)
    }

    #[test]
    fn text_without_images_stays_plain() {
        let content = MessageContent::with_images("hello", &[]);
        assert_eq!(content, MessageContent::Text("hello".into()));
        assert_eq!(content.image_count(), 0);
    }

    #[test]
    fn images_become_parts_after_text() {
        let content = MessageContent::with_images(
            "two pics",
            &["a.png".to_string(), "b.png".to_string()],
        );
        let MessageContent::Parts(parts) = &content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "two pics"));
        assert_eq!(content.image_count(), 2);
    }

    #[test]
    fn fresh_images_are_replayed() {
        let now = Utc::now();
        let record = photo_record(now - Duration::minutes(10));
        let replayed = record.replay(now, Duration::hours(3));
        assert_eq!(replayed.content.image_count(), 1);
    }

    #[test]
    fn stale_images_replay_as_text_only() {
        let now = Utc::now();
        let record = photo_record(now - Duration::hours(4));
        let replayed = record.replay(now, Duration::hours(3));
        assert_eq!(replayed.content, MessageContent::Text("look at this".into()));
        assert_eq!(replayed.author_id.as_deref(), Some("42"));
        // The cached cost is never recomputed.
        assert_eq!(record.token_cost(), 12);
    }

    #[test]
    fn tool_result_carries_tool_name() {
        let msg = ModelMessage::tool_result("get_weather_forecast", "{\"temp\":21}");
        assert_eq!(msg.role, Role::ToolResult);
        assert_eq!(msg.tool_name.as_deref(), Some("get_weather_forecast"));
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::ToolResult).unwrap();
        assert_eq!(json, "\"tool_result\"");
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = photo_record(Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        let back: MessageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
