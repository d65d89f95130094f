//! Normalized chat message and author records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paid membership tier attached to an author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier_id: String,
    pub tier_color: String,
    pub tier_name: String,
}

/// Sender of a chat message, stored inline with every message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Stable sender identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Avatar image references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Badge identifiers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,

    /// Membership tier, absent for viewers without a paid tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_info: Option<TierInfo>,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            images: Vec::new(),
            badges: Vec::new(),
            tier_info: None,
        }
    }
}

/// A single chat message with its playback offset resolved.
///
/// The record stays flat so the index and the on-disk export share one shape;
/// [`ChatMessage::payload`] gives the typed view of the `message_type`
/// discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique within one export
    pub message_id: String,

    /// Rendered display text
    pub message: String,

    /// Platform discriminator, kept verbatim
    pub message_type: String,

    /// Absolute send time as found in the export
    pub timestamp: i64,

    /// Offset from stream start, the synchronization key
    pub time_in_seconds: f64,

    /// Human-readable offset
    pub time_text: String,

    pub author: Author,

    /// Original platform payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,

    /// Local ingestion time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,

    /// Monetary value for tip messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_amount: Option<i64>,
}

/// Typed view over a message's type-specific payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePayload<'a> {
    /// Ordinary chat text
    Text { text: &'a str },

    /// Platform-generated event (joins, goal updates, ...)
    System { text: &'a str },

    /// Monetary tip with its amount
    Tip { text: &'a str, amount: i64 },

    /// Discriminator not recognized by this crate
    Other { message_type: &'a str, text: &'a str },
}

impl ChatMessage {
    /// Classify the message by its discriminator and tip amount
    pub fn payload(&self) -> MessagePayload<'_> {
        let text = self.message.as_str();
        let kind = self.message_type.to_ascii_lowercase();

        if let Some(amount) = self.tip_amount.filter(|amount| *amount > 0) {
            return MessagePayload::Tip { text, amount };
        }

        match kind.as_str() {
            "" | "chat" | "message" | "chat_message" | "text" => MessagePayload::Text { text },
            "system" | "event" | "system_message" | "notice" => MessagePayload::System { text },
            k if k.contains("tip") => MessagePayload::Tip { text, amount: 0 },
            _ => MessagePayload::Other {
                message_type: self.message_type.as_str(),
                text,
            },
        }
    }

    /// Whether this message carries a positive tip
    pub fn is_tip(&self) -> bool {
        matches!(self.payload(), MessagePayload::Tip { amount, .. } if amount > 0)
    }
}

/// Format a playback offset as `M:SS` or `H:MM:SS`
pub fn format_time_text(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let total = seconds.abs().floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}{}:{:02}:{:02}", sign, hours, minutes, secs)
    } else {
        format!("{}{}:{:02}", sign, minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(message_type: &str, tip_amount: Option<i64>) -> ChatMessage {
        ChatMessage {
            message_id: "m1".to_string(),
            message: "hello".to_string(),
            message_type: message_type.to_string(),
            timestamp: 0,
            time_in_seconds: 0.0,
            time_text: "0:00".to_string(),
            author: Author::new("a1", "viewer"),
            raw_data: None,
            received_at: None,
            tip_amount,
        }
    }

    #[test]
    fn test_payload_classification() {
        assert_eq!(message("chat", None).payload(), MessagePayload::Text { text: "hello" });
        assert_eq!(message("system", None).payload(), MessagePayload::System { text: "hello" });
        assert_eq!(
            message("chat", Some(500)).payload(),
            MessagePayload::Tip { text: "hello", amount: 500 }
        );
        assert_eq!(
            message("goal_update", None).payload(),
            MessagePayload::Other { message_type: "goal_update", text: "hello" }
        );
        assert!(!message("tip", None).is_tip());
    }

    #[test]
    fn test_time_text_formatting() {
        assert_eq!(format_time_text(0.0), "0:00");
        assert_eq!(format_time_text(65.9), "1:05");
        assert_eq!(format_time_text(3725.0), "1:02:05");
        assert_eq!(format_time_text(-4.0), "-0:04");
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let json = serde_json::to_string(&message("chat", None)).unwrap();
        assert!(!json.contains("raw_data"));
        assert!(!json.contains("tip_amount"));
        assert!(!json.contains("badges"));
    }
}
