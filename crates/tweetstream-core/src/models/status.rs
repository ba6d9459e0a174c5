//! Status (post) view

use crate::message::{id_field, RawMessage};
use crate::models::User;

/// A single post delivered on the stream
///
/// Classified from any message carrying both `text` and `user`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    raw: RawMessage,
}

message_view!(StatusEvent);

impl StatusEvent {
    /// Status id
    pub fn id(&self) -> Option<u64> {
        id_field(Some(self.raw.as_value()), "id")
    }

    /// Body text (empty if `text` is not a string)
    pub fn text(&self) -> &str {
        self.raw.get_str("text").unwrap_or_default()
    }

    /// Author of the status
    pub fn user(&self) -> Option<User> {
        self.raw.child("user").map(User::new)
    }

    /// Creation timestamp as sent by the server
    pub fn created_at(&self) -> Option<&str> {
        self.raw.get_str("created_at")
    }

    /// The status being retweeted, if this is a retweet
    pub fn retweeted_status(&self) -> Option<StatusEvent> {
        self.raw.child("retweeted_status").map(StatusEvent::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_accessors() {
        let status = StatusEvent::new(RawMessage::from(json!({
            "id": 99,
            "text": "hi",
            "user": {"screen_name": "a"},
            "lang": "en"
        })));
        assert_eq!(status.id(), Some(99));
        assert_eq!(status.text(), "hi");
        assert_eq!(status.user().unwrap().screen_name(), Some("a"));
        assert_eq!(status.get_str("lang"), Some("en"));
        assert!(status.retweeted_status().is_none());
    }

    #[test]
    fn test_retweet_is_a_status_view() {
        let status = StatusEvent::new(RawMessage::from(json!({
            "text": "RT @b: yo",
            "user": {"screen_name": "a"},
            "retweeted_status": {"text": "yo", "user": {"screen_name": "b"}}
        })));
        let original = status.retweeted_status().unwrap();
        assert_eq!(original.text(), "yo");
        assert_eq!(original.user().unwrap().screen_name(), Some("b"));
    }
}
