//! User view

use crate::message::{id_field, RawMessage};

/// A user object embedded in a stream message
///
/// Only the common fields get accessors; everything else is available
/// through the raw message.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    raw: RawMessage,
}

message_view!(User);

impl User {
    /// Numeric user id
    pub fn id(&self) -> Option<u64> {
        id_field(Some(self.raw.as_value()), "id")
    }

    /// Handle without the leading `@`
    pub fn screen_name(&self) -> Option<&str> {
        self.raw.get_str("screen_name")
    }

    /// Display name
    pub fn name(&self) -> Option<&str> {
        self.raw.get_str("name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_fields() {
        let user = User::new(RawMessage::from(json!({
            "id": 12,
            "screen_name": "jack",
            "name": "Jack",
            "lang": "en"
        })));
        assert_eq!(user.id(), Some(12));
        assert_eq!(user.screen_name(), Some("jack"));
        assert_eq!(user.name(), Some("Jack"));
        assert_eq!(user.get_str("lang"), Some("en"));
    }
}
