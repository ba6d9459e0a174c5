//! Social events: friends lists and generic notifications

use serde_json::Value;

use crate::message::RawMessage;
use crate::models::User;

/// Friends list preamble sent at the start of a user stream
#[derive(Debug, Clone, PartialEq)]
pub struct FriendsListEvent {
    raw: RawMessage,
}

message_view!(FriendsListEvent);

impl FriendsListEvent {
    /// Ids of the followed users (non-integer entries are skipped)
    pub fn friends(&self) -> Vec<u64> {
        self.raw
            .get("friends")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default()
    }
}

/// Generic notification such as `follow` or `favorite`
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEvent {
    raw: RawMessage,
}

message_view!(GenericEvent);

impl GenericEvent {
    /// Event name (e.g. `"follow"`)
    pub fn name(&self) -> Option<&str> {
        self.raw.get_str("event")
    }

    /// User the event was aimed at
    pub fn target(&self) -> Option<User> {
        self.raw.child("target").map(User::new)
    }

    /// User who caused the event
    pub fn source(&self) -> Option<User> {
        self.raw.child("source").map(User::new)
    }

    /// Object the event refers to (a status for favorites, a list for list events)
    pub fn target_object(&self) -> Option<RawMessage> {
        self.raw.child("target_object")
    }
}
