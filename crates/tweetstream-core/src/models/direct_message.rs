//! Direct message view

use crate::message::{id_field, RawMessage};
use crate::models::User;

/// A direct message notification (`direct_message` envelope)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectMessageEvent {
    raw: RawMessage,
}

message_view!(DirectMessageEvent);

impl DirectMessageEvent {
    /// The inner `direct_message` object
    pub fn message(&self) -> Option<RawMessage> {
        self.raw.child("direct_message")
    }

    /// Message id
    pub fn id(&self) -> Option<u64> {
        id_field(self.raw.get("direct_message"), "id")
    }

    /// Message text
    pub fn text(&self) -> Option<&str> {
        self.raw.pointer("/direct_message/text")?.as_str()
    }

    /// Sending user
    pub fn sender(&self) -> Option<User> {
        self.raw
            .pointer("/direct_message/sender")
            .cloned()
            .map(|v| User::new(v.into()))
    }

    /// Receiving user
    pub fn recipient(&self) -> Option<User> {
        self.raw
            .pointer("/direct_message/recipient")
            .cloned()
            .map(|v| User::new(v.into()))
    }
}
