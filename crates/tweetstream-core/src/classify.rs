//! Event classification
//!
//! Messages are matched against an ordered rule list; the first matching
//! rule decides the kind. Order matters because a message can satisfy more
//! than one shape (a deletion notice that also carries `text` and `user`
//! is still a deletion).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::RawMessage;
use crate::models::{
    DeletionEvent, DirectMessageEvent, FriendsListEvent, GenericEvent, LimitEvent, StatusEvent,
};

/// Kinds of classified stream messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Deletion,
    Limit,
    FriendsList,
    Status,
    DirectMessage,
    Event,
}

impl EventKind {
    /// All kinds, in classification precedence order
    pub const ALL: [EventKind; 6] = [
        EventKind::Deletion,
        EventKind::Limit,
        EventKind::FriendsList,
        EventKind::Status,
        EventKind::DirectMessage,
        EventKind::Event,
    ];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deletion => "deletion",
            EventKind::Limit => "limit",
            EventKind::FriendsList => "friends_list",
            EventKind::Status => "status",
            EventKind::DirectMessage => "direct_message",
            EventKind::Event => "event",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Predicate = fn(&RawMessage) -> bool;

fn is_deletion(m: &RawMessage) -> bool {
    m.pointer("/delete/status").is_some()
}

fn is_limit(m: &RawMessage) -> bool {
    m.pointer("/limit/track").is_some()
}

fn is_friends_list(m: &RawMessage) -> bool {
    m.contains_key("friends")
}

fn is_status(m: &RawMessage) -> bool {
    m.contains_key("text") && m.contains_key("user")
}

fn is_direct_message(m: &RawMessage) -> bool {
    m.contains_key("direct_message")
}

fn is_event(m: &RawMessage) -> bool {
    m.contains_key("event")
}

/// Classification rules in precedence order
const RULES: [(EventKind, Predicate); 6] = [
    (EventKind::Deletion, is_deletion),
    (EventKind::Limit, is_limit),
    (EventKind::FriendsList, is_friends_list),
    (EventKind::Status, is_status),
    (EventKind::DirectMessage, is_direct_message),
    (EventKind::Event, is_event),
];

/// Determine the kind of a message without consuming it
///
/// Pure: the same message always yields the same answer. `None` means no
/// known shape matched.
pub fn kind_of(message: &RawMessage) -> Option<EventKind> {
    RULES
        .iter()
        .find(|(_, matches)| matches(message))
        .map(|(kind, _)| *kind)
}

/// Classify a message into its typed event
///
/// Returns the message back unchanged when it is unclassifiable.
pub fn classify(message: RawMessage) -> Result<StreamEvent, RawMessage> {
    match kind_of(&message) {
        Some(kind) => Ok(StreamEvent::from_kind(kind, message)),
        None => Err(message),
    }
}

/// A classified stream message
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Deletion(DeletionEvent),
    Limit(LimitEvent),
    FriendsList(FriendsListEvent),
    Status(StatusEvent),
    DirectMessage(DirectMessageEvent),
    Event(GenericEvent),
}

impl StreamEvent {
    /// Wrap `message` in the view for `kind`
    pub fn from_kind(kind: EventKind, message: RawMessage) -> Self {
        match kind {
            EventKind::Deletion => Self::Deletion(message.into()),
            EventKind::Limit => Self::Limit(message.into()),
            EventKind::FriendsList => Self::FriendsList(message.into()),
            EventKind::Status => Self::Status(message.into()),
            EventKind::DirectMessage => Self::DirectMessage(message.into()),
            EventKind::Event => Self::Event(message.into()),
        }
    }

    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Deletion(_) => EventKind::Deletion,
            Self::Limit(_) => EventKind::Limit,
            Self::FriendsList(_) => EventKind::FriendsList,
            Self::Status(_) => EventKind::Status,
            Self::DirectMessage(_) => EventKind::DirectMessage,
            Self::Event(_) => EventKind::Event,
        }
    }

    /// The backing raw message
    pub fn raw(&self) -> &RawMessage {
        match self {
            Self::Deletion(e) => e.raw(),
            Self::Limit(e) => e.raw(),
            Self::FriendsList(e) => e.raw(),
            Self::Status(e) => e.raw(),
            Self::DirectMessage(e) => e.raw(),
            Self::Event(e) => e.raw(),
        }
    }
}
