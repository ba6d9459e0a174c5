//! Typed views over stream messages
//!
//! Each view wraps exactly one [`RawMessage`](crate::RawMessage) and adds no
//! state of its own. All original fields stay reachable through `Deref`.

/// Implements the shared plumbing of a message view
macro_rules! message_view {
    ($name:ident) => {
        impl $name {
            /// Wrap a raw message without checking its shape
            pub fn new(raw: $crate::message::RawMessage) -> Self {
                Self { raw }
            }

            /// The backing raw message
            pub fn raw(&self) -> &$crate::message::RawMessage {
                &self.raw
            }

            /// Unwrap into the backing raw message
            pub fn into_raw(self) -> $crate::message::RawMessage {
                self.raw
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::message::RawMessage;

            fn deref(&self) -> &Self::Target {
                &self.raw
            }
        }

        impl From<$crate::message::RawMessage> for $name {
            fn from(raw: $crate::message::RawMessage) -> Self {
                Self::new(raw)
            }
        }
    };
}

mod direct_message;
mod event;
mod notice;
mod status;
mod user;

pub use direct_message::DirectMessageEvent;
pub use event::{FriendsListEvent, GenericEvent};
pub use notice::{DeletionEvent, LimitEvent};
pub use status::StatusEvent;
pub use user::User;
