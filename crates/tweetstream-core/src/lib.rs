//! tweetstream-core - Message model and classification for the streaming API
//!
//! Every message read from the persistent connection is decoded into a
//! [`RawMessage`], then classified into exactly one [`StreamEvent`] (or left
//! unclassified). The typed events are thin views over the raw message and
//! keep all original fields reachable.

pub mod classify;
pub mod error;
pub mod message;
pub mod models;

pub use classify::{classify, kind_of, EventKind, StreamEvent};
pub use error::{DecodeError, DecodeResult};
pub use message::RawMessage;
pub use models::*;
