//! Command implementations for tweetstream

pub mod stream;

pub use stream::{stream, StreamTarget};
