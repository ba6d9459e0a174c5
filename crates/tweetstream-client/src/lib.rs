//! tweetstream-client - Resilient client for newline-delimited JSON streams
//!
//! Holds one long-lived HTTP connection open, splits the body into JSON
//! messages, classifies each one and invokes the handler registered for its
//! kind. Dropped or stalled connections are re-established with exponential
//! backoff until the retry budget runs out.
//!
//! # Example
//!
//! ```rust,no_run
//! use tweetstream_client::{Credentials, FilterParams, StreamClient, StreamConfig, StreamParams};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = StreamClient::new(
//!         StreamConfig::default(),
//!         Credentials::oauth("consumer-key", "consumer-secret", "token", "token-secret"),
//!     )?;
//!
//!     client
//!         .on_status(|status| {
//!             let who = status.user().and_then(|u| u.screen_name().map(str::to_owned));
//!             println!("@{}: {}", who.unwrap_or_default(), status.text());
//!         })
//!         .on_error(|e| eprintln!("stream error: {}", e));
//!
//!     let handle = client.filter(
//!         &FilterParams::new().track(["rust", "tokio"]),
//!         &StreamParams::new().stall_warnings(),
//!     )?;
//!
//!     // Resolves with an error only if reconnects are exhausted
//!     handle.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a local HTTP server and a scripted
//! in-memory transport:
//!
//! ```rust,ignore
//! use tweetstream_client::testing::{ScriptedTransport, TestServer};
//!
//! let transport = ScriptedTransport::new();
//! transport.stream(vec![Bytes::from_static(b"{\"limit\":{\"track\":1}}\n")]);
//! let client = StreamClient::with_transport(config, None, Arc::new(transport.clone()))?;
//! ```

mod auth;
mod backoff;
mod client;
mod config;
mod dispatch;
mod error;
mod request;
pub mod streaming;
pub mod testing;
mod transport;

pub use auth::Credentials;
pub use backoff::BackoffPolicy;
pub use client::StreamClient;
pub use config::{BackoffConfig, Framing, StreamConfig};
pub use dispatch::{
    ConnectedHandler, Dispatcher, ErrorHandler, EventHandler, Handlers, ReconnectHandler,
};
pub use error::{Result, StreamClientError, StreamError, TransportError};
pub use request::{FilterParams, Method, StreamParams, StreamRequest};
pub use streaming::{StopHandle, StreamHandle, SupervisorState};
pub use transport::{ByteStream, HttpTransport, Transport};

// Re-export core types for convenience
pub use tweetstream_core::{
    classify, DecodeError, DeletionEvent, DirectMessageEvent, EventKind, FriendsListEvent,
    GenericEvent, LimitEvent, RawMessage, StatusEvent, StreamEvent, User,
};
