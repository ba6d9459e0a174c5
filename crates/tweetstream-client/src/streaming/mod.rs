//! Streaming pipeline
//!
//! Bytes from the transport go through the [`StreamDecoder`], are classified
//! into [`StreamEvent`](tweetstream_core::StreamEvent)s and handed to the
//! registered handlers. The [`ConnectionSupervisor`] drives the whole thing
//! and reconnects with backoff when the connection drops or stalls.
//!
//! # Example
//!
//! ```no_run
//! use tweetstream_client::{Credentials, StreamClient, StreamConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = StreamClient::new(
//!     StreamConfig::default(),
//!     Credentials::basic("user", "secret"),
//! )?;
//!
//! client.on_status(|status| println!("{}", status.text()));
//!
//! let handle = client.sample()?;
//! tokio::signal::ctrl_c().await?;
//! handle.stop();
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```

mod decoder;
mod handle;
mod supervisor;
mod types;

pub use decoder::StreamDecoder;
pub use handle::{StopHandle, StreamHandle};
pub use supervisor::ConnectionSupervisor;
pub use types::SupervisorState;
