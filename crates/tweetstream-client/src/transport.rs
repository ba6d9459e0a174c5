//! Streaming transport
//!
//! A transport opens one long-lived response and hands back its body as a
//! stream of byte chunks. Dropping the stream closes the connection.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::auth::Credentials;
use crate::config::StreamConfig;
use crate::error::{Result, TransportError};
use crate::request::StreamRequest;

/// Body of an open stream
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, TransportError>> + Send>>;

/// Opens streaming connections
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open `request` and return its body once the response headers arrived
    async fn open(&self, request: &StreamRequest) -> std::result::Result<ByteStream, TransportError>;
}

/// HTTP(S) transport backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Build a transport from the client configuration
    ///
    /// No overall request timeout is set; stalls are detected by the
    /// supervisor's idle timer instead.
    pub fn new(config: &StreamConfig, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(host = %request.host, path = %request.path))]
    async fn open(&self, request: &StreamRequest) -> std::result::Result<ByteStream, TransportError> {
        let url = request
            .url()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(method = %request.method, %url, "opening stream");

        let mut builder = self.client.request(request.method.into(), url);

        if let Some(credentials) = &self.credentials {
            let header = credentials
                .authorization(request)
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            builder = builder.header(AUTHORIZATION, header);
        }

        if let Some(body) = request.body() {
            builder = builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Http { status, message });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from)),
        ))
    }
}
