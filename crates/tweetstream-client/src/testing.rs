//! Test utilities for tweetstream-client
//!
//! [`TestServer`] serves scripted streaming responses over real HTTP.
//! [`ScriptedTransport`] skips the network entirely and replays a fixed
//! sequence of connection outcomes.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{BackoffConfig, StreamConfig};
use crate::error::{Result, TransportError};
use crate::request::StreamRequest;
use crate::transport::{ByteStream, Transport};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral local port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::get, Router};
    /// use tweetstream_client::testing::{chunked_body, TestServer};
    ///
    /// let router = Router::new().route(
    ///     "/1.1/statuses/sample.json",
    ///     get(|| async { chunked_body(vec!["{\"text\":\"hi\",\"user\":{}}\r\n"], false) }),
    /// );
    /// let server = TestServer::start(router).await?;
    /// let client = StreamClient::new(server.config(), None)?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing both stream hosts at this server
    ///
    /// Reconnects are immediate and give up after `max_retries`.
    pub fn config(&self, max_retries: u32) -> StreamConfig {
        StreamConfig {
            scheme: "http".to_string(),
            stream_host: self.addr.to_string(),
            user_stream_host: self.addr.to_string(),
            idle_timeout_secs: 1,
            connect_timeout_secs: 2,
            backoff: BackoffConfig::immediate(max_retries),
            ..StreamConfig::default()
        }
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Streaming response body sending `chunks` one by one
///
/// With `hold_open` the body never ends after the last chunk, like a quiet
/// but live connection.
pub fn chunked_body<I, C>(chunks: I, hold_open: bool) -> Body
where
    I: IntoIterator<Item = C>,
    C: Into<Bytes>,
{
    let chunks: Vec<Bytes> = chunks.into_iter().map(Into::into).collect();
    let body = async_stream::stream! {
        for chunk in chunks {
            yield Ok::<Bytes, Infallible>(chunk);
            tokio::task::yield_now().await;
        }
        if hold_open {
            std::future::pending::<()>().await;
        }
    };
    Body::from_stream(body)
}

/// How a scripted stream ends after its chunks
#[derive(Debug, Clone)]
pub enum StreamEnd {
    /// Server closes the connection
    Close,
    /// Body read fails
    Error(TransportError),
    /// Connection stays open without sending anything
    Hang,
}

/// One scripted connection outcome
#[derive(Debug)]
pub enum ScriptedConnection {
    /// Opening fails
    Fail(TransportError),
    /// Opening succeeds and the body replays fixed chunks
    Stream { chunks: Vec<Bytes>, end: StreamEnd },
    /// Opening succeeds and the body is fed from a channel; closes when the sender drops
    Channel(mpsc::UnboundedReceiver<Bytes>),
}

/// Transport replaying a queue of connection outcomes
///
/// Once the script runs out every further attempt fails with a connect error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<ScriptedConnection>>>,
    requests: Arc<Mutex<Vec<StreamRequest>>>,
    attempts: Arc<AtomicU32>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome
    pub fn push(&self, connection: ScriptedConnection) -> &Self {
        self.script.lock().push_back(connection);
        self
    }

    /// Queue a failed connection attempt
    pub fn fail(&self, error: TransportError) -> &Self {
        self.push(ScriptedConnection::Fail(error))
    }

    /// Queue a connection that sends `chunks` and then closes
    pub fn stream(&self, chunks: Vec<Bytes>) -> &Self {
        self.push(ScriptedConnection::Stream {
            chunks,
            end: StreamEnd::Close,
        })
    }

    /// Queue a connection that sends `chunks` and then goes silent
    pub fn stream_then_hang(&self, chunks: Vec<Bytes>) -> &Self {
        self.push(ScriptedConnection::Stream {
            chunks,
            end: StreamEnd::Hang,
        })
    }

    /// Queue a connection fed through the returned sender
    pub fn channel(&self) -> mpsc::UnboundedSender<Bytes> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(ScriptedConnection::Channel(rx));
        tx
    }

    /// Number of `open` calls so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every request passed to `open`, in order
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, request: &StreamRequest) -> std::result::Result<ByteStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let next = self.script.lock().pop_front();
        match next {
            None => Err(TransportError::Connect("script exhausted".to_string())),
            Some(ScriptedConnection::Fail(e)) => Err(e),
            Some(ScriptedConnection::Stream { chunks, end }) => {
                let body = stream::iter(chunks.into_iter().map(Ok::<Bytes, TransportError>));
                let stream: ByteStream = match end {
                    StreamEnd::Close => Box::pin(body),
                    StreamEnd::Error(e) => Box::pin(body.chain(stream::once(async move { Err(e) }))),
                    StreamEnd::Hang => Box::pin(body.chain(stream::pending())),
                };
                Ok(stream)
            }
            Some(ScriptedConnection::Channel(mut rx)) => {
                let body = async_stream::stream! {
                    while let Some(chunk) = rx.recv().await {
                        yield Ok::<Bytes, TransportError>(chunk);
                    }
                };
                Ok(Box::pin(body))
            }
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new();
        transport
            .fail(TransportError::Closed)
            .stream(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);

        let request = StreamRequest::new(
            crate::request::Method::Get,
            "http",
            "localhost",
            "/1.1/statuses/sample.json",
        );

        assert_eq!(transport.open(&request).await.err(), Some(TransportError::Closed));

        let chunks: Vec<_> = transport.open(&request).await.unwrap().collect().await;
        assert_eq!(
            chunks,
            vec![Ok(Bytes::from_static(b"a")), Ok(Bytes::from_static(b"b"))]
        );

        assert!(matches!(
            transport.open(&request).await.err(),
            Some(TransportError::Connect(_))
        ));
        assert_eq!(transport.attempts(), 3);
        assert_eq!(transport.requests().len(), 3);
    }
}
