//! Stream client
//!
//! Turns "which stream" into a [`StreamRequest`], snapshots the registered
//! handlers and hands both to a [`ConnectionSupervisor`] running in the
//! background.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use tweetstream_core::{
    DeletionEvent, DirectMessageEvent, EventKind, FriendsListEvent, GenericEvent, LimitEvent,
    StatusEvent,
};

use crate::auth::Credentials;
use crate::backoff::BackoffPolicy;
use crate::config::{Framing, StreamConfig};
use crate::dispatch::{
    ConnectedHandler, Dispatcher, ErrorHandler, EventHandler, Handlers, ReconnectHandler,
};
use crate::error::{Result, StreamClientError, StreamError};
use crate::request::{FilterParams, Method, StreamParams, StreamRequest};
use crate::streaming::{ConnectionSupervisor, StopHandle, StreamHandle, SupervisorState};
use crate::transport::{HttpTransport, Transport};

/// The stream currently owned by a client
struct ActiveStream {
    stop: StopHandle,
    state: watch::Receiver<SupervisorState>,
}

impl ActiveStream {
    fn is_running(&self) -> bool {
        !self.stop.is_stopped() && !self.state.borrow().is_terminal()
    }
}

/// Client for the streaming API
///
/// Runs at most one stream at a time. Handlers registered on the client are
/// copied when a stream starts; later registrations apply to the next stream.
pub struct StreamClient {
    config: StreamConfig,
    credentials: Option<Credentials>,
    transport: Arc<dyn Transport>,
    handlers: Handlers,
    active: Mutex<Option<ActiveStream>>,
}

impl StreamClient {
    /// Create a client talking HTTP(S) to the configured hosts
    ///
    /// Credentials are validated here; invalid credentials never reach the
    /// network.
    pub fn new(config: StreamConfig, credentials: impl Into<Option<Credentials>>) -> Result<Self> {
        let credentials = credentials.into();
        if let Some(credentials) = &credentials {
            credentials.validate()?;
        }
        let transport = HttpTransport::new(&config, credentials.clone())?;
        Ok(Self::build(config, credentials, Arc::new(transport)))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(
        config: StreamConfig,
        credentials: impl Into<Option<Credentials>>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let credentials = credentials.into();
        if let Some(credentials) = &credentials {
            credentials.validate()?;
        }
        Ok(Self::build(config, credentials, transport))
    }

    fn build(
        config: StreamConfig,
        credentials: Option<Credentials>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            handlers: Handlers::new(),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    // =========================================================================
    // Handler registration
    // =========================================================================

    pub fn on_status<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.handlers.on_status(f);
        self
    }

    pub fn on_direct_message<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&DirectMessageEvent) + Send + Sync + 'static,
    {
        self.handlers.on_direct_message(f);
        self
    }

    pub fn on_event<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&GenericEvent) + Send + Sync + 'static,
    {
        self.handlers.on_event(f);
        self
    }

    pub fn on_friends_list<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&FriendsListEvent) + Send + Sync + 'static,
    {
        self.handlers.on_friends_list(f);
        self
    }

    pub fn on_deletion<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&DeletionEvent) + Send + Sync + 'static,
    {
        self.handlers.on_deletion(f);
        self
    }

    pub fn on_limit<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&LimitEvent) + Send + Sync + 'static,
    {
        self.handlers.on_limit(f);
        self
    }

    pub fn on_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.handlers.on_error(f);
        self
    }

    pub fn on_connected<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handlers.on_connected(f);
        self
    }

    pub fn on_reconnect<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(std::time::Duration, u32) + Send + Sync + 'static,
    {
        self.handlers.on_reconnect(f);
        self
    }

    /// Register a raw handler for `kind`, replacing any previous one
    pub fn register(&mut self, kind: EventKind, handler: EventHandler) -> &mut Self {
        self.handlers.register(kind, handler);
        self
    }

    /// Currently registered handler for `kind`
    pub fn handler(&self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.handler(kind)
    }

    pub fn error_handler(&self) -> Option<ErrorHandler> {
        self.handlers.error_handler()
    }

    pub fn connected_handler(&self) -> Option<ConnectedHandler> {
        self.handlers.connected_handler()
    }

    pub fn reconnect_handler(&self) -> Option<ReconnectHandler> {
        self.handlers.reconnect_handler()
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    // =========================================================================
    // Stream operations
    // =========================================================================

    /// Random sample of all public statuses
    pub fn sample(&self) -> Result<StreamHandle> {
        self.start(self.public_request(Method::Get, "sample", &StreamParams::new()), &Handlers::new())
    }

    /// All public statuses (privileged access)
    pub fn firehose(&self) -> Result<StreamHandle> {
        self.start(self.public_request(Method::Get, "firehose", &StreamParams::new()), &Handlers::new())
    }

    /// All retweets (privileged access)
    pub fn retweet(&self) -> Result<StreamHandle> {
        self.start(self.public_request(Method::Get, "retweet", &StreamParams::new()), &Handlers::new())
    }

    /// Public statuses matching any of the filter dimensions
    ///
    /// An empty filter is forwarded unchanged; the server decides.
    pub fn filter(&self, filter: &FilterParams, params: &StreamParams) -> Result<StreamHandle> {
        if filter.is_empty() {
            warn!("starting filter stream without track, follow or locations");
        }
        let request = self
            .public_request(Method::Post, "filter", params)
            .with_params(filter.to_params());
        self.start(request, &Handlers::new())
    }

    /// Statuses containing any of `keywords`
    pub fn track<I, S>(&self, keywords: I) -> Result<StreamHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter(&FilterParams::new().track(keywords), &StreamParams::new())
    }

    /// Statuses by or about the given users
    pub fn follow<I>(&self, user_ids: I) -> Result<StreamHandle>
    where
        I: IntoIterator<Item = u64>,
    {
        self.filter(&FilterParams::new().follow(user_ids), &StreamParams::new())
    }

    /// Statuses inside the given bounding box corners
    pub fn locations<I>(&self, points: I) -> Result<StreamHandle>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        self.filter(&FilterParams::new().locations(points), &StreamParams::new())
    }

    /// Events for the authenticated user; requires OAuth credentials
    pub fn user_stream(&self, params: &StreamParams) -> Result<StreamHandle> {
        if !self.credentials.as_ref().is_some_and(Credentials::is_oauth) {
            return Err(StreamClientError::InvalidAuthMode {
                operation: "user_stream",
            });
        }

        let request = self.request(
            Method::Get,
            &self.config.user_stream_host,
            "user",
            params,
        );
        self.start(request, &Handlers::new())
    }

    /// Request for a `statuses/<endpoint>` stream on the public stream host
    pub fn public_request(
        &self,
        method: Method,
        endpoint: &str,
        params: &StreamParams,
    ) -> StreamRequest {
        self.request(
            method,
            &self.config.stream_host,
            &format!("statuses/{}", endpoint),
            params,
        )
    }

    fn request(
        &self,
        method: Method,
        host: &str,
        endpoint: &str,
        params: &StreamParams,
    ) -> StreamRequest {
        let path = format!("/{}/{}.json", self.config.api_version, endpoint);
        let mut params = params.clone();
        if self.config.framing == Framing::Length {
            params.delimited = true;
        }

        let framing = if params.delimited {
            Framing::Length
        } else {
            Framing::Newline
        };

        StreamRequest::new(method, self.config.scheme.clone(), host, path)
            .with_params(params.to_params())
            .with_framing(framing)
    }

    /// Start streaming `request` in the background
    ///
    /// Handlers in `overrides` take precedence over the client's own for
    /// this stream. Fails if another stream from this client is still
    /// running, or if called outside a tokio runtime.
    #[instrument(skip(self, overrides), fields(host = %request.host, path = %request.path))]
    pub fn start(&self, request: StreamRequest, overrides: &Handlers) -> Result<StreamHandle> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(StreamClientError::InvalidRequest(
                "streams must be started inside a tokio runtime".to_string(),
            ));
        }

        let mut active = self.active.lock();
        if active.as_ref().is_some_and(ActiveStream::is_running) {
            return Err(StreamClientError::InvalidRequest(
                "a stream is already running on this client".to_string(),
            ));
        }

        let supervisor = ConnectionSupervisor::new(
            self.transport.clone(),
            request,
            Dispatcher::new(self.handlers.merged(overrides)),
            BackoffPolicy::new(self.config.backoff.clone()),
            self.config.idle_timeout(),
        );

        // Registered before spawning so a handler can stop its own stream
        *active = Some(ActiveStream {
            stop: supervisor.stop_handle(),
            state: supervisor.subscribe_state(),
        });
        info!("stream started");

        Ok(supervisor.spawn())
    }

    /// Stop the running stream
    ///
    /// Returns the most recently dispatched status, if any. Safe to call from
    /// inside a handler and when nothing is running.
    pub fn stop(&self) -> Option<StatusEvent> {
        let active = self.active.lock().take()?;
        active.stop.stop()
    }

    /// State of the current stream, or `Idle` if none was started
    pub fn state(&self) -> SupervisorState {
        self.active
            .lock()
            .as_ref()
            .map(|active| *active.state.borrow())
            .unwrap_or(SupervisorState::Idle)
    }
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("handlers", &self.handlers)
            .field("state", &self.state())
            .finish()
    }
}
