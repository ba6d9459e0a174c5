//! Connection supervisor
//!
//! Owns the lifecycle of one logical stream: connect, read, detect stalls
//! and drops, back off, reconnect, and give up once the retry budget is
//! spent. Messages are decoded, classified and dispatched strictly in
//! arrival order on the supervisor's own task.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};
use tweetstream_core::{classify, error::preview, RawMessage, StreamEvent};

use super::decoder::StreamDecoder;
use super::handle::{StopHandle, StreamHandle};
use super::types::SupervisorState;
use crate::backoff::BackoffPolicy;
use crate::dispatch::Dispatcher;
use crate::error::{Result, StreamClientError, StreamError, TransportError};
use crate::request::StreamRequest;
use crate::transport::{ByteStream, Transport};

/// Why a streaming connection ended
enum Disconnect {
    Stopped,
    Dropped(TransportError),
}

/// Drives one stream through connect / stream / reconnect
pub struct ConnectionSupervisor {
    transport: Arc<dyn Transport>,
    request: StreamRequest,
    dispatcher: Dispatcher,
    policy: BackoffPolicy,
    idle_timeout: Duration,
    stop: StopHandle,
    state: watch::Sender<SupervisorState>,
    attempts: Arc<AtomicU32>,
    /// Consecutive failed connections since the last successful one
    retries: u32,
}

impl ConnectionSupervisor {
    pub fn new(
        transport: Arc<dyn Transport>,
        request: StreamRequest,
        dispatcher: Dispatcher,
        policy: BackoffPolicy,
        idle_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self {
            transport,
            request,
            dispatcher,
            policy,
            idle_timeout,
            stop: StopHandle::new(),
            state,
            attempts: Arc::new(AtomicU32::new(0)),
            retries: 0,
        }
    }

    /// Use an existing stop signal instead of a fresh one
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Stop signal for this supervisor
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Watch channel of supervisor states
    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Run on a new tokio task
    pub fn spawn(self) -> StreamHandle {
        let stop = self.stop.clone();
        let state = self.state.subscribe();
        let attempts = self.attempts.clone();
        let task = tokio::spawn(self.run());
        StreamHandle::new(stop, state, attempts, task)
    }

    /// Run until stopped or until reconnects are exhausted
    pub async fn run(mut self) -> Result<()> {
        info!(
            host = %self.request.host,
            path = %self.request.path,
            "starting stream"
        );

        loop {
            if self.stop.is_stopped() {
                return Ok(self.finish_stopped());
            }

            self.transition(SupervisorState::Connecting);
            self.attempts.fetch_add(1, Ordering::SeqCst);

            let failure = match self.connect().await {
                None => return Ok(self.finish_stopped()),
                Some(Ok(stream)) => {
                    self.retries = 0;
                    self.transition(SupervisorState::Streaming);
                    self.dispatcher.connected();

                    match self.read(stream).await {
                        Disconnect::Stopped => return Ok(self.finish_stopped()),
                        Disconnect::Dropped(e) => e,
                    }
                }
                Some(Err(e)) => e,
            };

            warn!(error = %failure, retries = self.retries, "stream connection lost");

            if !self.policy.should_retry(self.retries) {
                return Err(self.finish_exhausted());
            }

            self.retries += 1;
            let delay = self.policy.delay(self.retries);
            self.transition(SupervisorState::Reconnecting);
            warn!(?delay, retries = self.retries, "reconnecting");
            self.dispatcher.reconnecting(delay, self.retries);

            tokio::select! {
                biased;
                _ = self.stop.stopped() => return Ok(self.finish_stopped()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Open the transport; `None` if stopped while waiting
    async fn connect(&self) -> Option<std::result::Result<ByteStream, TransportError>> {
        let open = tokio::time::timeout(self.idle_timeout, self.transport.open(&self.request));

        tokio::select! {
            biased;
            _ = self.stop.stopped() => None,
            opened = open => Some(match opened {
                Ok(result) => result,
                Err(_) => Err(TransportError::IdleTimeout(self.idle_timeout)),
            }),
        }
    }

    /// Read chunks until the connection drops, stalls, or a stop is requested
    async fn read(&self, mut stream: ByteStream) -> Disconnect {
        let mut decoder = StreamDecoder::new(self.request.framing);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.stop.stopped() => return Disconnect::Stopped,
                next = tokio::time::timeout(self.idle_timeout, stream.next()) => next,
            };

            let chunk = match next {
                Err(_) => return Disconnect::Dropped(TransportError::IdleTimeout(self.idle_timeout)),
                Ok(None) => return Disconnect::Dropped(TransportError::Closed),
                Ok(Some(Err(e))) => return Disconnect::Dropped(e),
                Ok(Some(Ok(chunk))) => chunk,
            };
            trace!(len = chunk.len(), "chunk received");

            for result in decoder.feed(&chunk) {
                if self.stop.is_stopped() {
                    return Disconnect::Stopped;
                }
                match result {
                    Ok(message) => self.handle_message(message),
                    Err(e) => self.dispatcher.report(StreamError::Decode(e)),
                }
            }

            if self.stop.is_stopped() {
                return Disconnect::Stopped;
            }
        }
    }

    fn handle_message(&self, message: RawMessage) {
        match classify(message) {
            Ok(event) => {
                if let StreamEvent::Status(status) = &event {
                    self.stop.record_status(status);
                }
                self.dispatcher.dispatch(&event);
            }
            Err(raw) => {
                let text = raw.to_string();
                debug!("unclassified message");
                self.dispatcher.report(StreamError::Unclassified(format!(
                    "no known shape matched: {}",
                    preview(text.as_bytes())
                )));
            }
        }
    }

    fn transition(&self, next: SupervisorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "supervisor state");
        }
    }

    fn finish_stopped(&self) {
        self.transition(SupervisorState::Stopped);
        info!("stream stopped");
    }

    fn finish_exhausted(&self) -> StreamClientError {
        self.transition(SupervisorState::Terminated);
        let timeout = self.policy.delay(self.retries.max(1));
        error!(retries = self.retries, ?timeout, "giving up on stream");
        StreamClientError::ReconnectExhausted {
            timeout,
            retries: self.retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffConfig;
    use crate::dispatch::Handlers;
    use crate::request::Method;
    use crate::testing::ScriptedTransport;
    use bytes::Bytes;
    use parking_lot::Mutex;

    fn request() -> StreamRequest {
        StreamRequest::new(Method::Get, "http", "stream.test", "/1.1/statuses/sample.json")
    }

    fn supervisor(
        transport: &ScriptedTransport,
        handlers: Handlers,
        max_retries: u32,
    ) -> ConnectionSupervisor {
        ConnectionSupervisor::new(
            Arc::new(transport.clone()),
            request(),
            Dispatcher::new(handlers),
            BackoffPolicy::new(BackoffConfig::immediate(max_retries)),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_terminates_after_max_retries() {
        let transport = ScriptedTransport::new();
        for _ in 0..10 {
            transport.fail(TransportError::Connect("refused".into()));
        }

        let handle = supervisor(&transport, Handlers::new(), 3).spawn();
        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, StreamClientError::ReconnectExhausted { retries: 3, .. }));
        // Initial attempt plus three retries, nothing after
        assert_eq!(transport.attempts(), 4);
    }

    #[tokio::test]
    async fn test_zero_retries_gives_up_after_first_failure() {
        let transport = ScriptedTransport::new();
        transport.fail(TransportError::Http {
            status: 503,
            message: "unavailable".into(),
        });

        let handle = supervisor(&transport, Handlers::new(), 0).spawn();
        assert!(handle.wait().await.is_err());
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_retries_reset_after_streaming() {
        let transport = ScriptedTransport::new();
        transport.fail(TransportError::Connect("a".into()));
        transport.fail(TransportError::Connect("b".into()));
        transport.stream(vec![Bytes::from_static(b"{\"limit\":{\"track\":1}}\n")]);
        transport.fail(TransportError::Connect("c".into()));
        transport.fail(TransportError::Connect("d".into()));

        let reconnects = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::new();
        let r = reconnects.clone();
        handlers.on_reconnect(move |_, retries| r.lock().push(retries));

        let handle = supervisor(&transport, handlers, 2).spawn();
        let err = handle.wait().await.unwrap_err();

        assert!(matches!(err, StreamClientError::ReconnectExhausted { retries: 2, .. }));
        // Two retries, success resets, stream closes, then two more retries
        assert_eq!(*reconnects.lock(), vec![1, 2, 1, 2]);
        assert_eq!(transport.attempts(), 5);
    }

    #[tokio::test]
    async fn test_idle_timeout_triggers_reconnect() {
        let transport = ScriptedTransport::new();
        transport.stream_then_hang(vec![Bytes::from_static(b"\r\n")]);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::new();
        let e = errors.clone();
        handlers.on_error(move |err| e.lock().push(err.to_string()));

        let handle = ConnectionSupervisor::new(
            Arc::new(transport.clone()),
            request(),
            Dispatcher::new(handlers),
            BackoffPolicy::new(BackoffConfig::immediate(0)),
            Duration::from_millis(50),
        )
        .spawn();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, StreamClientError::ReconnectExhausted { retries: 0, .. }));
        assert_eq!(transport.attempts(), 1);
        assert!(errors.lock().is_empty());
    }

    #[tokio::test]
    async fn test_decode_errors_do_not_reconnect() {
        let transport = ScriptedTransport::new();
        let feed = transport.channel();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::new();
        let s = seen.clone();
        handlers.on_error(move |err| s.lock().push(format!("error: {}", err)));
        let s = seen.clone();
        handlers.on_limit(move |limit| s.lock().push(format!("limit {:?}", limit.track())));

        let handle = supervisor(&transport, handlers, 5).spawn();
        feed.send(Bytes::from_static(b"{not json}\n{\"limit\":{\"track\":2}}\n{\"other\":1}\n"))
            .unwrap();

        assert!(
            crate::testing::wait_for(|| async { seen.lock().len() == 3 }, Duration::from_secs(2))
                .await
        );
        handle.stop();
        handle.wait().await.unwrap();

        let seen = seen.lock();
        assert!(seen[0].starts_with("error: Decode error"));
        assert_eq!(seen[1], "limit Some(2)");
        assert!(seen[2].starts_with("error: Unclassified message"));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_stop_from_handler_halts_remaining_messages() {
        let transport = ScriptedTransport::new();
        transport.stream_then_hang(vec![Bytes::from_static(
            b"{\"text\":\"one\",\"user\":{}}\n{\"text\":\"two\",\"user\":{}}\n",
        )]);

        let sup = supervisor(&transport, Handlers::new(), 5);
        let stop = sup.stop_handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut handlers = Handlers::new();
        let s = seen.clone();
        let stopper = stop.clone();
        handlers.on_status(move |status| {
            s.lock().push(status.text().to_string());
            stopper.stop();
        });
        let sup = ConnectionSupervisor {
            dispatcher: Dispatcher::new(handlers),
            ..sup
        };

        let handle = sup.spawn();
        handle.wait().await.unwrap();

        assert_eq!(*seen.lock(), vec!["one".to_string()]);
        assert_eq!(stop.last_status().unwrap().text(), "one");
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_stop_during_backoff_prevents_reconnect() {
        let transport = ScriptedTransport::new();
        transport.fail(TransportError::Connect("refused".into()));

        let sup = ConnectionSupervisor::new(
            Arc::new(transport.clone()),
            request(),
            Dispatcher::new(Handlers::new()),
            BackoffPolicy::new(BackoffConfig {
                base_delay_ms: 60_000,
                multiplier: 2.0,
                max_delay_ms: 60_000,
                max_retries: 10,
            }),
            Duration::from_secs(5),
        );
        let handle = sup.spawn();

        handle
            .wait_for_state(|s| s == SupervisorState::Reconnecting)
            .await;
        handle.stop();
        assert_eq!(
            handle.wait_for_state(|s| s.is_terminal()).await,
            SupervisorState::Stopped
        );
        handle.wait().await.unwrap();
        assert_eq!(transport.attempts(), 1);
    }
}
