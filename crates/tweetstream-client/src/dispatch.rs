//! Handler registry and dispatch
//!
//! At most one handler per event kind. Dispatching to a kind without a
//! handler does nothing. A panicking handler is contained at the dispatch
//! boundary and reported to the error handler, so the read loop keeps
//! running.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use tweetstream_core::{
    DeletionEvent, DirectMessageEvent, EventKind, FriendsListEvent, GenericEvent, LimitEvent,
    StatusEvent, StreamEvent,
};

use crate::error::StreamError;

/// Handler for a classified event
pub type EventHandler = Arc<dyn Fn(&StreamEvent) + Send + Sync>;
/// Handler for per-message errors
pub type ErrorHandler = Arc<dyn Fn(&StreamError) + Send + Sync>;
/// Handler fired once a connection is streaming
pub type ConnectedHandler = Arc<dyn Fn() + Send + Sync>;
/// Handler fired when a reconnect is scheduled: `(delay, retries)`
pub type ReconnectHandler = Arc<dyn Fn(Duration, u32) + Send + Sync>;

/// Wrap a typed callback so it only sees events of one variant
macro_rules! typed_handler {
    ($f:expr, $variant:ident) => {{
        let f = $f;
        let handler: EventHandler = Arc::new(move |event: &StreamEvent| {
            if let StreamEvent::$variant(inner) = event {
                f(inner)
            }
        });
        handler
    }};
}

/// The set of registered handlers
#[derive(Clone, Default)]
pub struct Handlers {
    events: HashMap<EventKind, EventHandler>,
    error: Option<ErrorHandler>,
    connected: Option<ConnectedHandler>,
    reconnect: Option<ReconnectHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`, replacing any previous one
    pub fn register(&mut self, kind: EventKind, handler: EventHandler) -> &mut Self {
        self.events.insert(kind, handler);
        self
    }

    /// Currently registered handler for `kind`
    pub fn handler(&self, kind: EventKind) -> Option<EventHandler> {
        self.events.get(&kind).cloned()
    }

    /// Remove the handler for `kind`
    pub fn unregister(&mut self, kind: EventKind) -> Option<EventHandler> {
        self.events.remove(&kind)
    }

    pub fn on_status<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.register(EventKind::Status, typed_handler!(f, Status))
    }

    pub fn on_direct_message<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&DirectMessageEvent) + Send + Sync + 'static,
    {
        self.register(EventKind::DirectMessage, typed_handler!(f, DirectMessage))
    }

    pub fn on_event<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&GenericEvent) + Send + Sync + 'static,
    {
        self.register(EventKind::Event, typed_handler!(f, Event))
    }

    pub fn on_friends_list<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&FriendsListEvent) + Send + Sync + 'static,
    {
        self.register(EventKind::FriendsList, typed_handler!(f, FriendsList))
    }

    pub fn on_deletion<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&DeletionEvent) + Send + Sync + 'static,
    {
        self.register(EventKind::Deletion, typed_handler!(f, Deletion))
    }

    pub fn on_limit<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&LimitEvent) + Send + Sync + 'static,
    {
        self.register(EventKind::Limit, typed_handler!(f, Limit))
    }

    pub fn on_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn on_connected<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.connected = Some(Arc::new(f));
        self
    }

    pub fn on_reconnect<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Duration, u32) + Send + Sync + 'static,
    {
        self.reconnect = Some(Arc::new(f));
        self
    }

    pub fn error_handler(&self) -> Option<ErrorHandler> {
        self.error.clone()
    }

    pub fn connected_handler(&self) -> Option<ConnectedHandler> {
        self.connected.clone()
    }

    pub fn reconnect_handler(&self) -> Option<ReconnectHandler> {
        self.reconnect.clone()
    }

    /// Combine with `overrides`; handlers present in `overrides` win
    pub fn merged(&self, overrides: &Handlers) -> Handlers {
        let mut events = self.events.clone();
        events.extend(
            overrides
                .events
                .iter()
                .map(|(kind, handler)| (*kind, handler.clone())),
        );

        Handlers {
            events,
            error: overrides.error.clone().or_else(|| self.error.clone()),
            connected: overrides.connected.clone().or_else(|| self.connected.clone()),
            reconnect: overrides.reconnect.clone().or_else(|| self.reconnect.clone()),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.events.keys().map(EventKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("Handlers")
            .field("events", &kinds)
            .field("error", &self.error.is_some())
            .field("connected", &self.connected.is_some())
            .field("reconnect", &self.reconnect.is_some())
            .finish()
    }
}

/// Invokes handlers for one running stream
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: Handlers,
}

impl Dispatcher {
    pub fn new(handlers: Handlers) -> Self {
        Self { handlers }
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// Invoke the handler for `event`'s kind, if any
    pub fn dispatch(&self, event: &StreamEvent) {
        let kind = event.kind();
        let Some(handler) = self.handlers.events.get(&kind) else {
            debug!(%kind, "no handler registered");
            return;
        };

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
            let message = panic_message(payload.as_ref());
            warn!(%kind, %message, "handler panicked");
            self.report(StreamError::handler_panicked(kind, message));
        }
    }

    /// Hand a per-message error to the error handler (dropped if none)
    pub fn report(&self, error: StreamError) {
        match &self.handlers.error {
            Some(handler) => {
                if panic::catch_unwind(AssertUnwindSafe(|| handler(&error))).is_err() {
                    warn!("error handler panicked");
                }
            }
            None => debug!(%error, "dropping stream error, no error handler"),
        }
    }

    /// Notify that a connection reached the streaming state
    pub fn connected(&self) {
        if let Some(handler) = &self.handlers.connected {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler())) {
                warn!(message = %panic_message(payload.as_ref()), "connected handler panicked");
            }
        }
    }

    /// Notify that a reconnect has been scheduled
    pub fn reconnecting(&self, delay: Duration, retries: u32) {
        if let Some(handler) = &self.handlers.reconnect {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(delay, retries))) {
                warn!(message = %panic_message(payload.as_ref()), "reconnect handler panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use tweetstream_core::{classify, RawMessage};

    fn event(value: serde_json::Value) -> StreamEvent {
        classify(RawMessage::from(value)).unwrap()
    }

    #[test]
    fn test_dispatch_to_matching_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::new();
        let s = seen.clone();
        handlers.on_status(move |status| s.lock().push(status.text().to_string()));
        let s = seen.clone();
        handlers.on_limit(move |limit| s.lock().push(format!("limit {:?}", limit.track())));

        let dispatcher = Dispatcher::new(handlers);
        dispatcher.dispatch(&event(json!({"text": "hi", "user": {}})));
        dispatcher.dispatch(&event(json!({"limit": {"track": 5}})));

        assert_eq!(*seen.lock(), vec!["hi".to_string(), "limit Some(5)".to_string()]);
    }

    #[test]
    fn test_unregistered_kind_is_noop() {
        let handlers = Handlers::new();
        let dispatcher = Dispatcher::new(handlers);
        dispatcher.dispatch(&event(json!({"event": "follow"})));
        dispatcher.report(StreamError::Unclassified("{}".into()));
        assert!(dispatcher.handlers().handler(EventKind::Event).is_none());
    }

    #[test]
    fn test_register_replaces_and_getter_returns_current() {
        let mut handlers = Handlers::new();
        assert!(handlers.handler(EventKind::Status).is_none());

        let first: EventHandler = Arc::new(|_: &StreamEvent| {});
        let second: EventHandler = Arc::new(|_: &StreamEvent| {});
        handlers.register(EventKind::Status, first.clone());
        handlers.register(EventKind::Status, second.clone());

        let current = handlers.handler(EventKind::Status).unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert!(!Arc::ptr_eq(&current, &first));
    }

    #[test]
    fn test_panicking_handler_is_reported() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::new();
        handlers.on_deletion(|_| panic!("boom"));
        let e = errors.clone();
        handlers.on_error(move |err| e.lock().push(err.to_string()));

        let dispatcher = Dispatcher::new(handlers);
        dispatcher.dispatch(&event(json!({"delete": {"status": {"id": 1, "user_id": 2}}})));

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("deletion handler panicked: boom"));
    }

    #[test]
    fn test_panicking_handler_without_error_handler_is_ignored() {
        let mut handlers = Handlers::new();
        handlers.on_status(|_| panic!("ignored"));
        Dispatcher::new(handlers).dispatch(&event(json!({"text": "x", "user": {}})));
    }

    #[test]
    fn test_merged_overrides_win() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let mut base = Handlers::new();
        let h = hits.clone();
        base.on_status(move |_| h.lock().push("base status"));
        let h = hits.clone();
        base.on_limit(move |_| h.lock().push("base limit"));

        let mut overrides = Handlers::new();
        let h = hits.clone();
        overrides.on_status(move |_| h.lock().push("override status"));

        let dispatcher = Dispatcher::new(base.merged(&overrides));
        dispatcher.dispatch(&event(json!({"text": "x", "user": {}})));
        dispatcher.dispatch(&event(json!({"limit": {"track": 1}})));

        assert_eq!(*hits.lock(), vec!["override status", "base limit"]);
    }

    #[test]
    fn test_lifecycle_callbacks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = Handlers::new();
        let l = log.clone();
        handlers.on_connected(move || l.lock().push("connected".to_string()));
        let l = log.clone();
        handlers.on_reconnect(move |delay, retries| {
            l.lock().push(format!("reconnect {:?} {}", delay, retries))
        });

        let dispatcher = Dispatcher::new(handlers);
        dispatcher.connected();
        dispatcher.reconnecting(Duration::from_millis(250), 1);

        assert_eq!(
            *log.lock(),
            vec!["connected".to_string(), "reconnect 250ms 1".to_string()]
        );
    }
}
