//! Stream command - follow one endpoint until Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tweetstream_client::{
    EventHandler, EventKind, FilterParams, Handlers, Method, StreamClient, StreamClientError,
    StreamEvent, StreamHandle, StreamParams,
};

use crate::output::{status_line, OutputContext};

/// Which endpoint to follow
#[derive(Debug, Clone)]
pub enum StreamTarget {
    Sample,
    Firehose,
    Retweet,
    Filter(FilterParams),
    User,
}

impl StreamTarget {
    fn open(
        &self,
        client: &StreamClient,
        params: &StreamParams,
    ) -> std::result::Result<StreamHandle, StreamClientError> {
        let endpoint = match self {
            Self::Sample => "sample",
            Self::Firehose => "firehose",
            Self::Retweet => "retweet",
            Self::Filter(filter) => return client.filter(filter, params),
            Self::User => return client.user_stream(params),
        };
        let request = client.public_request(Method::Get, endpoint, params);
        client.start(request, &Handlers::new())
    }
}

/// Print every message of `target` until interrupted or reconnects run out
pub async fn stream(
    mut client: StreamClient,
    target: StreamTarget,
    params: StreamParams,
    ctx: Arc<OutputContext>,
) -> Result<()> {
    let printer: EventHandler = {
        let ctx = ctx.clone();
        Arc::new(move |event: &StreamEvent| ctx.event(event))
    };
    for kind in EventKind::ALL {
        client.register(kind, printer.clone());
    }

    let c = ctx.clone();
    client.on_error(move |e| c.warn(&format!("Stream error: {}", e)));
    let c = ctx.clone();
    client.on_connected(move || c.info("Connected"));
    let c = ctx.clone();
    client.on_reconnect(move |delay, retries| {
        c.warn(&format!("Reconnecting in {:?} (retry {})", delay, retries))
    });

    let handle = target
        .open(&client, &params)
        .context("Failed to start stream")?;
    ctx.info("Press Ctrl+C to stop");

    let stop = handle.stop_handle();
    let c = ctx.clone();
    ctrlc::set_handler(move || {
        if let Some(last) = stop.stop() {
            c.info(&format!("Last status: {}", status_line(&last)));
        }
    })
    .context("Failed to install Ctrl+C handler")?;

    match handle.wait().await {
        Ok(()) => {
            info!("stream stopped");
            ctx.info("Stopped");
            Ok(())
        }
        Err(e) => {
            ctx.error(&format!("Stream ended: {}", e));
            Err(e).context("Stream terminated")
        }
    }
}
