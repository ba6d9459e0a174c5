//! Output formatting for tweetstream (text, json)

use clap::ValueEnum;
use colored::Colorize;
use tweetstream_client::{StatusEvent, StreamEvent};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One human readable line per message (default)
    #[default]
    Text,
    /// Each message as the compact JSON line it arrived as
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print an info message to stderr (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.dimmed());
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print one stream event in the configured format
    pub fn event(&self, event: &StreamEvent) {
        match self.format {
            OutputFormat::Json => println!("{}", event.raw()),
            OutputFormat::Text => println!("{}", render_text(event)),
        }
    }
}

/// `@screen_name: text`
pub fn status_line(status: &StatusEvent) -> String {
    let who = status
        .user()
        .and_then(|user| user.screen_name().map(str::to_owned))
        .unwrap_or_else(|| "?".to_string());
    format!("{}: {}", format!("@{}", who).bold(), status.text())
}

fn render_text(event: &StreamEvent) -> String {
    match event {
        StreamEvent::Status(status) => status_line(status),
        StreamEvent::DirectMessage(dm) => {
            let from = dm
                .sender()
                .and_then(|user| user.screen_name().map(str::to_owned))
                .unwrap_or_else(|| "?".to_string());
            format!(
                "{} {}: {}",
                "DM".cyan(),
                format!("@{}", from).bold(),
                dm.text().unwrap_or_default()
            )
        }
        StreamEvent::Event(event) => {
            let source = event
                .source()
                .and_then(|user| user.screen_name().map(str::to_owned))
                .unwrap_or_default();
            let target = event
                .target()
                .and_then(|user| user.screen_name().map(str::to_owned))
                .unwrap_or_default();
            format!(
                "{} {} @{} -> @{}",
                "event".cyan(),
                event.name().unwrap_or("unknown"),
                source,
                target
            )
        }
        StreamEvent::Deletion(deletion) => format!(
            "{} status {} by user {}",
            "deleted".dimmed(),
            deletion.status_id().map(|id| id.to_string()).unwrap_or_default(),
            deletion.user_id().map(|id| id.to_string()).unwrap_or_default()
        ),
        StreamEvent::Limit(limit) => format!(
            "{} {} statuses withheld",
            "limit".yellow(),
            limit.track().unwrap_or_default()
        ),
        StreamEvent::FriendsList(friends) => {
            format!("{} {} friends", "friends".dimmed(), friends.friends().len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tweetstream_client::{classify, RawMessage};

    fn event(value: serde_json::Value) -> StreamEvent {
        classify(RawMessage::from(value)).unwrap()
    }

    #[test]
    fn test_status_line() {
        colored::control::set_override(false);
        let StreamEvent::Status(status) =
            event(json!({"text": "hello", "user": {"screen_name": "alice"}}))
        else {
            panic!("not a status");
        };
        assert_eq!(status_line(&status), "@alice: hello");
    }

    #[test]
    fn test_render_limit_and_deletion() {
        colored::control::set_override(false);
        assert_eq!(
            render_text(&event(json!({"limit": {"track": 7}}))),
            "limit 7 statuses withheld"
        );
        assert_eq!(
            render_text(&event(json!({"delete": {"status": {"id": 1, "user_id": 2}}}))),
            "deleted status 1 by user 2"
        );
    }
}
