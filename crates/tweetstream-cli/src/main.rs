//! tweetstream - follow streaming API endpoints from the terminal
//!
//! Opens one stream, prints every message as it arrives, reconnects on
//! drops and stalls, and exits on Ctrl+C or once reconnects are exhausted.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tweetstream_client::{FilterParams, StreamClient, StreamParams};

use crate::commands::StreamTarget;
use crate::config::{parse_locations, AuthArgs, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "tweetstream")]
#[command(author, version, about = "Follow streaming API endpoints")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TWEETSTREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Shorthand for `--output json`
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Only print messages
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Request length-prefixed framing
    #[arg(long)]
    delimited: bool,

    /// Ask the server for stall warnings
    #[arg(long)]
    stall_warnings: bool,

    /// Basic auth user name
    #[arg(long, env = "TWEETSTREAM_USERNAME")]
    username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "TWEETSTREAM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// OAuth consumer key
    #[arg(long, env = "TWEETSTREAM_CONSUMER_KEY")]
    consumer_key: Option<String>,

    /// OAuth consumer secret
    #[arg(long, env = "TWEETSTREAM_CONSUMER_SECRET", hide_env_values = true)]
    consumer_secret: Option<String>,

    /// OAuth access token
    #[arg(long, env = "TWEETSTREAM_ACCESS_TOKEN")]
    access_token: Option<String>,

    /// OAuth access token secret
    #[arg(long, env = "TWEETSTREAM_ACCESS_TOKEN_SECRET", hide_env_values = true)]
    access_token_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Random sample of public statuses
    Sample,

    /// All public statuses (privileged)
    Firehose,

    /// All retweets (privileged)
    Retweet,

    /// Public statuses matching keywords, users or locations
    Filter {
        /// Keywords to track (repeatable or comma separated)
        #[arg(long, value_delimiter = ',')]
        track: Vec<String>,

        /// User ids to follow (repeatable or comma separated)
        #[arg(long, value_delimiter = ',')]
        follow: Vec<u64>,

        /// Bounding boxes as lon,lat,lon,lat[,...]
        #[arg(long, allow_hyphen_values = true)]
        locations: Option<String>,
    },

    /// Events for the authenticated user (OAuth only)
    User {
        /// Scope of messages: user or followings
        #[arg(long)]
        with: Option<String>,

        /// Include all replies
        #[arg(long)]
        all_replies: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let auth = AuthArgs {
        username: cli.username.clone(),
        password: cli.password.clone(),
        consumer_key: cli.consumer_key.clone(),
        consumer_secret: cli.consumer_secret.clone(),
        access_token: cli.access_token.clone(),
        access_token_secret: cli.access_token_secret.clone(),
    };
    let merged = config.merge_with_args(&auth, cli.delimited);

    let format = if cli.json {
        OutputFormat::Json
    } else {
        cli.output
    };
    let ctx = Arc::new(OutputContext::new(format, cli.no_color, cli.quiet));

    let mut params = StreamParams::new();
    if cli.stall_warnings {
        params = params.stall_warnings();
    }

    let target = match &cli.command {
        Commands::Sample => StreamTarget::Sample,
        Commands::Firehose => StreamTarget::Firehose,
        Commands::Retweet => StreamTarget::Retweet,
        Commands::Filter {
            track,
            follow,
            locations,
        } => {
            let mut filter = FilterParams::new()
                .track(track.iter().cloned())
                .follow(follow.iter().copied());
            if let Some(locations) = locations {
                filter = filter.locations(parse_locations(locations)?);
            }
            StreamTarget::Filter(filter)
        }
        Commands::User { with, all_replies } => {
            if let Some(with) = with {
                params = params.param("with", with.clone());
            }
            if *all_replies {
                params = params.param("replies", "all");
            }
            StreamTarget::User
        }
    };

    let client = StreamClient::new(merged.stream, merged.credentials)
        .context("Failed to create stream client")?;

    commands::stream(client, target, params, ctx).await
}

/// Install the global tracing subscriber
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}
