use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reddit_client::{Credentials, RedditClient, StreamOptions};
use snooytbust_common::{Config, ModeratorError, SlackConfig};
use snooytbust_moderator::{
    blacklist::PgBlacklist,
    deps::ModeratorDeps,
    moderator::Moderator,
    notify::{
        slack::{SlackBot, SlackWebhook},
        Notifier,
    },
    retry::RetryPolicy,
    traits::RedditSource,
};
use youtube_client::YoutubeClient;

#[derive(Parser)]
#[command(name = "snooytbust", about = "Removes Reddit items linking to blacklisted YouTube channels")]
struct Cli {
    /// Write logs to this file instead of stdout (overrides LOG_FILE)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Load environment variables from this file before reading config
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("reading env file {}", path.display()))?;
    }

    // Load config
    let config = Config::from_env()?;
    let log_file = cli.log.clone().or_else(|| config.log_file.clone());
    init_logging(log_file.as_deref())?;

    info!("SnooYTBust starting...");
    config.log_redacted();

    // Connect to the blacklist database
    let blacklist = PgBlacklist::connect(&config.database_url)
        .await
        .map_err(|e| ModeratorError::Startup(format!("blacklist database: {e}")))?;
    info!("Connected to blacklist database");

    // Build notification backend: Slack if configured, otherwise Noop
    let notifier = match &config.slack {
        Some(SlackConfig::Bot { token, channel }) => {
            let mut bot = SlackBot::new(token.clone(), channel.clone());
            let identity = bot
                .auth_test()
                .await
                .map_err(|e| ModeratorError::Startup(format!("Slack auth failed: {e}")))?;
            info!(
                user = identity.user.as_str(),
                user_id = identity.user_id.as_str(),
                "Connected to Slack"
            );
            Notifier::new(Box::new(bot))
        }
        Some(SlackConfig::Webhook { url }) => {
            info!("Slack webhook notifications enabled");
            Notifier::new(Box::new(SlackWebhook::new(url.clone())))
        }
        None => {
            info!("No Slack destination set, notifications disabled");
            Notifier::disabled()
        }
    };

    // Log in to Reddit
    let reddit = RedditClient::new(Credentials {
        client_id: config.reddit_client_id.clone(),
        client_secret: config.reddit_client_secret.clone(),
        username: config.reddit_username.clone(),
        password: config.reddit_password.clone(),
        user_agent: config.reddit_user_agent.clone(),
    })
    .map_err(|e| ModeratorError::Startup(format!("Reddit client: {e}")))?;
    reddit
        .login()
        .await
        .map_err(|e| ModeratorError::Startup(format!("Reddit auth failed: {e}")))?;
    let me = reddit
        .me()
        .await
        .map_err(|e| ModeratorError::Startup(format!("Reddit auth failed: {e}")))?;
    info!(username = me.name.as_str(), "Connected to Reddit");

    let stream_options = StreamOptions {
        poll_interval: config.stream_poll_interval,
        ..StreamOptions::default()
    };

    let deps = ModeratorDeps {
        community: config.subreddit.clone(),
        source: Arc::new(RedditSource::new(reddit, stream_options)),
        metadata: Arc::new(YoutubeClient::new(config.youtube_api_key.clone())),
        blacklist: Arc::new(blacklist),
        notifier: Arc::new(notifier),
        retry: RetryPolicy::forever(config.stream_retry_interval),
    };

    let cancel = CancellationToken::new();
    let moderator = Moderator::start(&deps, cancel.clone())
        .await
        .map_err(|e| ModeratorError::Startup(e.to_string()))?;

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    info!(subreddit = config.subreddit.as_str(), "Watching for YouTube links");
    let stats = moderator.run().await;

    info!("SnooYTBust stopped. {stats}");
    Ok(())
}

/// Stdout at debug by default; a log file gets info and no ANSI colours.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(default_filter("info")?)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(default_filter("debug")?)
                .init();
        }
    }
    Ok(())
}

fn default_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(format!("snooytbust={level}").parse()?)
        .add_directive(format!("reddit_client={level}").parse()?)
        .add_directive(format!("youtube_client={level}").parse()?))
}
