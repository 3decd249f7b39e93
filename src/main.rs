use anyhow::Context;
use chrono::{Duration, Local};
use dedup_store::MemoryStore;
use gifbot_core::{
    BotConfig, ErrorReporter, ProcessedStore, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
use giphy_client::GiphyClient;
use reddit_client::RedditClient;
use reply_pipeline::ReplyPipeline;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "gifbot=info,reply_pipeline=info,reddit_client=info,giphy_client=info,gifbot_core=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting Reddit Giphy Bot");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let reporter = ErrorReporter::new();
    let config = BotConfig::load(&config_path).map_err(|e| {
        reporter.report_error(&e);
        e
    })?;

    let mut reddit = RedditClient::new(&config.reddit)?;
    let identity = reddit.authenticate().await.map_err(|e| {
        reporter.report_error(&e);
        e
    })?;
    let giphy = GiphyClient::new(&config.giphy).context("failed to set up Giphy client")?;

    let pipeline = ReplyPipeline::new(
        &reddit,
        &giphy,
        identity,
        config.trigger_table(),
        config.subreddits.clone(),
    )
    .with_window(Duration::minutes(config.pipeline.window_minutes))
    .with_page_size(config.pipeline.page_size);

    let mut processed = MemoryStore::new();

    tracing::info!(
        "Bot run at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    let result = pipeline.run(&mut processed).await;

    tracing::info!(
        "Bot run complete! Replied: {} ({} comments inspected, {} in window, {} sources failed)",
        result.replied,
        result.comments_inspected,
        result.comments_in_window,
        result.sources_failed
    );
    tracing::info!("Total comments processed: {}", processed.len());

    if let Some(reply) = &result.reply {
        tracing::debug!(
            "Replied to {} in r/{} with {}",
            reply.comment_id,
            reply.source,
            reply.media_url
        );
    }
    Ok(())
}
