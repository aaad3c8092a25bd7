use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};

use tsunagi_feed::infrastructure::ui::ObserverCommand;
use tsunagi_feed::{ApiResponse, AppConfig, AppState, FeedQueryRequest, FeedSnapshot};

#[derive(Parser)]
#[command(name = "feed_harness")]
#[command(about = "Drive the feed loader against a live posts API", long_about = None)]
struct Cli {
    /// Posts API base URL
    #[arg(long, env = "TSUNAGI_API_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token for authenticated endpoints
    #[arg(long, env = "TSUNAGI_API_TOKEN")]
    token: Option<String>,

    /// Initial search text
    #[arg(long)]
    search: Option<String>,

    /// Category filter
    #[arg(long)]
    category: Option<String>,

    /// Comma-separated tag filter
    #[arg(long)]
    tags: Option<String>,

    /// Visibility filter (public, connections, private)
    #[arg(long)]
    visibility: Option<String>,

    /// Sort key (created_at, likes_count, views_count)
    #[arg(long)]
    sort_by: Option<String>,

    /// Sort order (asc, desc)
    #[arg(long)]
    sort_order: Option<String>,

    /// Page size (1-50)
    #[arg(long)]
    per_page: Option<u32>,

    /// How many sentinel visibility events to simulate
    #[arg(long, default_value = "3")]
    pages: u32,

    /// Like the first post after the initial load
    #[arg(long)]
    like_first: bool,

    /// Print the share payload of the first post
    #[arg(long)]
    share_first: bool,

    /// Dump the final snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    info!("Starting feed harness v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if cli.token.is_some() {
        config.api.bearer_token = cli.token.clone();
    }

    let (state, mut observer_commands) = AppState::new(config)?;

    // 本物のホストの代わりに監視コマンドをログへ流す
    tokio::spawn(async move {
        while let Some(command) = observer_commands.recv().await {
            match command {
                ObserverCommand::Observe {
                    sentinel,
                    threshold,
                    margin_px,
                } => debug!(%sentinel, threshold, margin_px, "observe sentinel"),
                ObserverCommand::Unobserve { sentinel } => {
                    debug!(%sentinel, "unobserve sentinel")
                }
            }
        }
    });

    let overrides = FeedQueryRequest {
        search: cli.search.clone(),
        category: cli.category.clone(),
        visibility: cli.visibility.clone(),
        tags: cli.tags.clone(),
        sort_by: cli.sort_by.clone(),
        sort_order: cli.sort_order.clone(),
        per_page: cli.per_page,
    };
    state.start(Some(overrides)).await?;

    let snapshot = state.handler.snapshot().await;
    log_snapshot("initial load", &snapshot);

    if cli.like_first {
        like_first_post(&state, &snapshot).await;
    }
    if cli.share_first {
        share_first_post(&state, &snapshot).await;
    }

    // 番兵を登録し、可視化イベントでページを進める
    state.handler.watch_sentinel("feed-end").await?;
    for round in 1..=cli.pages {
        if !state.scroll.has_more() {
            info!("reached the end of the feed");
            break;
        }
        state.handler.sentinel_visible("feed-end").await?;
        let snapshot = state.handler.snapshot().await;
        log_snapshot(&format!("after visibility event {}", round), &snapshot);
    }

    let final_snapshot = state.handler.snapshot().await;
    if cli.json {
        let response = ApiResponse::success(final_snapshot);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        log_snapshot("final state", &final_snapshot);
    }

    let metrics = state.metrics.snapshot();
    info!(
        initial_success = metrics.initial_loads.successes,
        initial_failure = metrics.initial_loads.failures,
        more_success = metrics.more_loads.successes,
        more_failure = metrics.more_loads.failures,
        stale_discards = metrics.stale_discards,
        like_failures = metrics.like_failures,
        "request metrics"
    );

    state.shutdown().await;
    Ok(())
}

async fn like_first_post(state: &AppState, snapshot: &FeedSnapshot) {
    let Some(first) = snapshot.posts.first() else {
        warn!("no posts to like");
        return;
    };
    match state.handler.like_post(first.id).await {
        Ok(likes) => info!(post_id = first.id, likes, "liked first post"),
        Err(err) => warn!(post_id = first.id, error = %err, "like failed"),
    }
    // 裏で走る送信タスクに一拍だけ猶予を与える
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
}

async fn share_first_post(state: &AppState, snapshot: &FeedSnapshot) {
    let Some(first) = snapshot.posts.first() else {
        warn!("no posts to share");
        return;
    };
    match state.handler.share_post(first.id).await {
        Ok(payload) => info!(title = %payload.title, text = %payload.text, "share payload"),
        Err(err) => warn!(post_id = first.id, error = %err, "share failed"),
    }
}

fn log_snapshot(label: &str, snapshot: &FeedSnapshot) {
    info!(
        phase = %snapshot.phase,
        posts = snapshot.posts.len(),
        total = snapshot.total,
        page = snapshot.current_page,
        has_more = snapshot.has_more,
        error = snapshot.error.as_deref().unwrap_or(""),
        "{}",
        label
    );
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .init();
}
