// モジュール定義
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod shared;
pub mod state;

pub use presentation::{ApiResponse, FeedQueryRequest, FeedSnapshot};
pub use shared::{AppConfig, AppError, Result};
pub use state::AppState;

/// ログ設定の初期化。RUST_LOG があればそちらを優先する。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tsunagi_feed=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
