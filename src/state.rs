use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::ports::{FeedGateway, ObserveOptions, VisibilityNotifier};
use crate::application::services::{
    CatalogService, FeedService, FetchMore, FilterAggregator, ScrollTrigger,
};
use crate::domain::value_objects::PostFilters;
use crate::infrastructure::api::HttpFeedGateway;
use crate::infrastructure::ui::{ChannelVisibilityNotifier, ObserverCommand};
use crate::presentation::dto::FeedQueryRequest;
use crate::presentation::handlers::FeedHandler;
use crate::shared::config::AppConfig;
use crate::shared::error::{AppError, Result};
use crate::shared::metrics::FeedMetrics;

/// フィード一式を束ねるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub feed: Arc<FeedService>,
    pub filters: Arc<FilterAggregator>,
    pub scroll: Arc<ScrollTrigger>,
    pub catalog: Arc<CatalogService>,
    pub handler: Arc<FeedHandler>,
    pub metrics: Arc<FeedMetrics>,
}

impl AppState {
    /// HTTPゲートウェイとチャネル通知で本番構成を組む。
    /// 返す受信側はホストが consume して実際の要素監視につなぐ。
    pub fn new(config: AppConfig) -> Result<(Self, mpsc::UnboundedReceiver<ObserverCommand>)> {
        config.validate().map_err(AppError::ConfigurationError)?;
        let gateway: Arc<dyn FeedGateway> = Arc::new(HttpFeedGateway::new(&config.api)?);
        let (notifier, commands) = ChannelVisibilityNotifier::new();
        let state = Self::with_components(config, gateway, Arc::new(notifier));
        Ok((state, commands))
    }

    /// 依存を差し替えて組む。テストや別ホストへの組み込みで使う。
    /// Tokio ランタイム上で呼ぶこと。
    pub fn with_components(
        config: AppConfig,
        gateway: Arc<dyn FeedGateway>,
        notifier: Arc<dyn VisibilityNotifier>,
    ) -> Self {
        let metrics = Arc::new(FeedMetrics::new());
        let initial = PostFilters::with_per_page(config.feed.per_page);

        let feed = Arc::new(FeedService::new(
            Arc::clone(&gateway),
            Arc::clone(&metrics),
            initial.clone(),
        ));
        let (filters, mut emissions) =
            FilterAggregator::new(initial, Duration::from_millis(config.feed.debounce_ms));
        let filters = Arc::new(filters);
        let scroll = Arc::new(ScrollTrigger::new(
            notifier,
            Arc::clone(&feed) as Arc<dyn FetchMore>,
            ObserveOptions {
                threshold: config.scroll.visibility_threshold,
                margin_px: config.scroll.trigger_margin_px,
            },
        ));
        let catalog = Arc::new(CatalogService::new(
            gateway,
            config.feed.popular_tag_fetch_limit,
            config.feed.popular_tag_display_limit,
        ));
        let handler = Arc::new(FeedHandler::new(
            Arc::clone(&feed),
            Arc::clone(&filters),
            Arc::clone(&scroll),
            Arc::clone(&catalog),
        ));

        // フィルタ確定ごとに 1 ページ目を取り直すドライバ。
        // 集約器が落ちてチャネルが閉じたら一緒に終わる。
        {
            let feed = Arc::clone(&feed);
            let scroll = Arc::clone(&scroll);
            tokio::spawn(async move {
                while let Some(next) = emissions.recv().await {
                    feed.apply_filters(next).await;
                    scroll.set_has_more(feed.has_more().await);
                }
                debug!("filter emissions closed, feed driver stopped");
            });
        }

        Self {
            config,
            feed,
            filters,
            scroll,
            catalog,
            handler,
            metrics,
        }
    }

    /// 初期表示の準備。上書き指定があれば検証して据えたうえで、
    /// カタログ取得と 1 ページ目の読み込みを行う。
    pub async fn start(&self, overrides: Option<FeedQueryRequest>) -> Result<()> {
        if let Some(request) = overrides {
            let base = PostFilters::with_per_page(self.config.feed.per_page);
            let seeded = request.to_filters(base).map_err(AppError::InvalidInput)?;
            self.filters.reset_to(seeded).await;
        }

        // カタログ取得の失敗はフィード表示を止めない
        self.catalog.refresh().await;

        self.feed.apply_filters(self.filters.current().await).await;
        self.scroll.set_has_more(self.feed.has_more().await);
        Ok(())
    }

    /// 破棄前の後始末。番兵の監視を解除する。
    pub async fn shutdown(&self) {
        if let Err(err) = self.scroll.release().await {
            warn!(error = %err, "failed to release scroll sentinel");
        }
    }
}
