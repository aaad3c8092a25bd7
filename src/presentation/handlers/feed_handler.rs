use std::sync::Arc;

use crate::application::ports::SentinelId;
use crate::application::services::{CatalogService, FeedService, FilterAggregator, ScrollTrigger};
use crate::domain::value_objects::{SortKey, SortOrder, Visibility};
use crate::presentation::dto::{CatalogDto, FeedSnapshot, SharePayloadDto};
use crate::shared::config::MAX_PER_PAGE;
use crate::shared::error::{AppError, Result};

/// フィード操作のハンドラ。ホスト側のイベントを各サービスへ橋渡しする。
pub struct FeedHandler {
    feed: Arc<FeedService>,
    filters: Arc<FilterAggregator>,
    scroll: Arc<ScrollTrigger>,
    catalog: Arc<CatalogService>,
}

impl FeedHandler {
    pub fn new(
        feed: Arc<FeedService>,
        filters: Arc<FilterAggregator>,
        scroll: Arc<ScrollTrigger>,
        catalog: Arc<CatalogService>,
    ) -> Self {
        Self {
            feed,
            filters,
            scroll,
            catalog,
        }
    }

    /// 描画に必要な状態を丸ごと写して返す
    pub async fn snapshot(&self) -> FeedSnapshot {
        let view = self.feed.snapshot().await;
        let search_input = self.filters.search_input().await;
        let tags = self.filters.selected_tags().await;
        let catalog = CatalogDto::from_parts(
            self.catalog.categories().await,
            &self.catalog.display_tags().await,
        );
        FeedSnapshot::from_parts(&view, search_input, &tags, catalog)
    }

    pub async fn set_search(&self, text: impl Into<String>) {
        self.filters.set_search_input(text).await;
    }

    pub async fn set_category(&self, category: Option<String>) {
        self.filters.set_category(category).await;
    }

    pub async fn set_visibility(&self, raw: &str) -> Result<()> {
        // 入力検証
        let visibility = Visibility::from_str(raw)
            .ok_or_else(|| AppError::InvalidInput(format!("表示範囲の指定が不正です: {}", raw)))?;
        self.filters.set_visibility(visibility).await;
        Ok(())
    }

    pub async fn set_sort(&self, sort_by: &str, sort_order: &str) -> Result<()> {
        let key = SortKey::from_str(sort_by).ok_or_else(|| {
            AppError::InvalidInput(format!("並び替えキーが不正です: {}", sort_by))
        })?;
        let order = SortOrder::from_str(sort_order).ok_or_else(|| {
            AppError::InvalidInput(format!("並び替え順が不正です: {}", sort_order))
        })?;
        self.filters.set_sort(key, order).await;
        Ok(())
    }

    pub async fn set_per_page(&self, per_page: u32) -> Result<()> {
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(AppError::InvalidInput(format!(
                "per_page は1以上{}以下で指定してください",
                MAX_PER_PAGE
            )));
        }
        self.filters.set_per_page(per_page).await;
        Ok(())
    }

    pub async fn toggle_tag(&self, tag: &str) -> Result<()> {
        if tag.trim().is_empty() {
            return Err(AppError::InvalidInput("タグが空です".to_string()));
        }
        self.filters.toggle_tag(tag).await;
        Ok(())
    }

    pub async fn clear_filters(&self) {
        self.filters.clear_filters().await;
    }

    /// リスト末尾の番兵要素を監視対象に据える
    pub async fn watch_sentinel(&self, sentinel: &str) -> Result<()> {
        if sentinel.trim().is_empty() {
            return Err(AppError::InvalidInput("番兵IDが空です".to_string()));
        }
        self.scroll.watch(SentinelId::new(sentinel)).await
    }

    pub async fn release_sentinel(&self) -> Result<()> {
        self.scroll.release().await
    }

    /// ホストから届いた交差イベント
    pub async fn sentinel_visible(&self, sentinel: &str) -> Result<()> {
        self.scroll
            .sentinel_visible(&SentinelId::new(sentinel))
            .await
    }

    pub async fn like_post(&self, post_id: i64) -> Result<u32> {
        if post_id <= 0 {
            return Err(AppError::InvalidInput("投稿IDが不正です".to_string()));
        }
        self.feed.like_post(post_id).await
    }

    pub async fn share_post(&self, post_id: i64) -> Result<SharePayloadDto> {
        if post_id <= 0 {
            return Err(AppError::InvalidInput("投稿IDが不正です".to_string()));
        }
        let payload = self.feed.share_post(post_id).await?;
        Ok(SharePayloadDto::from(payload))
    }

    pub async fn refresh_catalog(&self) {
        self.catalog.refresh().await;
    }
}
