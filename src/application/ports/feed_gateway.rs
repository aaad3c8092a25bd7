use crate::domain::entities::{PopularTag, Post};
use crate::domain::value_objects::PostFilters;
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Posts API のページ応答に付くページング情報。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
    #[serde(default)]
    pub next_num: Option<u32>,
    #[serde(default)]
    pub prev_num: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub pagination: PageInfo,
}

/// 投稿フィードの外部 API 窓口。
#[async_trait]
pub trait FeedGateway: Send + Sync {
    /// フィルタ一式でページを 1 枚取ってくる。
    async fn fetch_page(&self, filters: &PostFilters) -> Result<FeedPage, AppError>;

    /// フィルタ UI 用のカテゴリ一覧。
    async fn fetch_categories(&self) -> Result<Vec<String>, AppError>;

    /// 人気タグの上位 `limit` 件。
    async fn fetch_popular_tags(&self, limit: u32) -> Result<Vec<PopularTag>, AppError>;

    /// いいねを 1 件付け、サーバー側の最新いいね数を返す。
    async fn like_post(&self, post_id: i64) -> Result<u32, AppError>;
}
