use crate::application::ports::feed_gateway::FeedGateway;
use crate::domain::entities::PopularTag;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// フィルタ UI に出すカテゴリと人気タグの置き場。
/// 取得失敗は空のまま進める。フィード本体は影響を受けない。
pub struct CatalogService {
    gateway: Arc<dyn FeedGateway>,
    fetch_limit: u32,
    display_limit: u32,
    categories: RwLock<Vec<String>>,
    popular_tags: RwLock<Vec<PopularTag>>,
}

impl CatalogService {
    pub fn new(gateway: Arc<dyn FeedGateway>, fetch_limit: u32, display_limit: u32) -> Self {
        Self {
            gateway,
            fetch_limit,
            display_limit,
            categories: RwLock::new(Vec::new()),
            popular_tags: RwLock::new(Vec::new()),
        }
    }

    /// カテゴリと人気タグを並行で取り直す。
    pub async fn refresh(&self) {
        let (categories, tags) = tokio::join!(
            self.gateway.fetch_categories(),
            self.gateway.fetch_popular_tags(self.fetch_limit),
        );

        match categories {
            Ok(fetched) => *self.categories.write().await = fetched,
            Err(err) => warn!(error = %err, "failed to fetch categories"),
        }
        match tags {
            Ok(fetched) => *self.popular_tags.write().await = fetched,
            Err(err) => warn!(error = %err, "failed to fetch popular tags"),
        }
    }

    pub async fn categories(&self) -> Vec<String> {
        self.categories.read().await.clone()
    }

    pub async fn popular_tags(&self) -> Vec<PopularTag> {
        self.popular_tags.read().await.clone()
    }

    /// タグクラウドに載せる先頭 display_limit 件。
    pub async fn display_tags(&self) -> Vec<PopularTag> {
        let tags = self.popular_tags.read().await;
        tags.iter().take(self.display_limit as usize).cloned().collect()
    }
}
