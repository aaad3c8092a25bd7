use crate::application::ports::feed_gateway::FeedGateway;
use crate::domain::entities::Post;
use crate::domain::value_objects::PostFilters;
use crate::shared::error::AppError;
use crate::shared::metrics::FeedMetrics;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// フィードの読み込み局面。Empty は「Idle かつ 0 件」として
/// 表示層で導出するので、ここには持たない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    LoadingInitial,
    LoadingMore,
    Error,
}

/// 表示層へ渡すフィードの写し。
#[derive(Debug, Clone)]
pub struct FeedView {
    pub posts: Vec<Post>,
    pub phase: LoadPhase,
    pub error: Option<String>,
    pub has_more: bool,
    pub current_page: u32,
    pub total: u64,
    pub filters: PostFilters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
}

#[derive(Debug)]
struct FeedInner {
    posts: Vec<Post>,
    filters: PostFilters,
    phase: LoadPhase,
    error: Option<String>,
    has_next: bool,
    current_page: u32,
    total: u64,
    // 発行済みリクエストの最新トークン。完了時に一致しない応答は捨てる。
    request_seq: u64,
    active_request: u64,
}

/// フィード本体。投稿コレクションと読み込み状態の唯一の所有者。
pub struct FeedService {
    gateway: Arc<dyn FeedGateway>,
    metrics: Arc<FeedMetrics>,
    state: RwLock<FeedInner>,
}

impl FeedService {
    pub fn new(
        gateway: Arc<dyn FeedGateway>,
        metrics: Arc<FeedMetrics>,
        initial_filters: PostFilters,
    ) -> Self {
        Self {
            gateway,
            metrics,
            state: RwLock::new(FeedInner {
                posts: Vec::new(),
                filters: initial_filters,
                phase: LoadPhase::Idle,
                error: None,
                has_next: false,
                current_page: 0,
                total: 0,
                request_seq: 0,
                active_request: 0,
            }),
        }
    }

    /// フィルタ確定。1 ページ目を取り直してコレクションを置き換える。
    /// 取得失敗は状態に畳み込むので戻り値はない。
    pub async fn apply_filters(&self, filters: PostFilters) {
        let (token, request) = {
            let mut state = self.state.write().await;
            let mut filters = filters;
            filters.set_page(1);
            state.request_seq += 1;
            state.active_request = state.request_seq;
            state.filters = filters.clone();
            state.phase = LoadPhase::LoadingInitial;
            state.error = None;
            (state.request_seq, filters)
        };
        debug!(search = %request.search, page = request.page, "loading initial feed page");

        let result = self.gateway.fetch_page(&request).await;

        let mut state = self.state.write().await;
        if state.active_request != token {
            self.metrics.record_stale_discard();
            debug!(token, "discarding stale initial-load response");
            return;
        }
        match result {
            Ok(page) => {
                state.has_next = page.pagination.has_next;
                state.current_page = page.pagination.page;
                state.total = page.pagination.total;
                state.posts = page.posts;
                state.phase = LoadPhase::Idle;
                state.error = None;
                self.metrics.initial_loads.record_success();
            }
            Err(err) => {
                // 直前の表示内容は残したままエラーだけ載せる
                state.phase = LoadPhase::Error;
                state.error = Some(err.user_message());
                self.metrics.initial_loads.record_failure();
                warn!(error = %err, "initial feed load failed");
            }
        }
    }

    /// 次ページを末尾に継ぎ足す。Idle かつ has_next のときだけ取得し、
    /// 戻り値はまだ続きを読める見込みがあるかどうか。
    pub async fn load_more(&self) -> Result<bool, AppError> {
        let (token, request) = {
            let mut state = self.state.write().await;
            if state.phase != LoadPhase::Idle || !state.has_next {
                return Ok(false);
            }
            let mut request = state.filters.clone();
            request.set_page(state.current_page + 1);
            state.request_seq += 1;
            state.active_request = state.request_seq;
            state.phase = LoadPhase::LoadingMore;
            (state.request_seq, request)
        };
        debug!(page = request.page, "loading more feed posts");

        let result = self.gateway.fetch_page(&request).await;

        let mut state = self.state.write().await;
        if state.active_request != token {
            self.metrics.record_stale_discard();
            debug!(token, "discarding stale load-more response");
            // 応答は捨てるが、追い越した側の状態で続きの有無を答える。
            // ここで false を返すと張り直されたトリガーが止まったままになる。
            return Ok(state.has_next);
        }
        match result {
            Ok(page) => {
                let existing: HashSet<i64> = state.posts.iter().map(|p| p.id).collect();
                state
                    .posts
                    .extend(page.posts.into_iter().filter(|p| !existing.contains(&p.id)));
                state.has_next = page.pagination.has_next;
                state.current_page = page.pagination.page;
                state.total = page.pagination.total;
                state.phase = LoadPhase::Idle;
                self.metrics.more_loads.record_success();
                Ok(state.has_next)
            }
            Err(err) => {
                // 読み込み済みの投稿とページ位置は動かさない
                state.phase = LoadPhase::Error;
                state.error = Some(err.user_message());
                self.metrics.more_loads.record_failure();
                warn!(error = %err, "feed load-more failed");
                Ok(false)
            }
        }
    }

    /// いいねの楽観更新。ローカルを先に +1 し、API 呼び出しは
    /// 投げっぱなしにする。失敗してもローカルは戻さない。
    pub async fn like_post(&self, post_id: i64) -> Result<u32, AppError> {
        let local_count = {
            let mut state = self.state.write().await;
            let post = state
                .posts
                .iter_mut()
                .find(|p| p.id == post_id)
                .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
            post.increment_likes();
            post.likes_count
        };

        let gateway = Arc::clone(&self.gateway);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            match gateway.like_post(post_id).await {
                Ok(server_count) => {
                    debug!(post_id, server_count, "like accepted");
                }
                Err(err) => {
                    metrics.record_like_failure();
                    warn!(post_id, error = %err, "like request failed");
                }
            }
        });

        Ok(local_count)
    }

    /// 共有シート用の本文。ネットワークには触らない。
    pub async fn share_post(&self, post_id: i64) -> Result<SharePayload, AppError> {
        let state = self.state.read().await;
        let post = state
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
        Ok(SharePayload {
            title: post.title.clone(),
            text: post.plain_text(),
        })
    }

    pub async fn snapshot(&self) -> FeedView {
        let state = self.state.read().await;
        FeedView {
            posts: state.posts.clone(),
            phase: state.phase,
            error: state.error.clone(),
            has_more: state.has_next,
            current_page: state.current_page,
            total: state.total,
            filters: state.filters.clone(),
        }
    }

    pub async fn has_more(&self) -> bool {
        self.state.read().await.has_next
    }

    pub async fn current_filters(&self) -> PostFilters {
        self.state.read().await.filters.clone()
    }
}

#[async_trait]
impl super::scroll_service::FetchMore for FeedService {
    async fn fetch_more(&self) -> Result<bool, AppError> {
        self.load_more().await
    }
}
