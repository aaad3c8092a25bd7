use crate::application::ports::visibility::{ObserveOptions, SentinelId, VisibilityNotifier};
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// 番兵が見えたときに呼ばれる継続。戻り値は読み込み後も
/// まだ続きがあるかどうか。
#[async_trait]
pub trait FetchMore: Send + Sync {
    async fn fetch_more(&self) -> Result<bool, AppError>;
}

/// 無限スクロールのトリガー。番兵要素の可視化イベントを受けて、
/// 未取得分があり、かつ取得中でないときに限って継続を一度だけ叩く。
pub struct ScrollTrigger {
    notifier: Arc<dyn VisibilityNotifier>,
    continuation: Arc<dyn FetchMore>,
    options: ObserveOptions,
    in_flight: AtomicBool,
    has_more: AtomicBool,
    watched: Mutex<Option<SentinelId>>,
}

impl ScrollTrigger {
    pub fn new(
        notifier: Arc<dyn VisibilityNotifier>,
        continuation: Arc<dyn FetchMore>,
        options: ObserveOptions,
    ) -> Self {
        Self {
            notifier,
            continuation,
            options,
            in_flight: AtomicBool::new(false),
            has_more: AtomicBool::new(false),
            watched: Mutex::new(None),
        }
    }

    /// 監視対象を張り替える。前の番兵は必ず先に解除する。
    pub async fn watch(&self, sentinel: SentinelId) -> Result<(), AppError> {
        let mut watched = self.watched.lock().await;
        if watched.as_ref() == Some(&sentinel) {
            return Ok(());
        }
        if let Some(previous) = watched.take() {
            self.notifier.unobserve(&previous).await?;
        }
        self.notifier.observe(&sentinel, self.options).await?;
        *watched = Some(sentinel);
        Ok(())
    }

    /// 監視を完全に止める。破棄時に呼ぶ。
    pub async fn release(&self) -> Result<(), AppError> {
        let mut watched = self.watched.lock().await;
        if let Some(previous) = watched.take() {
            self.notifier.unobserve(&previous).await?;
        }
        Ok(())
    }

    pub fn set_has_more(&self, has_more: bool) {
        self.has_more.store(has_more, Ordering::SeqCst);
    }

    pub fn has_more(&self) -> bool {
        self.has_more.load(Ordering::SeqCst)
    }

    /// ホストから届く可視化イベントの入口。
    pub async fn sentinel_visible(&self, sentinel: &SentinelId) -> Result<(), AppError> {
        {
            let watched = self.watched.lock().await;
            if watched.as_ref() != Some(sentinel) {
                // 張り替え前の番兵から届いた遅延イベントは無視する
                debug!(sentinel = %sentinel, "visibility event for unwatched sentinel");
                return Ok(());
            }
        }
        if !self.has_more.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = self.continuation.fetch_more().await;
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(has_more) => {
                self.has_more.store(has_more, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "fetch-more continuation failed");
                Err(err)
            }
        }
    }
}
