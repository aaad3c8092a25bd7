use crate::shared::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 監視対象要素を指すキー。ビュー側が採番する不透明な文字列。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentinelId(String);

impl SentinelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SentinelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserveOptions {
    /// 発火に必要な可視割合 (0.0..=1.0)。
    pub threshold: f64,
    /// ビューポート手前の先読みマージン。
    pub margin_px: u32,
}

/// ホスト環境の可視性監視 (IntersectionObserver 相当) の抽象。
/// 可視化イベント自体はホストがトリガー側のコールバックを叩いて届ける。
#[async_trait]
pub trait VisibilityNotifier: Send + Sync {
    async fn observe(&self, sentinel: &SentinelId, options: ObserveOptions)
        -> Result<(), AppError>;
    async fn unobserve(&self, sentinel: &SentinelId) -> Result<(), AppError>;
}
