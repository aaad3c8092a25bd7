use crate::application::ports::visibility::{ObserveOptions, SentinelId, VisibilityNotifier};
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// ホスト側へ転送する監視指示。
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverCommand {
    Observe {
        sentinel: SentinelId,
        threshold: f64,
        margin_px: u32,
    },
    Unobserve {
        sentinel: SentinelId,
    },
}

/// 監視指示をチャネルへ流すだけの VisibilityNotifier。
/// ホストはこのチャネルを消費して実際の IntersectionObserver を張り、
/// 可視化イベントをハンドラの sentinel_visible へ送り返す。
pub struct ChannelVisibilityNotifier {
    commands: mpsc::UnboundedSender<ObserverCommand>,
}

impl ChannelVisibilityNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ObserverCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { commands: tx }, rx)
    }
}

#[async_trait]
impl VisibilityNotifier for ChannelVisibilityNotifier {
    async fn observe(
        &self,
        sentinel: &SentinelId,
        options: ObserveOptions,
    ) -> Result<(), AppError> {
        self.commands
            .send(ObserverCommand::Observe {
                sentinel: sentinel.clone(),
                threshold: options.threshold,
                margin_px: options.margin_px,
            })
            .map_err(|_| AppError::Internal("observer command channel closed".to_string()))
    }

    async fn unobserve(&self, sentinel: &SentinelId) -> Result<(), AppError> {
        self.commands
            .send(ObserverCommand::Unobserve {
                sentinel: sentinel.clone(),
            })
            .map_err(|_| AppError::Internal("observer command channel closed".to_string()))
    }
}
