use serde::{Deserialize, Serialize};

/// バックエンド側の per_page 上限。クライアントも同じ値で丸める。
pub const MAX_PER_PAGE: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub scroll: ScrollConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub per_page: u32,
    pub debounce_ms: u64,
    pub popular_tag_fetch_limit: u32,
    pub popular_tag_display_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    pub visibility_threshold: f64,
    pub trigger_margin_px: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:5000".to_string(),
                request_timeout_secs: 30,
                bearer_token: None,
            },
            feed: FeedConfig {
                per_page: 10,
                debounce_ms: 500,
                popular_tag_fetch_limit: 20,
                popular_tag_display_limit: 8,
            },
            scroll: ScrollConfig {
                visibility_threshold: 0.1,
                trigger_margin_px: 100,
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("TSUNAGI_API_BASE_URL") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.api.base_url = trimmed.to_string();
            }
        }
        if let Ok(v) = std::env::var("TSUNAGI_API_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.api.request_timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("TSUNAGI_API_TOKEN") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.api.bearer_token = Some(trimmed.to_string());
            }
        }

        // フィード設定の環境変数反映
        if let Ok(v) = std::env::var("TSUNAGI_FEED_PER_PAGE") {
            if let Some(value) = parse_u32(&v) {
                cfg.feed.per_page = value.clamp(1, MAX_PER_PAGE);
            }
        }
        if let Ok(v) = std::env::var("TSUNAGI_FEED_DEBOUNCE_MS") {
            if let Some(value) = parse_u64(&v) {
                cfg.feed.debounce_ms = value;
            }
        }
        if let Ok(v) = std::env::var("TSUNAGI_FEED_TAG_FETCH_LIMIT") {
            if let Some(value) = parse_u32(&v) {
                cfg.feed.popular_tag_fetch_limit = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("TSUNAGI_FEED_TAG_DISPLAY_LIMIT") {
            if let Some(value) = parse_u32(&v) {
                cfg.feed.popular_tag_display_limit = value.max(1);
            }
        }

        if let Ok(v) = std::env::var("TSUNAGI_SCROLL_THRESHOLD") {
            if let Some(value) = parse_f64(&v) {
                cfg.scroll.visibility_threshold = value;
            }
        }
        if let Ok(v) = std::env::var("TSUNAGI_SCROLL_MARGIN_PX") {
            if let Some(value) = parse_u32(&v) {
                cfg.scroll.trigger_margin_px = value;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api.base_url.trim().is_empty() {
            return Err("Api base_url must not be empty".to_string());
        }
        if self.api.request_timeout_secs == 0 {
            return Err("Api request_timeout_secs must be greater than 0".to_string());
        }
        if self.feed.per_page == 0 || self.feed.per_page > MAX_PER_PAGE {
            return Err(format!(
                "Feed per_page must be between 1 and {}",
                MAX_PER_PAGE
            ));
        }
        if self.feed.popular_tag_display_limit > self.feed.popular_tag_fetch_limit {
            return Err(
                "Feed popular_tag_display_limit must not exceed popular_tag_fetch_limit"
                    .to_string(),
            );
        }
        if !(0.0..=1.0).contains(&self.scroll.visibility_threshold) {
            return Err("Scroll visibility_threshold must be within 0.0..=1.0".to_string());
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}
