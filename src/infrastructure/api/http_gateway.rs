use crate::application::ports::feed_gateway::{FeedGateway, FeedPage};
use crate::domain::entities::{PopularTag, Post};
use crate::domain::value_objects::PostFilters;
use crate::shared::config::{ApiConfig, MAX_PER_PAGE};
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const ERROR_BODY_EXCERPT: usize = 200;

/// Posts API への reqwest 実装。
#[derive(Clone)]
pub struct HttpFeedGateway {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

#[derive(Deserialize)]
struct CategoriesEnvelope {
    categories: Vec<String>,
}

#[derive(Deserialize)]
struct PopularTagsEnvelope {
    tags: Vec<PopularTag>,
}

#[derive(Deserialize)]
struct LikeEnvelope {
    likes_count: u32,
}

impl HttpFeedGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let trimmed = config.base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::ConfigurationError(
                "api base_url is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self {
            http,
            base_url: trimmed.trim_end_matches('/').to_string(),
            bearer_token: config
                .bearer_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);
        if let Some(token) = &self.bearer_token {
            builder.header("Authorization", format!("Bearer {token}"))
        } else {
            builder
        }
    }

    /// 空値のパラメータは付けない。バックエンドの既定に任せる。
    fn query_pairs(filters: &PostFilters) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", filters.page.max(1).to_string()),
            (
                "per_page",
                filters.per_page.clamp(1, MAX_PER_PAGE).to_string(),
            ),
            ("visibility", filters.visibility.as_str().to_string()),
            ("sort_by", filters.sort_key.as_str().to_string()),
            ("sort_order", filters.sort_order.as_str().to_string()),
        ];
        if !filters.search.is_empty() {
            pairs.push(("search", filters.search.clone()));
        }
        if let Some(category) = &filters.category {
            pairs.push(("category", category.clone()));
        }
        if !filters.tags.is_empty() {
            pairs.push(("tags", filters.tags.to_joined()));
        }
        pairs
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AppError> {
        let status = resp.status();
        let body = resp.text().await.map_err(AppError::from)?;
        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                message: excerpt(&body),
            });
        }
        serde_json::from_str(&body).map_err(AppError::from)
    }

    /// 相対パスで届いた画像 URL を API ベースに対して絶対化する。
    fn absolutize_media(&self, posts: &mut [Post]) {
        for post in posts {
            if let Some(url) = &post.media_url {
                if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                    post.media_url =
                        Some(format!("{}/{}", self.base_url, url.trim_start_matches('/')));
                }
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_EXCERPT {
        body.to_string()
    } else {
        body.chars().take(ERROR_BODY_EXCERPT).collect()
    }
}

#[async_trait]
impl FeedGateway for HttpFeedGateway {
    async fn fetch_page(&self, filters: &PostFilters) -> Result<FeedPage, AppError> {
        let resp = self
            .request(Method::GET, "/api/posts")
            .query(&Self::query_pairs(filters))
            .send()
            .await?;
        let mut page: FeedPage = Self::decode(resp).await?;
        self.absolutize_media(&mut page.posts);
        Ok(page)
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, AppError> {
        let resp = self
            .request(Method::GET, "/api/posts/categories")
            .send()
            .await?;
        let envelope: CategoriesEnvelope = Self::decode(resp).await?;
        Ok(envelope.categories)
    }

    async fn fetch_popular_tags(&self, limit: u32) -> Result<Vec<PopularTag>, AppError> {
        let resp = self
            .request(Method::GET, "/api/posts/popular-tags")
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        let envelope: PopularTagsEnvelope = Self::decode(resp).await?;
        Ok(envelope.tags)
    }

    async fn like_post(&self, post_id: i64) -> Result<u32, AppError> {
        let resp = self
            .request(Method::POST, &format!("/api/posts/{post_id}/like"))
            .send()
            .await?;
        let envelope: LikeEnvelope = Self::decode(resp).await?;
        Ok(envelope.likes_count)
    }
}
