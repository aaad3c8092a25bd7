use serde::{Deserialize, Serialize};

use crate::application::services::{FeedView, LoadPhase, SharePayload};
use crate::domain::entities::{PopularTag, Post};
use crate::domain::value_objects::{PostFilters, SortKey, SortOrder, TagSelection, Visibility};
use crate::presentation::dto::Validate;
use crate::shared::config::MAX_PER_PAGE;

/// マウント時にホストから渡されるフィード初期化リクエスト
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQueryRequest {
    pub search: Option<String>,
    pub category: Option<String>,
    pub visibility: Option<String>,
    /// カンマ区切りのタグ一覧
    pub tags: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub per_page: Option<u32>,
}

impl FeedQueryRequest {
    /// 既定のフィルタに上書き指定を適用する。ページ番号は常に1に戻る。
    pub fn to_filters(&self, base: PostFilters) -> Result<PostFilters, String> {
        let mut filters = base;

        if let Some(per_page) = self.per_page {
            if per_page == 0 || per_page > MAX_PER_PAGE {
                return Err(format!(
                    "per_page は1以上{}以下で指定してください",
                    MAX_PER_PAGE
                ));
            }
            filters.set_per_page(per_page);
        }

        if let Some(search) = &self.search {
            filters.set_search(search.clone());
        }
        if let Some(category) = &self.category {
            filters.set_category(Some(category.clone()));
        }
        if let Some(raw) = &self.visibility {
            let visibility = Visibility::from_str(raw)
                .ok_or_else(|| format!("表示範囲の指定が不正です: {}", raw))?;
            filters.set_visibility(visibility);
        }
        if let Some(raw) = &self.tags {
            filters.set_tags(TagSelection::from_joined(raw));
        }

        let sort_key = match &self.sort_by {
            Some(raw) => {
                SortKey::from_str(raw).ok_or_else(|| format!("並び替えキーが不正です: {}", raw))?
            }
            None => filters.sort_key,
        };
        let sort_order = match &self.sort_order {
            Some(raw) => {
                SortOrder::from_str(raw).ok_or_else(|| format!("並び替え順が不正です: {}", raw))?
            }
            None => filters.sort_order,
        };
        filters.set_sort(sort_key, sort_order);

        Ok(filters)
    }
}

impl Validate for FeedQueryRequest {
    fn validate(&self) -> Result<(), String> {
        self.to_filters(PostFilters::default()).map(|_| ())
    }
}

/// 表示用に整形した投稿
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDto {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
    pub has_media: bool,
    pub user_id: i64,
    pub author: String,
    pub author_initial: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub visibility: String,
    pub likes_count: u32,
    pub views_count: u32,
    pub comments_count: u32,
    pub created_at: String,
    pub created_label: String,
}

impl From<&Post> for PostDto {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
            media_url: post.media_url.clone(),
            has_media: post.has_media(),
            user_id: post.user_id,
            author: post.author_label().to_string(),
            author_initial: post.author_initial().to_string(),
            category: post.category.clone(),
            tags: post.tags.clone(),
            visibility: post.visibility.as_str().to_string(),
            likes_count: post.likes_count,
            views_count: post.views_count,
            comments_count: post.comments_count,
            created_at: post.created_at.to_rfc3339(),
            created_label: post.created_at.format("%b %d, %Y").to_string(),
        }
    }
}

/// フィルタ操作UIへ返す現在値。検索とタグは未確定の入力値を返す。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterStateDto {
    pub search: String,
    pub category: Option<String>,
    pub visibility: String,
    pub tags: Vec<String>,
    pub sort_by: String,
    pub sort_order: String,
    pub page: u32,
    pub per_page: u32,
}

impl FilterStateDto {
    pub fn from_parts(canonical: &PostFilters, search_input: String, tags: &TagSelection) -> Self {
        Self {
            search: search_input,
            category: canonical.category.clone(),
            visibility: canonical.visibility.as_str().to_string(),
            tags: tags.as_slice().to_vec(),
            sort_by: canonical.sort_key.as_str().to_string(),
            sort_order: canonical.sort_order.as_str().to_string(),
            page: canonical.page,
            per_page: canonical.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularTagDto {
    pub tag: String,
    pub count: u64,
}

impl From<&PopularTag> for PopularTagDto {
    fn from(tag: &PopularTag) -> Self {
        Self {
            tag: tag.tag.clone(),
            count: tag.count,
        }
    }
}

/// サイドバー用のカテゴリと人気タグ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDto {
    pub categories: Vec<String>,
    pub popular_tags: Vec<PopularTagDto>,
}

impl CatalogDto {
    pub fn from_parts(categories: Vec<String>, popular_tags: &[PopularTag]) -> Self {
        Self {
            categories,
            popular_tags: popular_tags.iter().map(PopularTagDto::from).collect(),
        }
    }
}

/// 共有シート向けのペイロード
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePayloadDto {
    pub title: String,
    pub text: String,
}

impl From<SharePayload> for SharePayloadDto {
    fn from(payload: SharePayload) -> Self {
        Self {
            title: payload.title,
            text: payload.text,
        }
    }
}

/// ホストが描画に使うフィード全体のスナップショット
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub phase: String,
    pub posts: Vec<PostDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub has_more: bool,
    pub end_of_feed: bool,
    pub total: u64,
    /// 取得済みの最終ページ。filters.page は常に1なので区別する。
    pub current_page: u32,
    pub filters: FilterStateDto,
    pub catalog: CatalogDto,
}

impl FeedSnapshot {
    pub fn from_parts(
        view: &FeedView,
        search_input: String,
        tags: &TagSelection,
        catalog: CatalogDto,
    ) -> Self {
        Self {
            phase: phase_label(view.phase, view.posts.is_empty()).to_string(),
            posts: view.posts.iter().map(PostDto::from).collect(),
            error: view.error.clone(),
            has_more: view.has_more,
            end_of_feed: !view.has_more && !view.posts.is_empty() && view.phase == LoadPhase::Idle,
            total: view.total,
            current_page: view.current_page,
            filters: FilterStateDto::from_parts(&view.filters, search_input, tags),
            catalog,
        }
    }
}

// 空状態は保持せず、投稿ゼロのIdleから導出する
fn phase_label(phase: LoadPhase, no_posts: bool) -> &'static str {
    match phase {
        LoadPhase::Idle if no_posts => "empty",
        LoadPhase::Idle => "idle",
        LoadPhase::LoadingInitial => "loading",
        LoadPhase::LoadingMore => "loading_more",
        LoadPhase::Error => "error",
    }
}
