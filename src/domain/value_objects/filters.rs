use serde::{Deserialize, Serialize};

use super::{SortKey, SortOrder, TagSelection, Visibility};
use crate::shared::config::MAX_PER_PAGE;

pub const DEFAULT_PER_PAGE: u32 = 10;

/// クエリ構築に使う正規化済みフィルタ。page 以外のフィールドを
/// 変更する操作は必ず page を 1 に戻す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFilters {
    pub search: String,
    pub category: Option<String>,
    pub visibility: Visibility,
    pub tags: TagSelection,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: u32,
    pub per_page: u32,
}

impl Default for PostFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            visibility: Visibility::Public,
            tags: TagSelection::new(),
            sort_key: SortKey::CreatedAt,
            sort_order: SortOrder::Desc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PostFilters {
    pub fn with_per_page(per_page: u32) -> Self {
        Self {
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            ..Self::default()
        }
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category.filter(|c| !c.trim().is_empty());
        self.page = 1;
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.page = 1;
    }

    pub fn set_tags(&mut self, tags: TagSelection) {
        self.tags = tags;
        self.page = 1;
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        self.tags.toggle(tag);
        self.page = 1;
    }

    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort_key = key;
        self.sort_order = order;
        self.page = 1;
    }

    pub fn set_per_page(&mut self, per_page: u32) {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self.page = 1;
    }

    /// page だけは他フィールドを据え置いたまま動かせる。
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_page_three() -> PostFilters {
        let mut filters = PostFilters::default();
        filters.set_page(3);
        filters
    }

    #[test]
    fn defaults_match_initial_controls() {
        let filters = PostFilters::default();
        assert_eq!(filters.search, "");
        assert_eq!(filters.category, None);
        assert_eq!(filters.visibility, Visibility::Public);
        assert!(filters.tags.is_empty());
        assert_eq!(filters.sort_key, SortKey::CreatedAt);
        assert_eq!(filters.sort_order, SortOrder::Desc);
        assert_eq!(filters.page, 1);
        assert_eq!(filters.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn every_non_page_mutation_resets_page() {
        let mut filters = on_page_three();
        filters.set_search("rust");
        assert_eq!(filters.page, 1);

        let mut filters = on_page_three();
        filters.set_category(Some("career".to_string()));
        assert_eq!(filters.page, 1);

        let mut filters = on_page_three();
        filters.set_visibility(Visibility::Private);
        assert_eq!(filters.page, 1);

        let mut filters = on_page_three();
        filters.toggle_tag("remote");
        assert_eq!(filters.page, 1);

        let mut filters = on_page_three();
        filters.set_sort(SortKey::LikesCount, SortOrder::Asc);
        assert_eq!(filters.page, 1);

        let mut filters = on_page_three();
        filters.set_per_page(20);
        assert_eq!(filters.page, 1);
    }

    #[test]
    fn set_page_leaves_other_fields_alone() {
        let mut filters = PostFilters::default();
        filters.set_search("rust");
        filters.set_page(4);
        assert_eq!(filters.page, 4);
        assert_eq!(filters.search, "rust");
    }

    #[test]
    fn per_page_is_clamped_to_backend_limit() {
        let mut filters = PostFilters::default();
        filters.set_per_page(500);
        assert_eq!(filters.per_page, MAX_PER_PAGE);
        filters.set_per_page(0);
        assert_eq!(filters.per_page, 1);
    }

    #[test]
    fn blank_category_normalizes_to_none() {
        let mut filters = PostFilters::default();
        filters.set_category(Some("  ".to_string()));
        assert_eq!(filters.category, None);
    }
}
