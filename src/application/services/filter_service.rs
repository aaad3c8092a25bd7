use crate::domain::value_objects::{PostFilters, SortKey, SortOrder, TagSelection, Visibility};
use crate::shared::debounce::Debouncer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;

struct ControlsState {
    /// 最後に公開した正規化フィルタ。常に page = 1。
    canonical: PostFilters,
    /// デバウンス確定前の生の入力値。
    raw_search: String,
    raw_tags: TagSelection,
}

struct AggregatorInner {
    state: RwLock<ControlsState>,
    emissions: mpsc::UnboundedSender<PostFilters>,
}

impl AggregatorInner {
    /// canonical を所定の変更で作り直し、実際に変わったときだけ流す。
    async fn update_canonical(&self, apply: impl FnOnce(&mut PostFilters)) {
        let mut state = self.state.write().await;
        let mut next = state.canonical.clone();
        apply(&mut next);
        if next != state.canonical {
            state.canonical = next.clone();
            let _ = self.emissions.send(next);
        }
    }

    async fn commit_search(&self, settled: String) {
        {
            let state = self.state.read().await;
            if settled != state.raw_search {
                // 確定後に入力が進んでいる。新しい確定値を待つ。
                debug!("ignoring stale settled search value");
                return;
            }
        }
        self.update_canonical(|f| f.set_search(settled)).await;
    }

    async fn commit_tags(&self, settled: TagSelection) {
        {
            let state = self.state.read().await;
            if settled != state.raw_tags {
                debug!("ignoring stale settled tag selection");
                return;
            }
        }
        self.update_canonical(|f| f.set_tags(settled)).await;
    }
}

/// 各フィルタ操作を 1 本の正規化フィルタにまとめる集約器。
/// 検索語とタグ選択はデバウンスを介してから canonical に反映し、
/// それ以外の操作は即時反映する。canonical が変わるたびに
/// 購読側 (フィードのドライバ) へ送る。
pub struct FilterAggregator {
    inner: Arc<AggregatorInner>,
    search_debouncer: Debouncer<String>,
    tags_debouncer: Debouncer<TagSelection>,
}

impl FilterAggregator {
    pub fn new(
        initial: PostFilters,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PostFilters>) {
        let mut canonical = initial;
        canonical.set_page(1);

        let (emissions_tx, emissions_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(AggregatorInner {
            state: RwLock::new(ControlsState {
                raw_search: canonical.search.clone(),
                raw_tags: canonical.tags.clone(),
                canonical,
            }),
            emissions: emissions_tx,
        });

        let (search_debouncer, mut search_rx) = Debouncer::new(debounce);
        let (tags_debouncer, mut tags_rx) = Debouncer::new(debounce);

        let worker = Arc::clone(&inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(settled) = search_rx.recv() => worker.commit_search(settled).await,
                    Some(settled) = tags_rx.recv() => worker.commit_tags(settled).await,
                    else => break,
                }
            }
        });

        (
            Self {
                inner,
                search_debouncer,
                tags_debouncer,
            },
            emissions_rx,
        )
    }

    /// 検索欄の入力。確定はデバウンス後。
    pub async fn set_search_input(&self, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.inner.state.write().await;
            state.raw_search = text.clone();
        }
        self.search_debouncer.push(text);
    }

    /// タグの付け外し。確定はデバウンス後。
    pub async fn toggle_tag(&self, tag: &str) {
        let selection = {
            let mut state = self.inner.state.write().await;
            state.raw_tags.toggle(tag);
            state.raw_tags.clone()
        };
        self.tags_debouncer.push(selection);
    }

    pub async fn set_category(&self, category: Option<String>) {
        self.inner
            .update_canonical(|f| f.set_category(category))
            .await;
    }

    pub async fn set_visibility(&self, visibility: Visibility) {
        self.inner
            .update_canonical(|f| f.set_visibility(visibility))
            .await;
    }

    pub async fn set_sort(&self, key: SortKey, order: SortOrder) {
        self.inner.update_canonical(|f| f.set_sort(key, order)).await;
    }

    pub async fn set_per_page(&self, per_page: u32) {
        self.inner
            .update_canonical(|f| f.set_per_page(per_page))
            .await;
    }

    /// 全フィルタを既定値へ戻す。page size は据え置き。
    /// 保留中のデバウンス値はここで無効になり、発行は一度きり。
    pub async fn clear_filters(&self) {
        let mut state = self.inner.state.write().await;
        state.raw_search.clear();
        state.raw_tags = TagSelection::new();
        let next = PostFilters::with_per_page(state.canonical.per_page);
        if next != state.canonical {
            state.canonical = next.clone();
            let _ = self.inner.emissions.send(next);
        }
    }

    /// マウント時の上書き指定を初期状態として据える。
    /// 初回ロードは呼び出し側が明示的に行うため、ここでは発行しない。
    pub async fn reset_to(&self, filters: PostFilters) {
        let mut canonical = filters;
        canonical.set_page(1);
        let mut state = self.inner.state.write().await;
        state.raw_search = canonical.search.clone();
        state.raw_tags = canonical.tags.clone();
        state.canonical = canonical;
    }

    pub async fn current(&self) -> PostFilters {
        self.inner.state.read().await.canonical.clone()
    }

    /// UI 表示用の生タグ選択 (デバウンス確定前)。
    pub async fn selected_tags(&self) -> TagSelection {
        self.inner.state.read().await.raw_tags.clone()
    }

    pub async fn search_input(&self) -> String {
        self.inner.state.read().await.raw_search.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    const DEBOUNCE: Duration = Duration::from_millis(500);

    // push -> デバウンサ -> 集約ワーカーの 2 段を確実に走らせる
    async fn settle(ms: u64) {
        tokio::task::yield_now().await;
        time::advance(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn typing_collapses_to_single_emission() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);

        for text in ["r", "ru", "rust"] {
            filters.set_search_input(text).await;
            settle(200).await;
        }
        assert!(emissions.try_recv().is_err(), "nothing settles mid-typing");

        settle(500).await;
        let emitted = emissions.recv().await.unwrap();
        assert_eq!(emitted.search, "rust");
        assert_eq!(emitted.page, 1);
        assert!(emissions.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn category_change_emits_immediately() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);

        filters.set_category(Some("career".to_string())).await;
        let emitted = emissions.try_recv().unwrap();
        assert_eq!(emitted.category.as_deref(), Some("career"));
        assert_eq!(emitted.page, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_value_does_not_reemit() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);

        filters.set_category(Some("career".to_string())).await;
        assert!(emissions.try_recv().is_ok());
        filters.set_category(Some("career".to_string())).await;
        assert!(emissions.try_recv().is_err());

        filters.set_visibility(Visibility::Public).await;
        assert!(emissions.try_recv().is_err(), "default visibility is a no-op");
    }

    #[tokio::test(start_paused = true)]
    async fn tag_toggles_settle_in_insertion_order() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);

        filters.toggle_tag("a").await;
        settle(100).await;
        filters.toggle_tag("b").await;
        settle(500).await;

        let emitted = emissions.recv().await.unwrap();
        assert_eq!(emitted.tags.to_joined(), "a,b");
        assert!(emissions.try_recv().is_err());

        filters.toggle_tag("a").await;
        settle(500).await;
        let emitted = emissions.recv().await.unwrap();
        assert_eq!(emitted.tags.to_joined(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_filters_is_one_atomic_emission() {
        let mut initial = PostFilters::default();
        initial.set_per_page(20);
        let (filters, mut emissions) = FilterAggregator::new(initial, DEBOUNCE);

        filters.set_category(Some("career".to_string())).await;
        filters.set_visibility(Visibility::Private).await;
        filters.toggle_tag("remote").await;
        settle(500).await;
        while emissions.try_recv().is_ok() {}

        // 確定前の検索入力は clear で無効になる
        filters.set_search_input("pending").await;
        settle(100).await;

        filters.clear_filters().await;
        let emitted = emissions.try_recv().unwrap();
        assert_eq!(emitted, PostFilters::with_per_page(20));

        settle(1000).await;
        assert!(
            emissions.try_recv().is_err(),
            "pending debounce must not fire after clear"
        );
        assert_eq!(filters.current().await.search, "");
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_default_state_emits_nothing() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);
        filters.clear_filters().await;
        assert!(emissions.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sort_and_per_page_reset_page_to_one() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);

        filters.set_sort(SortKey::LikesCount, SortOrder::Asc).await;
        let emitted = emissions.try_recv().unwrap();
        assert_eq!(emitted.sort_key, SortKey::LikesCount);
        assert_eq!(emitted.page, 1);

        filters.set_per_page(25).await;
        let emitted = emissions.try_recv().unwrap();
        assert_eq!(emitted.per_page, 25);
        assert_eq!(emitted.page, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_seeds_state_without_emitting() {
        let (filters, mut emissions) = FilterAggregator::new(PostFilters::default(), DEBOUNCE);

        let mut seeded = PostFilters::default();
        seeded.set_search("rust".to_string());
        seeded.toggle_tag("async");
        seeded.set_page(4);
        filters.reset_to(seeded).await;

        assert!(emissions.try_recv().is_err(), "reset must stay silent");
        let current = filters.current().await;
        assert_eq!(current.search, "rust");
        assert_eq!(current.page, 1);
        assert_eq!(filters.search_input().await, "rust");
        assert_eq!(filters.selected_tags().await.to_joined(), "async");
    }
}
