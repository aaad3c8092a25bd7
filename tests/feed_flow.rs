use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::yield_now;
use tokio::time::{self, Duration};

use tsunagi_feed::application::ports::{FeedGateway, FeedPage, PageInfo};
use tsunagi_feed::domain::entities::{PopularTag, Post};
use tsunagi_feed::domain::value_objects::{PostFilters, SortKey, Visibility};
use tsunagi_feed::infrastructure::ui::{ChannelVisibilityNotifier, ObserverCommand};
use tsunagi_feed::{AppConfig, AppError, AppState, FeedQueryRequest};

/// テスト用のインメモリ投稿API。実サーバと同じページング規則で応える。
struct InMemoryApi {
    posts: Vec<Post>,
    fetch_calls: Mutex<Vec<PostFilters>>,
    like_calls: Mutex<Vec<i64>>,
    fail_next_fetch: AtomicBool,
    held_page: Mutex<Option<(u32, Arc<Notify>)>>,
}

impl InMemoryApi {
    fn with_posts(count: i64) -> Self {
        Self {
            posts: (1..=count).map(make_post).collect(),
            fetch_calls: Mutex::new(Vec::new()),
            like_calls: Mutex::new(Vec::new()),
            fail_next_fetch: AtomicBool::new(false),
            held_page: Mutex::new(None),
        }
    }

    // 指定ページへの次の応答を、合図があるまで保留する
    async fn hold_page(&self, page: u32, gate: Arc<Notify>) {
        *self.held_page.lock().await = Some((page, gate));
    }

    fn matching(&self, filters: &PostFilters) -> Vec<Post> {
        self.posts
            .iter()
            .filter(|post| {
                (filters.search.is_empty() || post.title.contains(&filters.search))
                    && filters
                        .category
                        .as_ref()
                        .is_none_or(|c| post.category.as_deref() == Some(c.as_str()))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FeedGateway for InMemoryApi {
    async fn fetch_page(&self, filters: &PostFilters) -> Result<FeedPage, AppError> {
        self.fetch_calls.lock().await.push(filters.clone());
        let gate = {
            let mut held = self.held_page.lock().await;
            if held.as_ref().is_some_and(|(page, _)| *page == filters.page) {
                held.take().map(|(_, gate)| gate)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(AppError::Network("connection refused".to_string()));
        }

        let matched = self.matching(filters);
        let per_page = filters.per_page.max(1) as usize;
        let page = filters.page.max(1) as usize;
        let items: Vec<Post> = matched
            .iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .cloned()
            .collect();
        let pages = (matched.len().div_ceil(per_page)).max(1) as u32;
        let has_next = (page as u32) < pages;
        Ok(FeedPage {
            posts: items,
            pagination: PageInfo {
                page: page as u32,
                per_page: filters.per_page,
                total: matched.len() as u64,
                pages,
                has_next,
                has_prev: page > 1,
                next_num: has_next.then(|| page as u32 + 1),
                prev_num: (page > 1).then(|| page as u32 - 1),
            },
        })
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, AppError> {
        Ok(vec!["tech".to_string(), "life".to_string()])
    }

    async fn fetch_popular_tags(&self, limit: u32) -> Result<Vec<PopularTag>, AppError> {
        Ok((0..limit.min(4))
            .map(|i| PopularTag {
                tag: format!("tag{i}"),
                count: 10 - i as u64,
            })
            .collect())
    }

    async fn like_post(&self, post_id: i64) -> Result<u32, AppError> {
        self.like_calls.lock().await.push(post_id);
        self.posts
            .iter()
            .find(|post| post.id == post_id)
            .map(|post| post.likes_count + 1)
            .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))
    }
}

fn make_post(id: i64) -> Post {
    let rustish = id % 2 == 0;
    Post {
        id,
        title: if rustish {
            format!("rust tip {id}")
        } else {
            format!("daily note {id}")
        },
        content: format!("body of post {id}"),
        media_url: None,
        user_id: 100 + id,
        category: Some(if rustish { "tech" } else { "life" }.to_string()),
        tags: Vec::new(),
        visibility: Visibility::Public,
        likes_count: (id % 7) as u32,
        views_count: (id * 3) as u32,
        comments_count: 0,
        created_at: Utc::now(),
        updated_at: None,
        user: Some(format!("user{id}")),
    }
}

fn build_state(
    post_count: i64,
) -> (
    AppState,
    Arc<InMemoryApi>,
    mpsc::UnboundedReceiver<ObserverCommand>,
) {
    let api = Arc::new(InMemoryApi::with_posts(post_count));
    let (notifier, commands) = ChannelVisibilityNotifier::new();
    let state = AppState::with_components(AppConfig::default(), api.clone(), Arc::new(notifier));
    (state, api, commands)
}

// 即時反映の操作後、集約器からドライバまでのタスク連鎖を流しきる
async fn drain() {
    for _ in 0..8 {
        yield_now().await;
    }
}

// デバウンスを挟む操作用。時計を進めてから連鎖を流す。
async fn advance_and_drain(step: Duration) {
    yield_now().await;
    time::advance(step).await;
    drain().await;
}

/// 初期ロード→番兵の可視化イベントでページを継ぎ足し、末尾で止まる一連の流れ
#[tokio::test]
async fn initial_load_then_sentinel_pagination() {
    let (state, api, mut commands) = build_state(25);
    state.start(None).await.unwrap();

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.phase, "idle");
    assert_eq!(snapshot.posts.len(), 10);
    assert_eq!(snapshot.total, 25);
    assert_eq!(snapshot.current_page, 1);
    assert!(snapshot.has_more);
    assert!(!snapshot.end_of_feed);
    assert_eq!(snapshot.catalog.categories, ["tech", "life"]);
    assert!(!snapshot.catalog.popular_tags.is_empty());

    state.handler.watch_sentinel("feed-end").await.unwrap();
    match commands.recv().await {
        Some(ObserverCommand::Observe {
            sentinel,
            threshold,
            margin_px,
        }) => {
            assert_eq!(sentinel.as_str(), "feed-end");
            assert!((threshold - 0.1).abs() < f64::EPSILON);
            assert_eq!(margin_px, 100);
        }
        other => panic!("expected observe command, got {other:?}"),
    }

    state.handler.sentinel_visible("feed-end").await.unwrap();
    assert_eq!(state.handler.snapshot().await.posts.len(), 20);

    state.handler.sentinel_visible("feed-end").await.unwrap();
    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.posts.len(), 25);
    assert!(!snapshot.has_more);
    assert!(snapshot.end_of_feed);
    // ページ番号は取得済みの末尾を指し、リクエスト側のpageは1のまま
    assert_eq!(snapshot.current_page, 3);
    assert_eq!(snapshot.filters.page, 1);

    // 末尾到達後の可視化イベントは API に届かない
    state.handler.sentinel_visible("feed-end").await.unwrap();
    {
        let calls = api.fetch_calls.lock().await;
        assert_eq!(calls.iter().map(|f| f.page).collect::<Vec<_>>(), [1, 2, 3]);
    }

    state.shutdown().await;
    let mut saw_unobserve = false;
    while let Ok(command) = commands.try_recv() {
        if matches!(command, ObserverCommand::Unobserve { .. }) {
            saw_unobserve = true;
        }
    }
    assert!(saw_unobserve, "shutdown must release the watched sentinel");
}

/// 追加読み込み中にフィルタが確定しても、番兵イベントでの継ぎ足しは止まらない
#[tokio::test]
async fn filter_change_during_load_more_keeps_paging() {
    let (state, api, _commands) = build_state(25);
    state.start(None).await.unwrap();
    state.handler.watch_sentinel("feed-end").await.unwrap();

    // ページ2の応答を保留して、その間にカテゴリ変更を割り込ませる
    let gate = Arc::new(Notify::new());
    api.hold_page(2, gate.clone()).await;
    let held = {
        let handler = state.handler.clone();
        tokio::spawn(async move { handler.sentinel_visible("feed-end").await })
    };
    yield_now().await;

    state.handler.set_category(Some("tech".to_string())).await;
    drain().await;

    gate.notify_one();
    held.await.unwrap().unwrap();

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.total, 12);
    assert_eq!(snapshot.posts.len(), 10, "late page must not be appended");
    assert!(snapshot.has_more);
    assert!(
        state.scroll.has_more(),
        "late response must not stop the watcher"
    );
    assert_eq!(state.metrics.snapshot().stale_discards, 1);

    // 次の可視化イベントは新フィルタの2ページ目を取りに行く
    state.handler.sentinel_visible("feed-end").await.unwrap();
    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.posts.len(), 12);
    assert!(!snapshot.has_more);
    {
        let calls = api.fetch_calls.lock().await;
        let last = calls.last().unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.category.as_deref(), Some("tech"));
    }
}

/// 検索語のタイプ中は読み込みが走らず、静止後に1回だけ走る
#[tokio::test(start_paused = true)]
async fn search_typing_debounces_to_one_request() {
    let (state, api, _commands) = build_state(25);
    state.start(None).await.unwrap();
    assert_eq!(api.fetch_calls.lock().await.len(), 1);

    for text in ["r", "ru", "rust"] {
        state.handler.set_search(text).await;
        advance_and_drain(Duration::from_millis(200)).await;
    }
    assert_eq!(
        api.fetch_calls.lock().await.len(),
        1,
        "typing must not trigger fetches"
    );

    advance_and_drain(Duration::from_millis(500)).await;
    {
        let calls = api.fetch_calls.lock().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].search, "rust");
        assert_eq!(calls[1].page, 1);
    }

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.total, 12, "only the rust tips remain");
    assert_eq!(snapshot.filters.search, "rust");
}

/// マウント時の上書き指定が最初のリクエストに反映される
#[tokio::test]
async fn mount_overrides_shape_the_first_request() {
    let (state, api, _commands) = build_state(25);
    let request = FeedQueryRequest {
        category: Some("tech".to_string()),
        per_page: Some(5),
        sort_by: Some("likes_count".to_string()),
        sort_order: Some("asc".to_string()),
        ..FeedQueryRequest::default()
    };
    state.start(Some(request)).await.unwrap();

    {
        let calls = api.fetch_calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].per_page, 5);
        assert_eq!(calls[0].category.as_deref(), Some("tech"));
        assert_eq!(calls[0].sort_key, SortKey::LikesCount);
        assert_eq!(calls[0].page, 1);
    }

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.posts.len(), 5);
    assert_eq!(snapshot.total, 12);
    assert_eq!(snapshot.filters.per_page, 5);
}

/// 不正な上書き指定は検証で弾かれ、APIには到達しない
#[tokio::test]
async fn invalid_mount_overrides_are_rejected() {
    let (state, api, _commands) = build_state(5);
    let request = FeedQueryRequest {
        visibility: Some("friends".to_string()),
        ..FeedQueryRequest::default()
    };
    let err = state.start(Some(request)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert!(api.fetch_calls.lock().await.is_empty());
}

/// 再読込の失敗は表示中の一覧を消さず、次の操作で回復する
#[tokio::test]
async fn fetch_failure_keeps_posts_and_recovers() {
    let (state, api, _commands) = build_state(25);
    state.start(None).await.unwrap();
    assert_eq!(state.handler.snapshot().await.posts.len(), 10);

    api.fail_next_fetch.store(true, Ordering::SeqCst);
    state.handler.set_category(Some("tech".to_string())).await;
    drain().await;

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.phase, "error");
    assert_eq!(snapshot.error.as_deref(), Some("Failed to load posts"));
    assert_eq!(snapshot.posts.len(), 10, "stale list stays visible");

    state.handler.set_category(None).await;
    drain().await;

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.phase, "idle");
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.posts.len(), 10);
}

/// いいねは即時にカウントへ反映され、裏でAPIに一度だけ届く
#[tokio::test]
async fn like_updates_count_and_reaches_backend() {
    let (state, api, _commands) = build_state(5);
    state.start(None).await.unwrap();

    let first = state.handler.snapshot().await.posts[0].clone();
    let likes = state.handler.like_post(first.id).await.unwrap();
    assert_eq!(likes, first.likes_count + 1);

    drain().await;
    assert_eq!(*api.like_calls.lock().await, vec![first.id]);

    let snapshot = state.handler.snapshot().await;
    assert_eq!(snapshot.posts[0].likes_count, first.likes_count + 1);
}

/// クリアは保留中のデバウンスもまとめて破棄し、1回の再読込に収まる
#[tokio::test(start_paused = true)]
async fn clear_filters_causes_a_single_reload() {
    let (state, api, _commands) = build_state(25);
    state.start(None).await.unwrap();

    state.handler.set_category(Some("tech".to_string())).await;
    drain().await;
    assert_eq!(api.fetch_calls.lock().await.len(), 2);

    state.handler.set_search("rust").await;
    advance_and_drain(Duration::from_millis(100)).await;

    state.handler.clear_filters().await;
    drain().await;

    advance_and_drain(Duration::from_millis(1000)).await;
    {
        let calls = api.fetch_calls.lock().await;
        assert_eq!(calls.len(), 3, "clear must reload exactly once");
        assert_eq!(calls[2].search, "");
        assert_eq!(calls[2].category, None);
        assert_eq!(calls[2].page, 1);
    }
}
