use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{filter_items, paginate, Favorites, Page};
use crate::config::Config;
use crate::db::{
    load_json, save_json, KeyValueStore, FAVORITES_KEY, LOCAL_REVIEWS_KEY, PROMOTION_VIEWS_KEY,
    SORT_POPULARITY_KEY,
};
use crate::error::{AppError, Result};
use crate::models::{
    clamp_stars, parse_reviews, Item, PopularityInfo, PromotionConfig, PromotionStats, Review,
    ReviewSource, ViewsData,
};
use crate::promotions::PromotionLimiter;
use crate::ranking::{
    normalize, reconcile, review_key, PopularityCache, PopularityContext, PopularityParams,
};

pub const MAX_AUTHOR_CHARS: usize = 50;
pub const MAX_COMMENT_CHARS: usize = 500;

/// A review as typed by a user, before validation.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub author: String,
    pub item: String,
    pub comment: String,
    pub stars: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotedItem {
    pub promotion: PromotionConfig,
    pub item: Item,
}

/// One browsing session over the catalog. Owns the derived caches and
/// rebuilds them wholesale whenever the underlying data changes.
pub struct Session<S: KeyValueStore> {
    // Data
    pub items: Vec<Item>,
    remote_reviews: Vec<Review>,
    local_reviews: Vec<Review>,
    promotions: Vec<PromotionConfig>,

    // Derived
    popularity: PopularityContext,
    cache: PopularityCache,
    limiter: PromotionLimiter,

    // Preferences
    pub favorites: Favorites,
    popularity_sort: bool,
    page_size: usize,
    params: PopularityParams,

    store: S,
}

impl<S: KeyValueStore> Session<S> {
    pub async fn new(
        store: S,
        config: &Config,
        promotions: Vec<PromotionConfig>,
        today: NaiveDate,
    ) -> Result<Self> {
        let views: ViewsData = load_json(&store, PROMOTION_VIEWS_KEY)
            .await?
            .unwrap_or_default();
        let limiter = PromotionLimiter::from_views(views, today);
        save_json(&store, PROMOTION_VIEWS_KEY, &limiter.to_views()).await?;

        let favorites: Favorites = load_json(&store, FAVORITES_KEY).await?.unwrap_or_default();
        let popularity_sort = load_json(&store, SORT_POPULARITY_KEY)
            .await?
            .unwrap_or(config.popularity_sort);

        let local_values: Vec<Value> = load_json(&store, LOCAL_REVIEWS_KEY)
            .await?
            .unwrap_or_default();
        let local_reviews = parse_reviews(local_values, ReviewSource::Local);

        info!(
            "Session opened for {}: {} promotions, {} pending local reviews, {} favorites",
            today,
            promotions.len(),
            local_reviews.len(),
            favorites.entries().len()
        );

        let params = config.popularity.clone();
        Ok(Self {
            items: Vec::new(),
            remote_reviews: Vec::new(),
            local_reviews,
            promotions,
            popularity: PopularityContext::new(Vec::new(), params.clone()),
            cache: PopularityCache::default(),
            limiter,
            favorites,
            popularity_sort,
            page_size: config.page_size,
            params,
            store,
        })
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Replaces the catalog and the remote review list, then reconciles the
    /// local queue against it.
    pub async fn load_catalog(&mut self, items: Vec<Item>, remote_reviews: Vec<Review>) -> Result<()> {
        self.items = items;
        self.remote_reviews = remote_reviews;
        self.reconcile_local().await
    }

    async fn reconcile_local(&mut self) -> Result<()> {
        let original_len = self.local_reviews.len();
        let out = reconcile(&self.remote_reviews, &self.local_reviews);

        if out.local_changed(original_len) {
            info!(
                "Dropping {} local reviews already confirmed remotely",
                original_len - out.pruned_local.len()
            );
            if out.pruned_local.is_empty() {
                self.store.remove(LOCAL_REVIEWS_KEY).await?;
            } else {
                save_json(&self.store, LOCAL_REVIEWS_KEY, &out.pruned_local).await?;
            }
            self.local_reviews = out.pruned_local;
        }

        info!(
            "Loaded {} unique reviews ({} remote, {} local)",
            out.merged.len(),
            self.remote_reviews.len(),
            self.local_reviews.len()
        );

        self.rebuild(out.merged);
        Ok(())
    }

    fn rebuild(&mut self, merged: Vec<Review>) {
        self.popularity = PopularityContext::new(merged, self.params.clone());
        self.cache = self.popularity.build_cache(&self.items);
    }

    pub fn reviews(&self) -> &[Review] {
        self.popularity.reviews()
    }

    pub fn pending_local(&self) -> &[Review] {
        &self.local_reviews
    }

    pub fn item_reviews(&self, title: &str) -> Vec<&Review> {
        let key = normalize(title);
        self.reviews()
            .iter()
            .filter(|r| normalize(&r.item) == key)
            .collect()
    }

    pub fn global_mean(&self) -> f64 {
        self.popularity.global_mean()
    }

    pub fn popularity(&self, title: &str) -> PopularityInfo {
        self.cache.get(title)
    }

    pub fn find_item(&self, title: &str) -> Option<&Item> {
        let key = normalize(title);
        self.items.iter().find(|i| normalize(&i.title) == key)
    }

    pub fn has_user_reviewed(&self, title: &str, user: &str) -> bool {
        let user = normalize(user);
        !user.is_empty()
            && self
                .item_reviews(title)
                .iter()
                .any(|r| normalize(&r.author) == user)
    }

    // Sorting

    pub fn popularity_sort_enabled(&self) -> bool {
        self.popularity_sort
    }

    pub async fn set_popularity_sort(&mut self, enabled: bool) -> Result<()> {
        self.popularity_sort = enabled;
        save_json(&self.store, SORT_POPULARITY_KEY, &enabled).await
    }

    /// Items matching `term`, ranked when popularity sorting is on.
    pub fn search(&self, term: &str) -> Vec<Item> {
        let mut found = filter_items(&self.items, term);
        if self.popularity_sort {
            self.cache.rank(&mut found);
        }
        debug!("Search {:?} matched {} items", term, found.len());
        found
    }

    /// The main listing: search results minus favorites and the items
    /// currently shown as promotions.
    pub fn listing(&self, term: &str, page: usize, promoted: &[PromotedItem]) -> Page<Item> {
        let promoted_keys: Vec<String> = promoted.iter().map(|p| normalize(&p.item.title)).collect();
        let rest: Vec<Item> = self
            .search(term)
            .into_iter()
            .filter(|i| !self.favorites.is_favorite(i))
            .filter(|i| !promoted_keys.contains(&normalize(&i.title)))
            .collect();
        paginate(&rest, page, self.page_size)
    }

    // Favorites

    pub async fn toggle_favorite(&mut self, title: &str) -> Result<bool> {
        let item = self
            .find_item(title)
            .cloned()
            .ok_or_else(|| AppError::InvalidInput(format!("unknown item: {}", title)))?;
        let now_favorite = self.favorites.toggle(&item);
        save_json(&self.store, FAVORITES_KEY, &self.favorites).await?;
        Ok(now_favorite)
    }

    // Promotions

    /// Promotions to render now. Each returned promotion counts as one view.
    pub async fn eligible_promotions(&mut self, today: NaiveDate) -> Result<Vec<PromotedItem>> {
        let known: Vec<PromotionConfig> = self
            .promotions
            .iter()
            .filter(|p| self.find_item(&p.item_key).is_some())
            .cloned()
            .collect();

        let eligible = self.limiter.select_eligible(&known, today);
        save_json(&self.store, PROMOTION_VIEWS_KEY, &self.limiter.to_views()).await?;

        Ok(eligible
            .into_iter()
            .filter_map(|promotion| {
                let item = self.find_item(&promotion.item_key)?.clone();
                Some(PromotedItem { promotion, item })
            })
            .collect())
    }

    pub fn promotion_stats(&self) -> Vec<PromotionStats> {
        self.limiter.stats(&self.promotions)
    }

    // Review submission

    /// Validates a review and queues it locally until the remote store
    /// confirms it.
    pub async fn submit_review(&mut self, new: NewReview, today: NaiveDate) -> Result<Review> {
        let author = new.author.trim().to_string();
        let comment = new.comment.trim().to_string();

        if author.is_empty() || comment.is_empty() {
            return Err(AppError::InvalidInput("author and comment are required".into()));
        }
        if author.chars().count() > MAX_AUTHOR_CHARS {
            return Err(AppError::InvalidInput(format!(
                "author longer than {} characters",
                MAX_AUTHOR_CHARS
            )));
        }
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::InvalidInput(format!(
                "comment longer than {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        let stars = clamp_stars(new.stars as f64);
        if stars == 0 {
            return Err(AppError::InvalidInput("a rating is required".into()));
        }

        let review = Review {
            author,
            item: new.item.trim().to_string(),
            comment,
            stars,
            date: today.format("%Y-%m-%d").to_string(),
            source: ReviewSource::Local,
        };

        let key = review_key(&review);
        if self.reviews().iter().any(|r| review_key(r) == key) {
            return Err(AppError::DuplicateReview);
        }

        self.local_reviews.insert(0, review.clone());
        save_json(&self.store, LOCAL_REVIEWS_KEY, &self.local_reviews).await?;
        info!("Queued local review by {} for {}", review.author, review.item);

        self.reconcile_local().await?;
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{DailyViewCounter, PromotionStatus};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(title: &str) -> Item {
        Item {
            url: format!("https://{}.dev", title.to_lowercase()),
            ..Item::new(title)
        }
    }

    fn review(author: &str, item: &str, comment: &str, stars: u8) -> Review {
        Review {
            author: author.into(),
            item: item.into(),
            comment: comment.into(),
            stars,
            date: "2025-03-01".into(),
            source: ReviewSource::Server,
        }
    }

    fn promo(id: &str, item_key: &str, limit: Option<u32>) -> PromotionConfig {
        PromotionConfig {
            id: id.into(),
            item_key: item_key.into(),
            label: "PROMO".into(),
            start_date: Some(day(2025, 3, 1)),
            end_date: Some(day(2025, 3, 31)),
            daily_view_limit: limit,
            priority: None,
            active: true,
        }
    }

    fn config() -> Config {
        Config {
            db_path: ":memory:".into(),
            promotions_path: None,
            page_size: 2,
            popularity_sort: true,
            popularity: PopularityParams::default(),
        }
    }

    async fn session_with(store: MemoryStore, promotions: Vec<PromotionConfig>) -> Session<MemoryStore> {
        Session::new(store, &config(), promotions, day(2025, 3, 10))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn confirmed_local_reviews_are_pruned_from_storage() {
        let store = MemoryStore::new();
        save_json(
            &store,
            LOCAL_REVIEWS_KEY,
            &vec![review("ana", "Alpha", "great", 5), review("bo", "Alpha", "pending", 4)],
        )
        .await
        .unwrap();

        let mut session = session_with(store, Vec::new()).await;
        session
            .load_catalog(vec![item("Alpha")], vec![review("Ana", "alpha", "Great", 5)])
            .await
            .unwrap();

        assert_eq!(session.reviews().len(), 2);
        assert_eq!(session.pending_local().len(), 1);

        let stored: Vec<Review> = load_json(session.store(), LOCAL_REVIEWS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].author, "bo");
    }

    #[tokio::test]
    async fn fully_confirmed_queue_is_removed_from_storage() {
        let store = MemoryStore::new();
        save_json(&store, LOCAL_REVIEWS_KEY, &vec![review("ana", "Alpha", "great", 5)])
            .await
            .unwrap();

        let mut session = session_with(store, Vec::new()).await;
        session
            .load_catalog(vec![item("Alpha")], vec![review("ana", "Alpha", "great", 5)])
            .await
            .unwrap();

        assert!(session.pending_local().is_empty());
        assert_eq!(session.store().get(LOCAL_REVIEWS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_local_queue_is_ignored() {
        let store = MemoryStore::new();
        store.set(LOCAL_REVIEWS_KEY, "][".to_string()).await.unwrap();
        store.set(PROMOTION_VIEWS_KEY, "nope".to_string()).await.unwrap();

        let mut session = session_with(store, Vec::new()).await;
        session
            .load_catalog(vec![item("Alpha")], vec![review("ana", "Alpha", "ok", 4)])
            .await
            .unwrap();

        assert!(session.pending_local().is_empty());
        assert_eq!(session.popularity("alpha").count, 1);
    }

    #[tokio::test]
    async fn search_ranks_by_popularity_unless_disabled() {
        let mut session = session_with(MemoryStore::new(), Vec::new()).await;
        let mut remote: Vec<Review> = (0..6)
            .map(|i| review(&format!("u{}", i), "Beta", "solid", 5))
            .collect();
        remote.push(review("x", "Alpha", "fine", 3));
        session
            .load_catalog(vec![item("Alpha"), item("Beta"), item("Gamma")], remote)
            .await
            .unwrap();

        let ranked: Vec<String> = session.search("").into_iter().map(|i| i.title).collect();
        assert_eq!(ranked, vec!["Beta", "Alpha", "Gamma"]);

        session.set_popularity_sort(false).await.unwrap();
        let plain: Vec<String> = session.search("").into_iter().map(|i| i.title).collect();
        assert_eq!(plain, vec!["Alpha", "Beta", "Gamma"]);

        let reopened = session_with(session.into_store(), Vec::new()).await;
        assert!(!reopened.popularity_sort_enabled());
    }

    #[tokio::test]
    async fn promotions_count_views_and_persist_them() {
        let promotions = vec![promo("p", "Alpha", Some(2)), promo("ghost", "Missing", None)];
        let mut session = session_with(MemoryStore::new(), promotions.clone()).await;
        session
            .load_catalog(vec![item("Alpha"), item("Beta")], Vec::new())
            .await
            .unwrap();

        let today = day(2025, 3, 10);
        let first = session.eligible_promotions(today).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].item.title, "Alpha");
        assert_eq!(session.eligible_promotions(today).await.unwrap().len(), 1);
        assert!(session.eligible_promotions(today).await.unwrap().is_empty());

        let stats = session.promotion_stats();
        assert_eq!(stats[0].status, PromotionStatus::LimitReached);

        let views: ViewsData = load_json(session.store(), PROMOTION_VIEWS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            views.daily_views,
            vec![DailyViewCounter { promotion_id: "p".into(), date: today, count: 2 }]
        );

        let tomorrow = Session::new(session.into_store(), &config(), promotions, day(2025, 3, 11))
            .await
            .unwrap();
        let views: ViewsData = load_json(tomorrow.store(), PROMOTION_VIEWS_KEY)
            .await
            .unwrap()
            .unwrap();
        assert!(views.daily_views.is_empty());
    }

    #[tokio::test]
    async fn listing_skips_favorites_and_promoted_items() {
        let mut session =
            session_with(MemoryStore::new(), vec![promo("p", "Beta", None)]).await;
        session
            .load_catalog(
                vec![item("Alpha"), item("Beta"), item("Gamma"), item("Delta")],
                Vec::new(),
            )
            .await
            .unwrap();

        assert!(session.toggle_favorite("gamma").await.unwrap());
        let promoted = session.eligible_promotions(day(2025, 3, 10)).await.unwrap();

        let page = session.listing("", 1, &promoted);
        let titles: Vec<&str> = page.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 1);
        assert_eq!(titles, vec!["Alpha", "Delta"]);

        assert!(session.toggle_favorite("nope").await.is_err());
    }

    #[tokio::test]
    async fn submitted_review_is_queued_and_scored() {
        let mut session = session_with(MemoryStore::new(), Vec::new()).await;
        session
            .load_catalog(vec![item("Alpha")], vec![review("ana", "Alpha", "great", 5)])
            .await
            .unwrap();

        let stored = session
            .submit_review(
                NewReview {
                    author: "  Bo ".into(),
                    item: "Alpha".into(),
                    comment: "Works nicely".into(),
                    stars: 9,
                },
                day(2025, 3, 10),
            )
            .await
            .unwrap();

        assert_eq!(stored.author, "Bo");
        assert_eq!(stored.stars, 5);
        assert_eq!(stored.date, "2025-03-10");
        assert_eq!(session.pending_local().len(), 1);
        assert_eq!(session.popularity("Alpha").count, 2);
        assert!(session.has_user_reviewed("alpha", "BO"));
        assert!(!session.has_user_reviewed("alpha", "cy"));
    }

    #[tokio::test]
    async fn invalid_or_duplicate_reviews_are_rejected() {
        let mut session = session_with(MemoryStore::new(), Vec::new()).await;
        session
            .load_catalog(vec![item("Alpha")], vec![review("ana", "Alpha", "great", 5)])
            .await
            .unwrap();
        let today = day(2025, 3, 10);

        let attempt = |author: &str, comment: &str, stars: i64| NewReview {
            author: author.into(),
            item: "Alpha".into(),
            comment: comment.into(),
            stars,
        };

        let cases = vec![
            attempt("", "text", 4),
            attempt("ana", "   ", 4),
            attempt("ana", "text", 0),
            attempt(&"x".repeat(51), "text", 4),
            attempt("ana", &"y".repeat(501), 4),
        ];
        for case in cases {
            let err = session.submit_review(case, today).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)));
        }

        let err = session
            .submit_review(attempt("ANA", " Great ", 2), today)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateReview));
        assert!(session.pending_local().is_empty());
    }
}
