//! The single read entry point for statuses. A [`FeedQuery`] resolves to one
//! [`FeedStrategy`], which decides the filter and the order.
//!
//! Pages are plain offset windows over a live ordering, so entries that move
//! across a page boundary between two requests can be skipped or repeated.
//! An empty page is the only end-of-feed signal.

use crate::{
    FeedError, FeedResult, FeedService, Resource,
    ports::{StatusFilter, StatusOrder, TimelineEntryKind},
    ranking::ScoreMemo,
};
use plaza_common::model::{
    Id, Page,
    article::ArticleMarker,
    group::GroupMarker,
    json::{FeedItem, StatusJson},
    status::{Status, StatusMarker},
    user::UserMarker,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr};
use tracing::{debug, instrument};

fn default_limit() -> u32 {
    Page::DEFAULT_LIMIT
}

/// Query parameters of `GET /status`.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct FeedQuery {
    pub id: Option<Id<StatusMarker>>,
    #[serde(rename = "type")]
    pub feed_type: Option<String>,
    pub user_id: Option<Id<UserMarker>>,
    pub group_id: Option<Id<GroupMarker>>,
    pub topic: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            id: None,
            feed_type: None,
            user_id: None,
            group_id: None,
            topic: None,
            offset: 0,
            limit: Page::DEFAULT_LIMIT,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FeedType {
    User,
    GroupStatus,
    Status,
    Post,
    Hot,
    Timeline,
    Topic,
}

impl FromStr for FeedType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(FeedType::User),
            "group_status" => Ok(FeedType::GroupStatus),
            "status" => Ok(FeedType::Status),
            "post" => Ok(FeedType::Post),
            "hot" => Ok(FeedType::Hot),
            "timeline" => Ok(FeedType::Timeline),
            "topic" => Ok(FeedType::Topic),
            _ => Err(invalid_parameters()),
        }
    }
}

fn invalid_parameters() -> FeedError {
    FeedError::Validation("invalid parameters".to_owned())
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum FeedStrategy {
    Single(Id<StatusMarker>),
    /// Statuses of one author, newest first.
    User(Id<UserMarker>),
    /// Group statuses of one group, newest first.
    GroupStatus(Id<GroupMarker>),
    /// Personal statuses, highest id first.
    Status,
    /// Group posts, optionally of one group, newest first.
    Post(Option<Id<GroupMarker>>),
    /// Everything, newest first. Also asks ranking to refresh.
    Hot,
    /// Statuses tagged with the topic, highest id first.
    Topic(String),
    /// The viewer's merged home timeline.
    Timeline,
}

impl FeedQuery {
    pub fn strategy(&self) -> FeedResult<FeedStrategy> {
        if let Some(id) = self.id {
            return Ok(FeedStrategy::Single(id));
        }

        let feed_type = self
            .feed_type
            .as_deref()
            .ok_or_else(invalid_parameters)?
            .parse::<FeedType>()?;
        Ok(match feed_type {
            FeedType::User => FeedStrategy::User(self.user_id.ok_or_else(invalid_parameters)?),
            FeedType::GroupStatus => {
                FeedStrategy::GroupStatus(self.group_id.ok_or_else(invalid_parameters)?)
            }
            FeedType::Status => FeedStrategy::Status,
            FeedType::Post => FeedStrategy::Post(self.group_id),
            FeedType::Hot => FeedStrategy::Hot,
            FeedType::Timeline => FeedStrategy::Timeline,
            FeedType::Topic => FeedStrategy::Topic(self.topic.clone().unwrap_or_default()),
        })
    }

    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.offset, self.limit)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(untagged)]
pub enum FeedResponse {
    Single(Box<StatusJson>),
    List(Vec<FeedItem>),
}

impl FeedService {
    #[instrument(skip(self))]
    pub async fn fetch_feed(
        &self,
        query: &FeedQuery,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<FeedResponse> {
        let strategy = query.strategy()?;
        let page = query.page();
        debug!(?strategy, ?page, "Dispatching feed query");

        let items = match strategy {
            FeedStrategy::Single(id) => {
                return self
                    .cache
                    .get_status_json(id, viewer)
                    .await?
                    .map(|json| FeedResponse::Single(Box::new(json)))
                    .ok_or(FeedError::NotFound(Resource::Status));
            }
            FeedStrategy::User(user) => {
                if self.cache.get_user(user).await?.is_none() {
                    return Err(FeedError::NotFound(Resource::User));
                }
                self.list(StatusFilter::Author(user), StatusOrder::NewestFirst, page, viewer)
                    .await?
            }
            FeedStrategy::GroupStatus(group) => {
                if self.directory.fetch_group(group).await?.is_none() {
                    return Err(FeedError::NotFound(Resource::Group));
                }
                self.list(
                    StatusFilter::GroupStatuses(group),
                    StatusOrder::NewestFirst,
                    page,
                    viewer,
                )
                .await?
            }
            FeedStrategy::Status => {
                self.list(
                    StatusFilter::UserStatuses,
                    StatusOrder::HighestIdFirst,
                    page,
                    viewer,
                )
                .await?
            }
            FeedStrategy::Post(group) => {
                self.list(
                    StatusFilter::GroupPosts(group),
                    StatusOrder::NewestFirst,
                    page,
                    viewer,
                )
                .await?
            }
            FeedStrategy::Hot => {
                let mut statuses = self
                    .store
                    .list_statuses(StatusFilter::All, StatusOrder::NewestFirst, page)
                    .await?;
                if let Some(source) = &self.scores {
                    let mut memo = ScoreMemo::new(source.as_ref());
                    // Stable, so equal scores stay newest first.
                    statuses.sort_by(|a, b| memo.score(b).total_cmp(&memo.score(a)));
                }
                let items = self.project_list(&statuses, viewer).await?;
                self.ranking.refresh().await;
                items
            }
            FeedStrategy::Topic(name) => self.topic_feed(&name, page, viewer).await?,
            FeedStrategy::Timeline => self.timeline(viewer, page).await?,
        };

        Ok(FeedResponse::List(items))
    }

    async fn list(
        &self,
        filter: StatusFilter,
        order: StatusOrder,
        page: Page,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<Vec<FeedItem>> {
        let statuses = self.store.list_statuses(filter, order, page).await?;
        self.project_list(&statuses, viewer).await
    }

    async fn project_list(
        &self,
        statuses: &[Status],
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<Vec<FeedItem>> {
        let mut items = Vec::with_capacity(statuses.len());
        for status in statuses {
            let json = self.project_full(status, viewer).await?;
            items.push(FeedItem::Status(Box::new(json)));
        }
        Ok(items)
    }

    async fn topic_feed(
        &self,
        name: &str,
        page: Page,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<Vec<FeedItem>> {
        if name.is_empty() {
            return Ok(Vec::new());
        }
        let Some(topic) = self.cache.topic_id(name).await? else {
            debug!(name, "Unknown topic");
            return Ok(Vec::new());
        };

        let ids = self.store.topic_status_ids(topic, page).await?;
        let mut by_id = self
            .cache
            .multiget_status_json(&ids, viewer)
            .await?
            .into_iter()
            .map(|json| (json.id, json))
            .collect::<HashMap<_, _>>();

        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(|json| FeedItem::Status(Box::new(json)))
            .collect())
    }

    async fn timeline(
        &self,
        viewer: Option<Id<UserMarker>>,
        page: Page,
    ) -> FeedResult<Vec<FeedItem>> {
        let Some(user) = viewer else {
            return Ok(Vec::new());
        };

        let mut entries = self.store.timeline_page(user, page).await?;
        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(a.kind.cmp(&b.kind))
                .then(b.id.cmp(&a.id))
        });
        let mut status_ids = Vec::new();
        let mut article_ids = Vec::new();
        for entry in &entries {
            match entry.kind {
                TimelineEntryKind::Status => status_ids.push(Id::<StatusMarker>::new(entry.id)),
                TimelineEntryKind::Article => article_ids.push(Id::<ArticleMarker>::new(entry.id)),
            }
        }

        let mut statuses = self
            .store
            .fetch_statuses(&status_ids)
            .await?
            .into_iter()
            .map(|status| (status.id, status))
            .collect::<HashMap<_, _>>();
        let mut articles = self
            .directory
            .fetch_articles(&article_ids)
            .await?
            .into_iter()
            .map(|article| (article.id, article))
            .collect::<HashMap<_, _>>();

        // Entries deleted since the page was read are skipped.
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.kind {
                TimelineEntryKind::Status => {
                    if let Some(status) = statuses.remove(&Id::new(entry.id)) {
                        let json = self.project_full(&status, viewer).await?;
                        items.push(FeedItem::Status(Box::new(json)));
                    }
                }
                TimelineEntryKind::Article => {
                    if let Some(article) = articles.remove(&Id::new(entry.id)) {
                        items.push(FeedItem::Article(article));
                    }
                }
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        FeedError, Resource,
        cache::status_json_key,
        dispatch::{FeedQuery, FeedResponse, FeedStrategy},
        ranking::ScoreSource,
        testing::{Harness, RankingEvent},
    };
    use plaza_common::model::{
        Id,
        json::{FeedItem, StatusCacheJson},
        status::{CreateStatus, Status, StatusMarker},
        user::UserMarker,
    };
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use time::{Duration, macros::datetime};

    /// Scores by likes and counts the calls.
    #[derive(Default)]
    struct LikeScore {
        calls: AtomicUsize,
    }

    impl ScoreSource for LikeScore {
        #[allow(clippy::cast_precision_loss)]
        fn score(&self, status: &Status) -> f64 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            status.likes as f64
        }
    }

    fn query(value: serde_json::Value) -> FeedQuery {
        serde_json::from_value(value).unwrap()
    }

    /// `('s', id)` for statuses and `('a', id)` for articles.
    fn entries(response: FeedResponse) -> Vec<(char, i64)> {
        match response {
            FeedResponse::List(items) => items
                .into_iter()
                .map(|item| match item {
                    FeedItem::Status(status) => ('s', status.id.get()),
                    FeedItem::Article(article) => ('a', article.id.get()),
                })
                .collect(),
            FeedResponse::Single(status) => panic!("expected a list, got {status:?}"),
        }
    }

    fn status_ids(response: FeedResponse) -> Vec<i64> {
        entries(response).into_iter().map(|(_, id)| id).collect()
    }

    async fn fetch(
        harness: &Harness,
        value: serde_json::Value,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResponse {
        harness.service.fetch_feed(&query(value), viewer).await.unwrap()
    }

    async fn create(
        harness: &Harness,
        author: Id<UserMarker>,
        value: serde_json::Value,
    ) -> Id<StatusMarker> {
        let request: CreateStatus = serde_json::from_value(value).unwrap();
        harness
            .service
            .create_status(author, request)
            .await
            .unwrap()
            .json
            .id
    }

    #[test]
    fn queries_resolve_to_one_strategy() {
        let single = query(json!({"id": 3, "type": "hot"}));
        assert_eq!(single.strategy().unwrap(), FeedStrategy::Single(Id::new(3)));

        let user = query(json!({"type": "user", "user_id": 5}));
        assert_eq!(user.strategy().unwrap(), FeedStrategy::User(Id::new(5)));

        let posts = query(json!({"type": "post"}));
        assert_eq!(posts.strategy().unwrap(), FeedStrategy::Post(None));

        let topic = query(json!({"type": "topic", "topic": "rust"}));
        assert_eq!(topic.strategy().unwrap(), FeedStrategy::Topic("rust".to_owned()));

        for invalid in [
            json!({}),
            json!({"type": "trending"}),
            json!({"type": "user"}),
            json!({"type": "group_status"}),
        ] {
            let err = query(invalid).strategy().unwrap_err();
            assert!(
                matches!(err, FeedError::Validation(message) if message == "invalid parameters")
            );
        }
    }

    #[test]
    fn limits_default_and_are_clamped() {
        assert_eq!(query(json!({"type": "hot"})).page().limit, 10);
        assert_eq!(query(json!({"type": "hot", "limit": 5000})).page().limit, 100);
    }

    #[tokio::test]
    async fn status_feed_pages_by_descending_id() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        for text in ["1", "2", "3", "4", "5"] {
            harness.store.add_status(alice, text);
        }

        let first = fetch(&harness, json!({"type": "status", "offset": 0, "limit": 2}), None).await;
        let second = fetch(
            &harness,
            json!({"type": "status", "offset": 2, "limit": 2}),
            None,
        )
        .await;
        let past_end = fetch(
            &harness,
            json!({"type": "status", "offset": 10, "limit": 2}),
            None,
        )
        .await;

        assert_eq!(status_ids(first), [5, 4]);
        assert_eq!(status_ids(second), [3, 2]);
        assert_eq!(status_ids(past_end), Vec::<i64>::new());
    }

    #[tokio::test]
    async fn single_status_is_served_through_the_cache() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        let status = harness.store.add_status(alice, "hello");

        let response = fetch(&harness, json!({"id": status.get()}), Some(alice)).await;
        assert!(matches!(response, FeedResponse::Single(json) if json.text == "hello"));
        assert!(harness.kv.raw(&status_json_key(status)).is_some());

        let err = harness
            .service
            .fetch_feed(&query(json!({"id": 404})), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(Resource::Status)));
    }

    #[tokio::test]
    async fn user_feed_orders_by_timestamp() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        let bob = harness.store.add_user("bob");
        let older = harness.store.add_status(alice, "older");
        let newer = harness.store.add_status(alice, "newer");
        harness.store.add_status(bob, "bob's");
        harness
            .store
            .set_status_timestamp(older, datetime!(2027-01-01 0:00 UTC));

        let response = fetch(&harness, json!({"type": "user", "user_id": alice.get()}), None).await;
        assert_eq!(status_ids(response), [older.get(), newer.get()]);

        let err = harness
            .service
            .fetch_feed(&query(json!({"type": "user", "user_id": 404})), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(Resource::User)));
    }

    #[tokio::test]
    async fn group_feeds_filter_by_kind() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        let rust = harness.store.add_group("rust");
        let go = harness.store.add_group("go");

        let rust_status = create(
            &harness,
            alice,
            json!({"type": "GROUP_STATUS", "text": "a", "group_id": rust.get()}),
        )
        .await;
        create(
            &harness,
            alice,
            json!({"type": "GROUP_STATUS", "text": "b", "group_id": go.get()}),
        )
        .await;
        let rust_post = create(
            &harness,
            alice,
            json!({"type": "GROUP_POST", "text": "c", "title": "t", "group_id": rust.get()}),
        )
        .await;
        let go_post = create(
            &harness,
            alice,
            json!({"type": "GROUP_POST", "text": "d", "title": "t", "group_id": go.get()}),
        )
        .await;
        create(&harness, alice, json!({"type": "USER_STATUS", "text": "e"})).await;

        let statuses = fetch(
            &harness,
            json!({"type": "group_status", "group_id": rust.get()}),
            None,
        )
        .await;
        assert_eq!(status_ids(statuses), [rust_status.get()]);

        let posts = fetch(&harness, json!({"type": "post"}), None).await;
        assert_eq!(status_ids(posts), [go_post.get(), rust_post.get()]);

        let rust_posts = fetch(
            &harness,
            json!({"type": "post", "group_id": rust.get()}),
            None,
        )
        .await;
        assert_eq!(status_ids(rust_posts), [rust_post.get()]);

        let err = harness
            .service
            .fetch_feed(&query(json!({"type": "group_status", "group_id": 404})), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::NotFound(Resource::Group)));
    }

    #[tokio::test]
    async fn hot_feed_refreshes_ranking() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        let first = harness.store.add_status(alice, "1");
        let second = harness.store.add_status(alice, "2");

        let response = fetch(&harness, json!({"type": "hot"}), None).await;
        assert_eq!(status_ids(response), [second.get(), first.get()]);
        assert_eq!(harness.ranking.events(), [RankingEvent::Refresh]);

        harness.ranking.set_failing(true);
        let response = fetch(&harness, json!({"type": "hot", "limit": 1}), None).await;
        assert_eq!(status_ids(response), [second.get()]);
    }

    #[tokio::test]
    async fn hot_feed_orders_pages_by_score() {
        let source = Arc::new(LikeScore::default());
        let harness = Harness::with_score_source(source.clone());
        let alice = harness.store.add_user("alice");
        let bob = harness.store.add_user("bob");
        let carol = harness.store.add_user("carol");
        let first = harness.store.add_status(alice, "1");
        let second = harness.store.add_status(alice, "2");
        let third = harness.store.add_status(alice, "3");
        let fourth = harness.store.add_status(alice, "4");
        for user in [bob, carol] {
            harness.service.like_status(first, user).await.unwrap();
        }
        harness.service.like_status(third, bob).await.unwrap();

        let response = fetch(&harness, json!({"type": "hot", "limit": 3}), None).await;
        // The page is still the three newest; only its order follows the score.
        assert_eq!(status_ids(response), [third.get(), fourth.get(), second.get()]);
        assert_eq!(source.calls.load(Ordering::Relaxed), 3);

        let response = fetch(&harness, json!({"type": "hot"}), None).await;
        assert_eq!(
            status_ids(response),
            [first.get(), third.get(), fourth.get(), second.get()]
        );
        assert_eq!(source.calls.load(Ordering::Relaxed), 7);
        assert_eq!(
            harness.ranking.events().last(),
            Some(&RankingEvent::Refresh)
        );
    }

    #[tokio::test]
    async fn topic_feed_follows_descending_status_ids() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        for index in 1..=10 {
            harness.store.add_status(alice, &index.to_string());
        }
        for status in [3, 10, 7] {
            harness.store.link_topic(Id::new(status), "foo");
        }
        let bob = harness.store.add_user("bob");
        harness.service.like_status(Id::new(7), bob).await.unwrap();
        harness.service.like_status(Id::new(3), bob).await.unwrap();
        // One cache hit in the batch.
        harness
            .service
            .cache()
            .get_status_json(Id::new(7), None)
            .await
            .unwrap();

        let response = fetch(&harness, json!({"type": "topic", "topic": "foo"}), Some(bob)).await;
        let FeedResponse::List(items) = response else {
            panic!("expected a list");
        };
        let mut ids = Vec::new();
        for item in items {
            let FeedItem::Status(status) = item else {
                panic!("expected a status");
            };
            ids.push(status.id.get());

            let raw = harness.kv.raw(&status_json_key(status.id)).unwrap();
            let cached: StatusCacheJson = serde_json::from_str(&raw).unwrap();
            assert_eq!(status.id, cached.id);
            assert_eq!(status.status_type, cached.status_type);
            assert_eq!(status.text, cached.text);
            assert_eq!(status.timestamp, cached.timestamp);
            assert_eq!(status.likes, cached.likes);
            assert_eq!(status.replies, cached.replies);
            assert_eq!(status.pics, cached.pics);
            assert_eq!(status.user.id, cached.user_id);
            assert_eq!(status.liked_by_me, status.id.get() != 10);

            let single = harness
                .service
                .cache()
                .get_status_json(status.id, Some(bob))
                .await
                .unwrap();
            assert_eq!(single.as_ref(), Some(&*status));
        }
        assert_eq!(ids, [10, 7, 3]);

        let paged = fetch(
            &harness,
            json!({"type": "topic", "topic": "foo", "offset": 1, "limit": 1}),
            None,
        )
        .await;
        assert_eq!(status_ids(paged), [7]);

        let unknown = fetch(&harness, json!({"type": "topic", "topic": "bar"}), None).await;
        assert!(status_ids(unknown).is_empty());
        let missing = fetch(&harness, json!({"type": "topic"}), None).await;
        assert!(status_ids(missing).is_empty());
    }

    #[tokio::test]
    async fn timeline_merges_statuses_and_articles() {
        let harness = Harness::new();
        let alice = harness.store.add_user("alice");
        let bob = harness.store.add_user("bob");
        let carol = harness.store.add_user("carol");
        let account = Id::new(1);
        harness.store.follow(alice, bob);
        harness.store.subscribe(alice, account);

        let own = harness.store.add_status(alice, "own");
        let followed = harness.store.add_status(bob, "followed");
        harness.store.add_status(carol, "stranger");
        let own_time = datetime!(2026-03-01 0:00 UTC);
        harness.store.set_status_timestamp(own, own_time);
        harness
            .store
            .set_status_timestamp(followed, own_time - Duration::days(2));

        let tied = harness.store.add_article(account, "tied", own_time);
        let older = harness
            .store
            .add_article(account, "older", own_time - Duration::days(1));
        harness
            .store
            .add_article(Id::new(2), "unsubscribed", own_time + Duration::days(1));

        let response = fetch(&harness, json!({"type": "timeline"}), Some(alice)).await;
        assert_eq!(
            entries(response),
            [
                ('s', own.get()),
                ('a', tied.get()),
                ('a', older.get()),
                ('s', followed.get()),
            ]
        );

        let second_page = fetch(
            &harness,
            json!({"type": "timeline", "offset": 1, "limit": 2}),
            Some(alice),
        )
        .await;
        assert_eq!(entries(second_page), [('a', tied.get()), ('a', older.get())]);

        let anonymous = fetch(&harness, json!({"type": "timeline"}), None).await;
        assert!(entries(anonymous).is_empty());
    }

    #[test]
    fn feed_items_serialize_untagged() {
        let response = FeedResponse::List(Vec::new());
        assert_eq!(serde_json::to_string(&response).unwrap(), "[]");
    }
}
