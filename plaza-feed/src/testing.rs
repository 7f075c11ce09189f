//! In-memory fakes of every port, for the unit tests of this crate.

use crate::{
    FeedConfig, FeedService,
    ports::{
        BoxFuture, Directory, KvError, KvStore, RankingError, RankingNotifier, StatusFilter,
        StatusOrder, StatusStore, StorageError, StorageResult, TimelineEntry, TimelineEntryKind,
    },
    ranking::ScoreSource,
};
use plaza_common::{
    model::{
        Id, Page,
        article::{Article, ArticleMarker, OfficialAccountMarker},
        group::{Group, GroupMarker},
        reply::{ReplyMarker, StatusReply},
        status::{NewStatus, Picture, Status, StatusKind, StatusMarker, StatusText, StatusType},
        topic::{Topic, TopicMarker, TopicName, TopicSummary},
        user::{User, UserHandle, UserMarker},
    },
    util::PositiveDuration,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    future::ready,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};
use time::{Duration, OffsetDateTime, macros::datetime};

pub(crate) const IMAGE_SERVER: &str = "https://img.example/";
const CLOCK_START: OffsetDateTime = datetime!(2026-01-01 0:00 UTC);

struct StatusRow {
    author: Id<UserMarker>,
    kind: StatusKind,
    text: StatusText,
    timestamp: OffsetDateTime,
}

struct ReplyRow {
    status: Id<StatusMarker>,
    author: Id<UserMarker>,
    text: StatusText,
    timestamp: OffsetDateTime,
}

#[derive(Default)]
struct State {
    clock: i64,
    next_status: i64,
    next_reply: i64,
    next_topic: i64,
    next_user: i64,
    next_group: i64,
    next_article: i64,
    statuses: BTreeMap<i64, StatusRow>,
    pictures: Vec<(i64, Picture)>,
    replies: BTreeMap<i64, ReplyRow>,
    status_likes: BTreeSet<(i64, i64)>,
    reply_likes: BTreeSet<(i64, i64)>,
    topics: BTreeMap<i64, TopicName>,
    status_topics: Vec<(i64, i64)>,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    group_titles: HashMap<(i64, i64), String>,
    follows: BTreeSet<(i64, i64)>,
    articles: BTreeMap<i64, Article>,
    subscriptions: BTreeSet<(i64, i64)>,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl State {
    fn tick(&mut self) -> OffsetDateTime {
        CLOCK_START + Duration::seconds(next(&mut self.clock))
    }

    fn status(&self, id: i64) -> Option<Status> {
        let row = self.statuses.get(&id)?;
        let mut pictures = self
            .pictures
            .iter()
            .filter(|(status, _)| *status == id)
            .map(|(_, picture)| picture.clone())
            .collect::<Vec<_>>();
        pictures.sort_by_key(|picture| picture.index);

        Some(Status {
            id: Id::new(id),
            author: row.author,
            kind: row.kind.clone(),
            text: row.text.clone(),
            timestamp: row.timestamp,
            pictures,
            replies: self
                .replies
                .values()
                .filter(|reply| reply.status.get() == id)
                .count() as u64,
            likes: self
                .status_likes
                .iter()
                .filter(|(status, _)| *status == id)
                .count() as u64,
        })
    }

    fn reply(&self, id: i64) -> Option<StatusReply> {
        let row = self.replies.get(&id)?;
        Some(StatusReply {
            id: Id::new(id),
            status: row.status,
            author: row.author,
            text: row.text.clone(),
            timestamp: row.timestamp,
            likes: self
                .reply_likes
                .iter()
                .filter(|(reply, _)| *reply == id)
                .count() as u64,
        })
    }

    fn topic_id(&mut self, name: &TopicName) -> i64 {
        if let Some((id, _)) = self.topics.iter().find(|(_, existing)| *existing == name) {
            return *id;
        }
        let id = next(&mut self.next_topic);
        self.topics.insert(id, name.clone());
        id
    }

    fn link(&mut self, status: i64, topic: i64) {
        if !self.status_topics.contains(&(status, topic)) {
            self.status_topics.push((status, topic));
        }
    }

    fn insert_status(&mut self, status: &NewStatus, topics: &[TopicName]) -> StorageResult<Status> {
        if !self.users.contains_key(&status.author.get()) {
            return Err(StorageError::MissingReference);
        }
        if let Some(group) = status.kind.group()
            && !self.groups.contains_key(&group.get())
        {
            return Err(StorageError::MissingReference);
        }

        let id = next(&mut self.next_status);
        let timestamp = self.tick();
        self.statuses.insert(
            id,
            StatusRow {
                author: status.author,
                kind: status.kind.clone(),
                text: status.text.clone(),
                timestamp,
            },
        );
        self.pictures
            .extend(status.pictures().map(|picture| (id, picture)));
        for name in topics {
            let topic = self.topic_id(name);
            self.link(id, topic);
        }

        Ok(self.status(id).expect("status was just inserted"))
    }

    fn delete_status(&mut self, id: i64) -> bool {
        if self.statuses.remove(&id).is_none() {
            return false;
        }
        self.pictures.retain(|(status, _)| *status != id);
        let replies = self
            .replies
            .iter()
            .filter(|(_, reply)| reply.status.get() == id)
            .map(|(reply, _)| *reply)
            .collect::<Vec<_>>();
        for reply in replies {
            self.delete_reply(reply);
        }
        self.status_likes.retain(|(status, _)| *status != id);
        self.status_topics.retain(|(status, _)| *status != id);
        true
    }

    fn delete_reply(&mut self, id: i64) -> bool {
        if self.replies.remove(&id).is_none() {
            return false;
        }
        self.reply_likes.retain(|(reply, _)| *reply != id);
        true
    }

    fn matches(row: &StatusRow, filter: StatusFilter) -> bool {
        match filter {
            StatusFilter::All => true,
            StatusFilter::Author(author) => row.author == author,
            StatusFilter::GroupStatuses(group) => {
                row.kind == StatusKind::GroupStatus { group }
            }
            StatusFilter::UserStatuses => row.kind == StatusKind::UserStatus,
            StatusFilter::GroupPosts(group) => {
                row.kind.status_type() == StatusType::GroupPost
                    && group.is_none_or(|group| row.kind.group() == Some(group))
            }
        }
    }

    fn list_statuses(&self, filter: StatusFilter, order: StatusOrder, page: Page) -> Vec<Status> {
        let mut rows = self
            .statuses
            .iter()
            .filter(|(_, row)| Self::matches(row, filter))
            .collect::<Vec<_>>();
        match order {
            StatusOrder::NewestFirst => {
                rows.sort_by(|(a_id, a), (b_id, b)| {
                    b.timestamp.cmp(&a.timestamp).then(b_id.cmp(a_id))
                });
            }
            StatusOrder::HighestIdFirst => rows.sort_by(|(a_id, _), (b_id, _)| b_id.cmp(a_id)),
        }

        paginate(rows.into_iter().map(|(id, _)| *id), page)
            .filter_map(|id| self.status(id))
            .collect()
    }

    fn timeline(&self, viewer: Id<UserMarker>, page: Page) -> Vec<TimelineEntry> {
        let viewer = viewer.get();
        let statuses = self
            .statuses
            .iter()
            .filter(|(_, row)| {
                row.author.get() == viewer || self.follows.contains(&(viewer, row.author.get()))
            })
            .map(|(id, row)| TimelineEntry {
                kind: TimelineEntryKind::Status,
                id: *id,
                timestamp: row.timestamp,
            });
        let articles = self
            .articles
            .values()
            .filter(|article| {
                self.subscriptions
                    .contains(&(viewer, article.official_account_id.get()))
            })
            .map(|article| TimelineEntry {
                kind: TimelineEntryKind::Article,
                id: article.id.get(),
                timestamp: article.timestamp,
            });

        let mut entries = statuses.chain(articles).collect::<Vec<_>>();
        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then(a.kind.cmp(&b.kind))
                .then(b.id.cmp(&a.id))
        });
        paginate(entries.into_iter(), page).collect()
    }
}

fn paginate<T>(items: impl Iterator<Item = T>, page: Page) -> impl Iterator<Item = T> {
    items
        .skip(page.offset as usize)
        .take(page.limit as usize)
}

fn done<'a, T: Send + 'a>(value: T) -> BoxFuture<'a, StorageResult<T>> {
    Box::pin(ready(Ok(value)))
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_user(&self, handle: &str) -> Id<UserMarker> {
        let mut state = self.state();
        let id = Id::new(next(&mut state.next_user));
        let handle = UserHandle::new(handle.to_owned()).unwrap();
        state.users.insert(id.get(), User { id, handle });
        id
    }

    pub(crate) fn add_group(&self, name: &str) -> Id<GroupMarker> {
        let mut state = self.state();
        let id = Id::new(next(&mut state.next_group));
        state.groups.insert(
            id.get(),
            Group {
                id,
                name: name.to_owned(),
                members: 0,
            },
        );
        id
    }

    pub(crate) fn set_group_title(
        &self,
        group: Id<GroupMarker>,
        user: Id<UserMarker>,
        title: &str,
    ) {
        self.state()
            .group_titles
            .insert((group.get(), user.get()), title.to_owned());
    }

    pub(crate) fn follow(&self, follower: Id<UserMarker>, followed: Id<UserMarker>) {
        self.state().follows.insert((follower.get(), followed.get()));
    }

    pub(crate) fn subscribe(&self, user: Id<UserMarker>, account: Id<OfficialAccountMarker>) {
        self.state().subscriptions.insert((user.get(), account.get()));
    }

    pub(crate) fn add_article(
        &self,
        account: Id<OfficialAccountMarker>,
        title: &str,
        timestamp: OffsetDateTime,
    ) -> Id<ArticleMarker> {
        let mut state = self.state();
        let id = Id::new(next(&mut state.next_article));
        state.articles.insert(
            id.get(),
            Article {
                id,
                official_account_id: account,
                title: title.to_owned(),
                description: String::new(),
                timestamp,
            },
        );
        id
    }

    /// Inserts a personal status directly, bypassing the service.
    pub(crate) fn add_status(&self, author: Id<UserMarker>, text: &str) -> Id<StatusMarker> {
        let status = NewStatus {
            author,
            kind: StatusKind::UserStatus,
            text: StatusText::new(text.to_owned()).unwrap(),
            picture_urls: Vec::new(),
        };
        self.state().insert_status(&status, &[]).unwrap().id
    }

    pub(crate) fn set_status_timestamp(&self, status: Id<StatusMarker>, timestamp: OffsetDateTime) {
        if let Some(row) = self.state().statuses.get_mut(&status.get()) {
            row.timestamp = timestamp;
        }
    }

    /// Associates a status with a topic, creating the topic if needed.
    pub(crate) fn link_topic(&self, status: Id<StatusMarker>, name: &str) -> Id<TopicMarker> {
        let mut state = self.state();
        let topic = state.topic_id(&TopicName::new(name.to_owned()).unwrap());
        state.link(status.get(), topic);
        Id::new(topic)
    }

    pub(crate) fn status_count(&self) -> usize {
        self.state().statuses.len()
    }

    pub(crate) fn picture_count(&self) -> usize {
        self.state().pictures.len()
    }

    pub(crate) fn reply_count(&self) -> usize {
        self.state().replies.len()
    }

    pub(crate) fn status_like_count(&self) -> usize {
        self.state().status_likes.len()
    }

    pub(crate) fn reply_like_count(&self) -> usize {
        self.state().reply_likes.len()
    }

    pub(crate) fn topic_names(&self) -> Vec<String> {
        self.state()
            .topics
            .values()
            .map(|name| name.get().to_owned())
            .collect()
    }

    pub(crate) fn status_topic_count(&self) -> usize {
        self.state().status_topics.len()
    }

}

impl StatusStore for MemoryStore {
    fn insert_status<'a>(
        &'a self,
        status: &'a NewStatus,
        topics: &'a [TopicName],
    ) -> BoxFuture<'a, StorageResult<Status>> {
        let result = self.state().insert_status(status, topics);
        Box::pin(ready(result))
    }

    fn fetch_status(&self, id: Id<StatusMarker>) -> BoxFuture<'_, StorageResult<Option<Status>>> {
        done(self.state().status(id.get()))
    }

    fn fetch_statuses<'a>(
        &'a self,
        ids: &'a [Id<StatusMarker>],
    ) -> BoxFuture<'a, StorageResult<Vec<Status>>> {
        let state = self.state();
        // Highest id first, so callers cannot rely on request order.
        let mut ids = ids.to_vec();
        ids.sort_by(|a, b| b.cmp(a));
        done(ids.into_iter().filter_map(|id| state.status(id.get())).collect())
    }

    fn list_statuses(
        &self,
        filter: StatusFilter,
        order: StatusOrder,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<Status>>> {
        done(self.state().list_statuses(filter, order, page))
    }

    fn delete_status(&self, id: Id<StatusMarker>) -> BoxFuture<'_, StorageResult<bool>> {
        done(self.state().delete_status(id.get()))
    }

    fn add_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        let mut state = self.state();
        if !state.statuses.contains_key(&status.get()) {
            return Box::pin(ready(Err(StorageError::MissingReference)));
        }
        done(state.status_likes.insert((status.get(), user.get())))
    }

    fn remove_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        done(self.state().status_likes.remove(&(status.get(), user.get())))
    }

    fn is_status_liked_by(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        done(self.state().status_likes.contains(&(status.get(), user.get())))
    }

    fn insert_reply<'a>(
        &'a self,
        status: Id<StatusMarker>,
        author: Id<UserMarker>,
        text: &'a StatusText,
    ) -> BoxFuture<'a, StorageResult<StatusReply>> {
        let mut state = self.state();
        if !state.statuses.contains_key(&status.get()) {
            return Box::pin(ready(Err(StorageError::MissingReference)));
        }
        let id = next(&mut state.next_reply);
        let timestamp = state.tick();
        state.replies.insert(
            id,
            ReplyRow {
                status,
                author,
                text: text.clone(),
                timestamp,
            },
        );
        done(state.reply(id).expect("reply was just inserted"))
    }

    fn fetch_reply(
        &self,
        id: Id<ReplyMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<StatusReply>>> {
        done(self.state().reply(id.get()))
    }

    fn list_replies(
        &self,
        status: Id<StatusMarker>,
        newest_first: bool,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<StatusReply>>> {
        let state = self.state();
        let mut replies = state
            .replies
            .iter()
            .filter(|(_, reply)| reply.status == status)
            .map(|(id, reply)| (reply.timestamp, *id))
            .collect::<Vec<_>>();
        replies.sort_unstable();
        if newest_first {
            replies.reverse();
        }
        done(
            paginate(replies.into_iter(), page)
                .filter_map(|(_, id)| state.reply(id))
                .collect(),
        )
    }

    fn delete_reply(&self, id: Id<ReplyMarker>) -> BoxFuture<'_, StorageResult<bool>> {
        done(self.state().delete_reply(id.get()))
    }

    fn add_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        let mut state = self.state();
        if !state.replies.contains_key(&reply.get()) {
            return Box::pin(ready(Err(StorageError::MissingReference)));
        }
        done(state.reply_likes.insert((reply.get(), user.get())))
    }

    fn remove_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        done(self.state().reply_likes.remove(&(reply.get(), user.get())))
    }

    fn is_reply_liked_by(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        done(self.state().reply_likes.contains(&(reply.get(), user.get())))
    }

    fn find_topic<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<Option<Topic>>> {
        let topic = self
            .state()
            .topics
            .iter()
            .find(|(_, topic)| topic.get() == name)
            .map(|(id, name)| Topic {
                id: Id::new(*id),
                name: name.clone(),
            });
        done(topic)
    }

    fn fetch_topic_summary(
        &self,
        id: Id<TopicMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<TopicSummary>>> {
        let state = self.state();
        let summary = state.topics.get(&id.get()).map(|name| TopicSummary {
            topic: Topic {
                id,
                name: name.clone(),
            },
            statuses: state
                .status_topics
                .iter()
                .filter(|(_, topic)| *topic == id.get())
                .count() as u64,
        });
        done(summary)
    }

    fn topic_status_ids(
        &self,
        topic: Id<TopicMarker>,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<Id<StatusMarker>>>> {
        let state = self.state();
        let mut ids = state
            .status_topics
            .iter()
            .filter(|(_, linked)| *linked == topic.get())
            .map(|(status, _)| *status)
            .collect::<Vec<_>>();
        ids.sort_by(|a, b| b.cmp(a));
        done(paginate(ids.into_iter(), page).map(Id::new).collect())
    }

    fn timeline_page(
        &self,
        viewer: Id<UserMarker>,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<TimelineEntry>>> {
        done(self.state().timeline(viewer, page))
    }
}

impl Directory for MemoryStore {
    fn fetch_user(&self, id: Id<UserMarker>) -> BoxFuture<'_, StorageResult<Option<User>>> {
        done(self.state().users.get(&id.get()).cloned())
    }

    fn fetch_group(&self, id: Id<GroupMarker>) -> BoxFuture<'_, StorageResult<Option<Group>>> {
        done(self.state().groups.get(&id.get()).cloned())
    }

    fn fetch_group_user_title(
        &self,
        group: Id<GroupMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<String>>> {
        done(
            self.state()
                .group_titles
                .get(&(group.get(), user.get()))
                .cloned(),
        )
    }

    fn fetch_articles<'a>(
        &'a self,
        ids: &'a [Id<ArticleMarker>],
    ) -> BoxFuture<'a, StorageResult<Vec<Article>>> {
        let state = self.state();
        done(
            ids.iter()
                .rev()
                .filter_map(|id| state.articles.get(&id.get()).cloned())
                .collect(),
        )
    }
}

#[derive(Default)]
pub(crate) struct MemoryKv {
    entries: Mutex<HashMap<String, (String, PositiveDuration)>>,
    failing: AtomicBool,
}

impl MemoryKv {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, (String, PositiveDuration)>> {
        self.entries.lock().unwrap()
    }

    fn check(&self) -> Result<(), KvError> {
        if self.failing.load(Ordering::Relaxed) {
            Err(KvError::Unavailable("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        self.entries().get(key).map(|(value, _)| value.clone())
    }

    pub(crate) fn expiry(&self, key: &str) -> Option<PositiveDuration> {
        self.entries().get(key).map(|(_, expiry)| *expiry)
    }

    pub(crate) fn insert_raw(&self, key: &str, value: &str) {
        self.entries().insert(
            key.to_owned(),
            (value.to_owned(), PositiveDuration::from_seconds(60).unwrap()),
        );
    }
}

impl KvStore for MemoryKv {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, KvError>> {
        let result = self.check().map(|()| self.raw(key));
        Box::pin(ready(result))
    }

    fn multi_get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Option<String>>, KvError>> {
        let result = self
            .check()
            .map(|()| keys.iter().map(|key| self.raw(key)).collect());
        Box::pin(ready(result))
    }

    fn set_with_expiry<'a>(
        &'a self,
        key: &'a str,
        value: String,
        expiry: PositiveDuration,
    ) -> BoxFuture<'a, Result<(), KvError>> {
        let result = self.check().map(|()| {
            self.entries().insert(key.to_owned(), (value, expiry));
        });
        Box::pin(ready(result))
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), KvError>> {
        let result = self.check().map(|()| {
            self.entries().remove(key);
        });
        Box::pin(ready(result))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum RankingEvent {
    Push(i64),
    Remove(i64),
    Refresh,
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    events: Mutex<Vec<RankingEvent>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub(crate) fn events(&self) -> Vec<RankingEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn record(&self, event: RankingEvent) -> BoxFuture<'_, Result<(), RankingError>> {
        self.events.lock().unwrap().push(event);
        let result = if self.failing.load(Ordering::Relaxed) {
            Err(RankingError("ranking service down".to_owned()))
        } else {
            Ok(())
        };
        Box::pin(ready(result))
    }
}

impl RankingNotifier for RecordingNotifier {
    fn push(&self, status: Id<StatusMarker>) -> BoxFuture<'_, Result<(), RankingError>> {
        self.record(RankingEvent::Push(status.get()))
    }

    fn remove(&self, status: Id<StatusMarker>) -> BoxFuture<'_, Result<(), RankingError>> {
        self.record(RankingEvent::Remove(status.get()))
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), RankingError>> {
        self.record(RankingEvent::Refresh)
    }
}

pub(crate) struct Harness {
    pub store: Arc<MemoryStore>,
    pub kv: Arc<MemoryKv>,
    pub ranking: Arc<RecordingNotifier>,
    pub service: FeedService,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let kv = Arc::new(MemoryKv::default());
        let ranking = Arc::new(RecordingNotifier::default());
        let config = FeedConfig {
            image_server: IMAGE_SERVER.to_owned(),
            status_json_ttl: PositiveDuration::from_seconds(300).unwrap(),
            user_json_ttl: PositiveDuration::from_seconds(600).unwrap(),
            topic_id_ttl: PositiveDuration::from_seconds(600).unwrap(),
        };
        let service = FeedService::new(
            store.clone(),
            store.clone(),
            kv.clone(),
            ranking.clone(),
            config,
        );

        Self {
            store,
            kv,
            ranking,
            service,
        }
    }

    pub(crate) fn with_score_source(source: Arc<dyn ScoreSource>) -> Self {
        let harness = Self::new();
        Self {
            service: harness.service.with_score_source(source),
            ..harness
        }
    }
}
