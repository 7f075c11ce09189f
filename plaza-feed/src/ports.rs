//! Collaborators of the core. Adapters live in `plaza-db`.
//!
//! Every mutating storage method is one atomic unit: it either commits all
//! of its rows or none.

use plaza_common::{
    model::{
        Id, ModelValidationError, Page,
        article::{Article, ArticleMarker},
        group::{Group, GroupMarker},
        reply::{ReplyMarker, StatusReply},
        status::{NewStatus, Status, StatusMarker, StatusText},
        topic::{Topic, TopicMarker, TopicName, TopicSummary},
        user::{User, UserMarker},
    },
    util::PositiveDuration,
};
use std::{future::Future, pin::Pin};
use thiserror::Error;
use time::OffsetDateTime;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("A uniqueness constraint was violated")]
    Conflict,
    #[error("A referenced row does not exist")]
    MissingReference,
    #[error("Stored data was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Storage backend failed: {0}")]
    Backend(String),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum StatusFilter {
    All,
    Author(Id<UserMarker>),
    /// Only `GROUP_STATUS` entries of one group.
    GroupStatuses(Id<GroupMarker>),
    /// Only `USER_STATUS` entries.
    UserStatuses,
    /// Only `GROUP_POST` entries, optionally of one group.
    GroupPosts(Option<Id<GroupMarker>>),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum StatusOrder {
    NewestFirst,
    HighestIdFirst,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum TimelineEntryKind {
    Status,
    Article,
}

/// One row of the merged timeline query.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct TimelineEntry {
    pub kind: TimelineEntryKind,
    pub id: i64,
    pub timestamp: OffsetDateTime,
}

pub trait StatusStore: Send + Sync {
    /// Stores the status, its pictures and its topic associations. Topics
    /// are found or created by exact name.
    fn insert_status<'a>(
        &'a self,
        status: &'a NewStatus,
        topics: &'a [TopicName],
    ) -> BoxFuture<'a, StorageResult<Status>>;

    fn fetch_status(&self, id: Id<StatusMarker>) -> BoxFuture<'_, StorageResult<Option<Status>>>;

    /// Statuses with the given ids, in no particular order. Unknown ids are
    /// skipped.
    fn fetch_statuses<'a>(
        &'a self,
        ids: &'a [Id<StatusMarker>],
    ) -> BoxFuture<'a, StorageResult<Vec<Status>>>;

    fn list_statuses(
        &self,
        filter: StatusFilter,
        order: StatusOrder,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<Status>>>;

    /// Deletes the status with its pictures, replies, reply likes, likes and
    /// topic associations. Returns whether a status was deleted.
    fn delete_status(&self, id: Id<StatusMarker>) -> BoxFuture<'_, StorageResult<bool>>;

    /// Returns whether the pair was newly added.
    fn add_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>>;

    /// Returns whether the pair existed.
    fn remove_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>>;

    fn is_status_liked_by(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>>;

    fn insert_reply<'a>(
        &'a self,
        status: Id<StatusMarker>,
        author: Id<UserMarker>,
        text: &'a StatusText,
    ) -> BoxFuture<'a, StorageResult<StatusReply>>;

    fn fetch_reply(&self, id: Id<ReplyMarker>) -> BoxFuture<'_, StorageResult<Option<StatusReply>>>;

    fn list_replies(
        &self,
        status: Id<StatusMarker>,
        newest_first: bool,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<StatusReply>>>;

    fn delete_reply(&self, id: Id<ReplyMarker>) -> BoxFuture<'_, StorageResult<bool>>;

    fn add_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>>;

    fn remove_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>>;

    fn is_reply_liked_by(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>>;

    fn find_topic<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<Option<Topic>>>;

    fn fetch_topic_summary(
        &self,
        id: Id<TopicMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<TopicSummary>>>;

    /// Ids of statuses associated with the topic, highest id first.
    fn topic_status_ids(
        &self,
        topic: Id<TopicMarker>,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<Id<StatusMarker>>>>;

    /// One page of the viewer's home timeline: statuses by the viewer or by
    /// users they follow, merged with articles of the official accounts they
    /// subscribe to. Newest first; ties by kind, then highest id.
    fn timeline_page(
        &self,
        viewer: Id<UserMarker>,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<TimelineEntry>>>;
}

/// Read access to the user, group and article aggregates.
pub trait Directory: Send + Sync {
    fn fetch_user(&self, id: Id<UserMarker>) -> BoxFuture<'_, StorageResult<Option<User>>>;

    fn fetch_group(&self, id: Id<GroupMarker>) -> BoxFuture<'_, StorageResult<Option<Group>>>;

    /// The display title the user carries inside the group, if any.
    fn fetch_group_user_title(
        &self,
        group: Id<GroupMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<String>>>;

    /// Articles with the given ids, in no particular order.
    fn fetch_articles<'a>(
        &'a self,
        ids: &'a [Id<ArticleMarker>],
    ) -> BoxFuture<'a, StorageResult<Vec<Article>>>;
}

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Key-value store unavailable: {0}")]
    Unavailable(String),
    #[error("Cached payload could not be decoded: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A key-value store with expiring entries.
pub trait KvStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, KvError>>;

    /// One slot per key, in key order.
    fn multi_get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Option<String>>, KvError>>;

    fn set_with_expiry<'a>(
        &'a self,
        key: &'a str,
        value: String,
        expiry: PositiveDuration,
    ) -> BoxFuture<'a, Result<(), KvError>>;

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), KvError>>;
}

#[derive(Debug, Error)]
#[error("Ranking notification failed: {0}")]
pub struct RankingError(pub String);

/// The external ranking collaborator. Calls are fire-and-forget.
pub trait RankingNotifier: Send + Sync {
    /// A status was created or engaged with.
    fn push(&self, status: Id<StatusMarker>) -> BoxFuture<'_, Result<(), RankingError>>;

    fn remove(&self, status: Id<StatusMarker>) -> BoxFuture<'_, Result<(), RankingError>>;

    /// Recompute the ranked "hot" set.
    fn refresh(&self) -> BoxFuture<'_, Result<(), RankingError>>;
}
