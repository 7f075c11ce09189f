//! JSON projections served to clients and stored in the cache.

use crate::model::{
    Id,
    article::Article,
    group::{Group, GroupMarker},
    reply::ReplyMarker,
    status::{StatusMarker, StatusType},
    topic::TopicMarker,
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const TOPIC_THEME_COLOR: &str = "#c6c5ac";

/// Denormalized status without viewer-relative fields. This is the payload
/// kept in the key-value cache.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct StatusCacheJson {
    pub id: Id<StatusMarker>,
    #[serde(rename = "type")]
    pub status_type: StatusType,
    pub title: Option<String>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub replies: u64,
    pub likes: u64,
    pub pics: Vec<String>,
    pub user_id: Id<UserMarker>,
    pub group_id: Option<Id<GroupMarker>>,
}

/// The status as served to a particular viewer.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct StatusJson {
    pub id: Id<StatusMarker>,
    #[serde(rename = "type")]
    pub status_type: StatusType,
    pub title: Option<String>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub replies: u64,
    pub likes: u64,
    pub pics: Vec<String>,
    pub user: User,
    pub liked_by_me: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_user_title: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct ReplyJson {
    pub id: Id<ReplyMarker>,
    pub text: String,
    pub user: User,
    pub likes: u64,
    pub liked_by_me: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct TopicJson {
    pub id: Id<TopicMarker>,
    pub name: String,
    pub statuses: u64,
    pub followers: u64,
    pub views: u64,
    #[serde(rename = "themeColor")]
    pub theme_color: String,
}

/// An entry of the merged home timeline.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(untagged)]
pub enum FeedItem {
    Status(Box<StatusJson>),
    Article(Article),
}

/// Result of an idempotent like/unlike or of a deletion.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct OutcomeJson {
    pub id: i64,
    pub message: String,
}
