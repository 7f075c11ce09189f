use plaza_common::model::{
    Id, ModelValidationError,
    article::Article,
    auth::Authentication,
    group::Group,
    reply::StatusReply,
    status::{Picture, Status, StatusKind, StatusText},
    topic::{Topic, TopicName, TopicSummary},
    user::{User, UserHandle},
};
use plaza_feed::ports::{TimelineEntry, TimelineEntryKind};
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};

pub(crate) const TIMELINE_STATUS: i16 = 0;
pub(crate) const TIMELINE_ARTICLE: i16 = 1;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub handle: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct GroupRecord {
    pub group_id: i64,
    pub name: String,
    pub members: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct ArticleRecord {
    pub article_id: i64,
    pub official_account_id: i64,
    pub title: String,
    pub description: String,
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct StatusRecord {
    pub status_id: i64,
    pub user_id: i64,
    pub type_id: i16,
    pub title: Option<String>,
    pub text: String,
    pub group_id: Option<i64>,
    pub timestamp: OffsetDateTime,
    pub replies: i64,
    pub likes: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct InsertedRecord {
    pub id: i64,
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PictureRecord {
    pub status_id: i64,
    pub url: String,
    pub display_index: i32,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct ReplyRecord {
    pub reply_id: i64,
    pub status_id: i64,
    pub user_id: i64,
    pub text: String,
    pub timestamp: OffsetDateTime,
    pub likes: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TopicRecord {
    pub topic_id: i64,
    pub name: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TopicSummaryRecord {
    pub topic_id: i64,
    pub name: String,
    pub statuses: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TimelineRecord {
    pub kind: i16,
    pub id: i64,
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_id: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.into(),
            handle: UserHandle::new(value.handle)?,
        })
    }
}

impl From<GroupRecord> for Group {
    fn from(value: GroupRecord) -> Self {
        Self {
            id: value.group_id.into(),
            name: value.name,
            members: value.members.cast_unsigned(),
        }
    }
}

impl From<ArticleRecord> for Article {
    fn from(value: ArticleRecord) -> Self {
        Self {
            id: value.article_id.into(),
            official_account_id: value.official_account_id.into(),
            title: value.title,
            description: value.description,
            timestamp: value.timestamp,
        }
    }
}

impl TryFrom<PictureRecord> for Picture {
    type Error = ModelValidationError;

    fn try_from(value: PictureRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            url: value.url,
            index: u32::try_from(value.display_index)
                .map_err(|_| ModelValidationError::PictureIndex(value.display_index))?,
        })
    }
}

impl StatusRecord {
    /// `pictures` must already be ordered by index.
    pub(crate) fn into_status(
        self,
        pictures: Vec<Picture>,
    ) -> Result<Status, ModelValidationError> {
        Ok(Status {
            id: self.status_id.into(),
            author: self.user_id.into(),
            kind: StatusKind::from_columns(self.type_id, self.title, self.group_id.map(Id::new))?,
            text: StatusText::new(self.text)?,
            timestamp: self.timestamp,
            pictures,
            replies: self.replies.cast_unsigned(),
            likes: self.likes.cast_unsigned(),
        })
    }
}

impl TryFrom<ReplyRecord> for StatusReply {
    type Error = ModelValidationError;

    fn try_from(value: ReplyRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.reply_id.into(),
            status: value.status_id.into(),
            author: value.user_id.into(),
            text: StatusText::new(value.text)?,
            timestamp: value.timestamp,
            likes: value.likes.cast_unsigned(),
        })
    }
}

impl TryFrom<TopicRecord> for Topic {
    type Error = ModelValidationError;

    fn try_from(value: TopicRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.topic_id.into(),
            name: TopicName::new(value.name)?,
        })
    }
}

impl TryFrom<TopicSummaryRecord> for TopicSummary {
    type Error = ModelValidationError;

    fn try_from(value: TopicSummaryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            topic: Topic {
                id: value.topic_id.into(),
                name: TopicName::new(value.name)?,
            },
            statuses: value.statuses.cast_unsigned(),
        })
    }
}

impl From<TimelineRecord> for TimelineEntry {
    fn from(value: TimelineRecord) -> Self {
        Self {
            kind: if value.kind == TIMELINE_ARTICLE {
                TimelineEntryKind::Article
            } else {
                TimelineEntryKind::Status
            },
            id: value.id,
            timestamp: value.timestamp,
        }
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_id.into(),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}
