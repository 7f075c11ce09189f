//! The status aggregate: personal statuses, group statuses and group posts.

use crate::model::{Id, group::GroupMarker, user::UserMarker};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use thiserror::Error;
use time::OffsetDateTime;

pub const STATUS_TITLE_MAX_LEN: usize = 32;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct StatusMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PictureMarker;

/// The stored discriminator of a status.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    UserStatus,
    GroupStatus,
    GroupPost,
}

impl StatusType {
    #[must_use]
    pub fn type_id(self) -> i16 {
        match self {
            StatusType::UserStatus => 0,
            StatusType::GroupStatus => 1,
            StatusType::GroupPost => 2,
        }
    }

    #[must_use]
    pub fn from_type_id(type_id: i16) -> Option<Self> {
        match type_id {
            0 => Some(StatusType::UserStatus),
            1 => Some(StatusType::GroupStatus),
            2 => Some(StatusType::GroupPost),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatusType::UserStatus => "USER_STATUS",
            StatusType::GroupStatus => "GROUP_STATUS",
            StatusType::GroupPost => "GROUP_POST",
        }
    }
}

impl<'de> Deserialize<'de> for StatusType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "USER_STATUS" => Ok(StatusType::UserStatus),
            "GROUP_STATUS" => Ok(StatusType::GroupStatus),
            "GROUP_POST" => Ok(StatusType::GroupPost),
            _ => Err(D::Error::custom(StatusValidationError::UnknownType(name))),
        }
    }
}

/// What a status is, carrying exactly the fields that kind may have.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum StatusKind {
    UserStatus,
    GroupStatus {
        group: Id<GroupMarker>,
    },
    GroupPost {
        group: Id<GroupMarker>,
        title: StatusTitle,
    },
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error(
    "Stored status kind is invalid: type {type_id}, title present: {has_title}, group present: {has_group}"
)]
pub struct InvalidStatusKindError {
    pub type_id: i16,
    pub has_title: bool,
    pub has_group: bool,
}

impl StatusKind {
    #[must_use]
    pub fn status_type(&self) -> StatusType {
        match self {
            StatusKind::UserStatus => StatusType::UserStatus,
            StatusKind::GroupStatus { .. } => StatusType::GroupStatus,
            StatusKind::GroupPost { .. } => StatusType::GroupPost,
        }
    }

    #[must_use]
    pub fn group(&self) -> Option<Id<GroupMarker>> {
        match self {
            StatusKind::UserStatus => None,
            StatusKind::GroupStatus { group } | StatusKind::GroupPost { group, .. } => Some(*group),
        }
    }

    #[must_use]
    pub fn title(&self) -> Option<&StatusTitle> {
        match self {
            StatusKind::GroupPost { title, .. } => Some(title),
            StatusKind::UserStatus | StatusKind::GroupStatus { .. } => None,
        }
    }

    /// Rebuilds a kind from its stored columns. Only the three legal
    /// (type, title, group) combinations are accepted.
    pub fn from_columns(
        type_id: i16,
        title: Option<String>,
        group: Option<Id<GroupMarker>>,
    ) -> Result<Self, InvalidStatusKindError> {
        let error = InvalidStatusKindError {
            type_id,
            has_title: title.is_some(),
            has_group: group.is_some(),
        };

        match (StatusType::from_type_id(type_id), title, group) {
            (Some(StatusType::UserStatus), None, None) => Ok(StatusKind::UserStatus),
            (Some(StatusType::GroupStatus), None, Some(group)) => {
                Ok(StatusKind::GroupStatus { group })
            }
            (Some(StatusType::GroupPost), Some(title), Some(group)) => Ok(StatusKind::GroupPost {
                group,
                title: StatusTitle::new(title).map_err(|_| error.clone())?,
            }),
            _ => Err(error),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum StatusValidationError {
    #[error("empty text")]
    EmptyText,
    #[error("empty title")]
    EmptyTitle,
    #[error("title longer than {STATUS_TITLE_MAX_LEN} characters")]
    TitleTooLong,
    #[error("missing group")]
    MissingGroup,
    #[error("{0} does not take a group")]
    UnexpectedGroup(&'static str),
    #[error("{0} does not take a title")]
    UnexpectedTitle(&'static str),
    #[error("unknown type: {0}")]
    UnknownType(String),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Status text was empty")]
pub struct InvalidStatusTextError;

/// Non-empty body text of a status or a reply.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusText(String);

impl StatusText {
    pub fn new(text: String) -> Result<Self, InvalidStatusTextError> {
        if text.is_empty() {
            Err(InvalidStatusTextError)
        } else {
            Ok(Self(text))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusTitle(String);

impl StatusTitle {
    pub fn new(title: String) -> Result<Self, StatusValidationError> {
        if title.is_empty() {
            Err(StatusValidationError::EmptyTitle)
        } else if title.chars().count() > STATUS_TITLE_MAX_LEN {
            Err(StatusValidationError::TitleTooLong)
        } else {
            Ok(Self(title))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Picture {
    pub url: String,
    pub index: u32,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Status {
    pub id: Id<StatusMarker>,
    pub author: Id<UserMarker>,
    pub kind: StatusKind,
    pub text: StatusText,
    pub timestamp: OffsetDateTime,
    /// Ordered by [`Picture::index`].
    pub pictures: Vec<Picture>,
    pub replies: u64,
    pub likes: u64,
}

/// A status that passed validation and is ready to be stored.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewStatus {
    pub author: Id<UserMarker>,
    pub kind: StatusKind,
    pub text: StatusText,
    pub picture_urls: Vec<String>,
}

impl NewStatus {
    /// Pictures indexed by their position in the request.
    pub fn pictures(&self) -> impl Iterator<Item = Picture> + '_ {
        (0..).zip(&self.picture_urls).map(|(index, url)| Picture {
            url: url.clone(),
            index,
        })
    }
}

/// Request body for creating a status.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct CreateStatus {
    #[serde(rename = "type")]
    pub status_type: StatusType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub group_id: Option<Id<GroupMarker>>,
    #[serde(default, rename = "pics")]
    pub picture_urls: Vec<String>,
}

impl CreateStatus {
    /// Checks the request shape. Group existence is checked against storage
    /// by the caller.
    pub fn validate(self, author: Id<UserMarker>) -> Result<NewStatus, StatusValidationError> {
        let text = StatusText::new(self.text).map_err(|_| StatusValidationError::EmptyText)?;
        // An empty title counts as no title.
        let title = self.title.filter(|title| !title.is_empty());
        let type_name = self.status_type.as_str();

        let kind = match self.status_type {
            StatusType::UserStatus => {
                if self.group_id.is_some() {
                    return Err(StatusValidationError::UnexpectedGroup(type_name));
                }
                if title.is_some() {
                    return Err(StatusValidationError::UnexpectedTitle(type_name));
                }
                StatusKind::UserStatus
            }
            StatusType::GroupStatus => {
                if title.is_some() {
                    return Err(StatusValidationError::UnexpectedTitle(type_name));
                }
                let group = self.group_id.ok_or(StatusValidationError::MissingGroup)?;
                StatusKind::GroupStatus { group }
            }
            StatusType::GroupPost => {
                let title = StatusTitle::new(title.unwrap_or_default())?;
                let group = self.group_id.ok_or(StatusValidationError::MissingGroup)?;
                StatusKind::GroupPost { group, title }
            }
        };

        Ok(NewStatus {
            author,
            kind,
            text,
            picture_urls: self.picture_urls,
        })
    }
}
