use crate::ports::StorageError;
use plaza_common::model::status::StatusValidationError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type FeedResult<T, E = FeedError> = std::result::Result<T, E>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Resource {
    Status,
    Reply,
    Group,
    Topic,
    User,
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Resource::Status => "status",
            Resource::Reply => "reply",
            Resource::Group => "group",
            Resource::Topic => "topic",
            Resource::User => "user",
        })
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("The {0} was not found")]
    NotFound(Resource),
    #[error("Not authorized: {0}")]
    Authorization(&'static str),
    #[error("A concurrent write conflicted")]
    Conflict,
    #[error(transparent)]
    Storage(StorageError),
}

impl FeedError {
    pub(crate) fn owner_required() -> Self {
        FeedError::Authorization("owner required")
    }
}

impl From<StatusValidationError> for FeedError {
    fn from(value: StatusValidationError) -> Self {
        FeedError::Validation(value.to_string())
    }
}

impl From<StorageError> for FeedError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict => FeedError::Conflict,
            other => FeedError::Storage(other),
        }
    }
}
