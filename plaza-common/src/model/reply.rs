use crate::model::{
    Id,
    status::{StatusMarker, StatusText},
    user::UserMarker,
};
use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ReplyMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StatusReply {
    pub id: Id<ReplyMarker>,
    pub status: Id<StatusMarker>,
    pub author: Id<UserMarker>,
    pub text: StatusText,
    pub timestamp: OffsetDateTime,
    pub likes: u64,
}

/// Request body for replying to a status.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct CreateReply {
    pub status_id: Id<StatusMarker>,
    #[serde(default)]
    pub text: String,
}
