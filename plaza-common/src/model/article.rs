use crate::model::Id;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ArticleMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct OfficialAccountMarker;

/// Read model of an article published by an official account. Articles are
/// merged with statuses in the home timeline.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Article {
    pub id: Id<ArticleMarker>,
    pub official_account_id: Id<OfficialAccountMarker>,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}
