use crate::{FeedError, FeedResult, FeedService, Resource};
use plaza_common::model::{
    Id,
    json::{TOPIC_THEME_COLOR, TopicJson},
    status::{StatusKind, StatusText},
    topic::{TopicMarker, TopicName, TopicSummary, extract_topics},
};
use tracing::instrument;

/// Topics a new status is indexed under.
///
/// Only personal statuses are indexed. Group statuses and group posts may
/// contain `#tags#` but never create topics or associations.
#[must_use]
pub fn indexed_topics(kind: &StatusKind, text: &StatusText) -> Vec<TopicName> {
    match kind {
        StatusKind::UserStatus => extract_topics(text.get()),
        StatusKind::GroupStatus { .. } | StatusKind::GroupPost { .. } => Vec::new(),
    }
}

fn topic_json(summary: TopicSummary) -> TopicJson {
    TopicJson {
        id: summary.topic.id,
        name: summary.topic.name.get().to_owned(),
        statuses: summary.statuses,
        followers: 0,
        views: 0,
        theme_color: TOPIC_THEME_COLOR.to_owned(),
    }
}

impl FeedService {
    #[instrument(skip(self))]
    pub async fn get_topic(&self, id: Id<TopicMarker>) -> FeedResult<TopicJson> {
        self.store
            .fetch_topic_summary(id)
            .await?
            .map(topic_json)
            .ok_or(FeedError::NotFound(Resource::Topic))
    }

    #[instrument(skip(self))]
    pub async fn get_topic_by_name(&self, name: &str) -> FeedResult<TopicJson> {
        let id = self
            .cache
            .topic_id(name)
            .await?
            .ok_or(FeedError::NotFound(Resource::Topic))?;
        self.get_topic(id).await
    }
}
