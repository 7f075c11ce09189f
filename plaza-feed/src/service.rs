use crate::{
    cache::CacheBoundary,
    ports::{Directory, KvStore, RankingNotifier, StatusStore},
    ranking::{Ranking, ScoreSource},
};
use plaza_common::util::PositiveDuration;
use std::sync::Arc;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct FeedConfig {
    /// Prefix put in front of every stored picture URL.
    pub image_server: String,
    pub status_json_ttl: PositiveDuration,
    pub user_json_ttl: PositiveDuration,
    pub topic_id_ttl: PositiveDuration,
}

/// Entry point of the core. Cheap to share behind an [`Arc`]; every
/// operation takes the viewer explicitly.
pub struct FeedService {
    pub(crate) store: Arc<dyn StatusStore>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) cache: CacheBoundary,
    pub(crate) ranking: Ranking,
    pub(crate) scores: Option<Arc<dyn ScoreSource>>,
}

impl FeedService {
    #[must_use]
    pub fn new(
        store: Arc<dyn StatusStore>,
        directory: Arc<dyn Directory>,
        kv: Arc<dyn KvStore>,
        notifier: Arc<dyn RankingNotifier>,
        config: FeedConfig,
    ) -> Self {
        let cache = CacheBoundary::new(kv, Arc::clone(&store), Arc::clone(&directory), config);

        Self {
            store,
            directory,
            cache,
            ranking: Ranking::new(notifier),
            scores: None,
        }
    }

    /// Orders each page of the hot feed by the scores of `source`, highest
    /// first. Without a source the hot feed stays newest first.
    #[must_use]
    pub fn with_score_source(mut self, source: Arc<dyn ScoreSource>) -> Self {
        self.scores = Some(source);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &CacheBoundary {
        &self.cache
    }
}
