//! Read-through denormalization boundary between the feed core and the
//! key-value store.
//!
//! Statuses are cached in their viewer-independent form and hydrated per
//! request. Entries expire after their configured TTL; mutations evict the
//! status entry they change.

use crate::{
    FeedConfig, FeedError, FeedResult, Resource,
    ports::{Directory, KvStore, StatusStore},
    statuses::project_cache,
};
use plaza_common::{
    model::{
        Id,
        json::{StatusCacheJson, StatusJson},
        status::{StatusMarker, StatusType},
        topic::TopicMarker,
        user::{User, UserMarker},
    },
    util::PositiveDuration,
};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) fn status_json_key(id: Id<StatusMarker>) -> String {
    format!("status:{id}:json")
}

pub(crate) fn user_json_key(id: Id<UserMarker>) -> String {
    format!("user:{id}:json")
}

pub(crate) fn topic_id_key(name: &str) -> String {
    format!("topic:{name}:id")
}

fn decode<T: DeserializeOwned>(key: &str, payload: &str) -> Option<T> {
    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "Discarding undecodable cache entry");
            None
        }
    }
}

pub struct CacheBoundary {
    kv: Arc<dyn KvStore>,
    store: Arc<dyn StatusStore>,
    directory: Arc<dyn Directory>,
    config: FeedConfig,
}

impl CacheBoundary {
    pub(crate) fn new(
        kv: Arc<dyn KvStore>,
        store: Arc<dyn StatusStore>,
        directory: Arc<dyn Directory>,
        config: FeedConfig,
    ) -> Self {
        Self {
            kv,
            store,
            directory,
            config,
        }
    }

    #[must_use]
    pub fn image_server(&self) -> &str {
        &self.config.image_server
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.kv.get(key).await {
            Ok(Some(payload)) => {
                debug!(key, "Cache hit");
                decode(key, &payload)
            }
            Ok(None) => {
                debug!(key, "Cache miss");
                None
            }
            Err(err) => {
                warn!(key, error = %err, "Cache read failed, falling back to storage");
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T, expiry: PositiveDuration) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key, error = %err, "Could not encode cache entry");
                return;
            }
        };

        if let Err(err) = self.kv.set_with_expiry(key, payload, expiry).await {
            warn!(key, error = %err, "Cache write failed");
        }
    }

    /// Drops the cached projection of a status.
    pub async fn invalidate_status(&self, id: Id<StatusMarker>) {
        let key = status_json_key(id);
        match self.kv.delete(&key).await {
            Ok(()) => debug!(key, "Evicted cache entry"),
            Err(err) => warn!(key, error = %err, "Cache eviction failed"),
        }
    }

    pub async fn get_status_cache_json(
        &self,
        id: Id<StatusMarker>,
    ) -> FeedResult<Option<StatusCacheJson>> {
        let key = status_json_key(id);
        if let Some(cached) = self.read(&key).await {
            return Ok(Some(cached));
        }

        let Some(status) = self.store.fetch_status(id).await? else {
            return Ok(None);
        };
        let cached = project_cache(&status, &self.config.image_server);
        // An eviction racing this read can be overwritten with the older
        // projection; the TTL bounds how long it is served.
        self.write(&key, &cached, self.config.status_json_ttl).await;

        Ok(Some(cached))
    }

    pub async fn get_status_json(
        &self,
        id: Id<StatusMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<Option<StatusJson>> {
        match self.get_status_cache_json(id).await? {
            Some(cached) => Ok(Some(self.hydrate(cached, viewer).await?)),
            None => Ok(None),
        }
    }

    /// Full projections of every known status in `ids`. Cache hits come
    /// first, so callers must not rely on the order.
    pub async fn multiget_status_json(
        &self,
        ids: &[Id<StatusMarker>],
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<Vec<StatusJson>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys = ids.iter().map(|id| status_json_key(*id)).collect::<Vec<_>>();
        let slots = match self.kv.multi_get(&keys).await {
            Ok(slots) if slots.len() == ids.len() => slots,
            Ok(slots) => {
                warn!(
                    expected = ids.len(),
                    got = slots.len(),
                    "Cache returned a mismatched batch, ignoring it"
                );
                vec![None; ids.len()]
            }
            Err(err) => {
                warn!(error = %err, "Cache batch read failed, falling back to storage");
                vec![None; ids.len()]
            }
        };

        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for ((id, key), slot) in ids.iter().zip(&keys).zip(slots) {
            match slot.and_then(|payload| decode::<StatusCacheJson>(key, &payload)) {
                Some(cached) => found.push(cached),
                None => missing.push(*id),
            }
        }
        debug!(hits = found.len(), misses = missing.len(), "Batch cache lookup");

        if !missing.is_empty() {
            for status in self.store.fetch_statuses(&missing).await? {
                let cached = project_cache(&status, &self.config.image_server);
                self.write(&status_json_key(status.id), &cached, self.config.status_json_ttl)
                    .await;
                found.push(cached);
            }
        }

        let mut statuses = Vec::with_capacity(found.len());
        for cached in found {
            statuses.push(self.hydrate(cached, viewer).await?);
        }
        Ok(statuses)
    }

    /// Uncached lookup through the user directory.
    pub async fn get_user(&self, id: Id<UserMarker>) -> FeedResult<Option<User>> {
        Ok(self.directory.fetch_user(id).await?)
    }

    pub async fn get_user_json(&self, id: Id<UserMarker>) -> FeedResult<Option<User>> {
        let key = user_json_key(id);
        if let Some(user) = self.read(&key).await {
            return Ok(Some(user));
        }

        let user = self.get_user(id).await?;
        if let Some(user) = &user {
            self.write(&key, user, self.config.user_json_ttl).await;
        }
        Ok(user)
    }

    pub async fn is_status_liked_by(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> FeedResult<bool> {
        Ok(self.store.is_status_liked_by(status, user).await?)
    }

    /// The id of the topic named `name`, cached for the topic TTL. Unknown
    /// names are not cached.
    pub async fn topic_id(&self, name: &str) -> FeedResult<Option<Id<TopicMarker>>> {
        let key = topic_id_key(name);
        if let Some(id) = self.read(&key).await {
            return Ok(Some(id));
        }

        let Some(topic) = self.store.find_topic(name).await? else {
            return Ok(None);
        };
        self.write(&key, &topic.id, self.config.topic_id_ttl).await;
        Ok(Some(topic.id))
    }

    /// Resolves the viewer-relative and referenced fields of a cached status.
    pub(crate) async fn hydrate(
        &self,
        cached: StatusCacheJson,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<StatusJson> {
        let user = self
            .get_user_json(cached.user_id)
            .await?
            .ok_or(FeedError::NotFound(Resource::User))?;
        let liked_by_me = match viewer {
            Some(viewer) => self.is_status_liked_by(cached.id, viewer).await?,
            None => false,
        };
        let group = match cached.group_id {
            Some(group) => self.directory.fetch_group(group).await?,
            None => None,
        };
        let group_user_title = match (cached.status_type, cached.group_id) {
            (StatusType::GroupPost, Some(group)) => {
                self.directory
                    .fetch_group_user_title(group, cached.user_id)
                    .await?
            }
            _ => None,
        };

        Ok(StatusJson {
            id: cached.id,
            status_type: cached.status_type,
            title: cached.title,
            text: cached.text,
            timestamp: cached.timestamp,
            replies: cached.replies,
            likes: cached.likes,
            pics: cached.pics,
            user,
            liked_by_me,
            group,
            group_user_title,
        })
    }
}
