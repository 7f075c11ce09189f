//! The status aggregate: creation, deletion and the two JSON projections.

use crate::{
    FeedError, FeedResult, FeedService, Resource, ports::StorageError, topics::indexed_topics,
};
use plaza_common::model::{
    Id,
    json::{StatusCacheJson, StatusJson},
    status::{CreateStatus, Status, StatusMarker},
    user::UserMarker,
};
use tracing::{info, instrument};

/// Projects a status without any viewer-relative field. Picture URLs are
/// prefixed with `image_server`.
#[must_use]
pub fn project_cache(status: &Status, image_server: &str) -> StatusCacheJson {
    StatusCacheJson {
        id: status.id,
        status_type: status.kind.status_type(),
        title: status.kind.title().map(|title| title.get().to_owned()),
        text: status.text.get().to_owned(),
        timestamp: status.timestamp,
        replies: status.replies,
        likes: status.likes,
        pics: status
            .pictures
            .iter()
            .map(|picture| format!("{image_server}{}", picture.url))
            .collect(),
        user_id: status.author,
        group_id: status.kind.group(),
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatedStatus {
    pub json: StatusJson,
    /// Where the new status can be fetched.
    pub location: String,
}

impl FeedService {
    /// Projects a status as seen by `viewer`.
    pub async fn project_full(
        &self,
        status: &Status,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<StatusJson> {
        let cached = project_cache(status, self.cache.image_server());
        self.cache.hydrate(cached, viewer).await
    }

    #[instrument(skip(self, request))]
    pub async fn create_status(
        &self,
        author: Id<UserMarker>,
        request: CreateStatus,
    ) -> FeedResult<CreatedStatus> {
        let status = request.validate(author)?;
        if let Some(group) = status.kind.group()
            && self.directory.fetch_group(group).await?.is_none()
        {
            return Err(FeedError::NotFound(Resource::Group));
        }

        let topics = indexed_topics(&status.kind, &status.text);
        let stored = match self.store.insert_status(&status, &topics).await {
            Ok(stored) => stored,
            // The group was checked above, so this is the author, or a group
            // deleted in between.
            Err(StorageError::MissingReference) => {
                let missing = if status.kind.group().is_some() {
                    Resource::Group
                } else {
                    Resource::User
                };
                return Err(FeedError::NotFound(missing));
            }
            Err(err) => return Err(err.into()),
        };
        info!(
            status = %stored.id,
            kind = stored.kind.status_type().as_str(),
            pictures = stored.pictures.len(),
            topics = topics.len(),
            "Created status"
        );

        self.ranking.push(stored.id).await;

        let json = self.project_full(&stored, Some(author)).await?;
        Ok(CreatedStatus {
            location: format!("/status?id={}", stored.id),
            json,
        })
    }

    /// Deletes a status owned by `requester` together with everything
    /// attached to it.
    #[instrument(skip(self))]
    pub async fn delete_status(
        &self,
        id: Id<StatusMarker>,
        requester: Id<UserMarker>,
    ) -> FeedResult<Id<StatusMarker>> {
        let status = self
            .store
            .fetch_status(id)
            .await?
            .ok_or(FeedError::NotFound(Resource::Status))?;
        if status.author != requester {
            return Err(FeedError::owner_required());
        }

        if !self.store.delete_status(id).await? {
            // Lost a race against another deletion.
            return Err(FeedError::NotFound(Resource::Status));
        }
        info!(status = %id, "Deleted status");

        self.cache.invalidate_status(id).await;
        self.ranking.remove(id).await;

        Ok(id)
    }
}
