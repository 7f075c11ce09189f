//! Likes on statuses and replies, and replies themselves.

use crate::{FeedError, FeedResult, FeedService, Resource, ports::StorageError};
use plaza_common::model::{
    Id, Page,
    json::{OutcomeJson, ReplyJson},
    reply::{ReplyMarker, StatusReply},
    status::{StatusMarker, StatusText, StatusValidationError},
    user::UserMarker,
};
use tracing::{info, instrument};

/// Result of an idempotent set membership change.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum MembershipOutcome {
    Created,
    AlreadyCreated,
    Deleted,
    AlreadyDeleted,
}

impl MembershipOutcome {
    fn added(changed: bool) -> Self {
        if changed {
            MembershipOutcome::Created
        } else {
            MembershipOutcome::AlreadyCreated
        }
    }

    fn removed(changed: bool) -> Self {
        if changed {
            MembershipOutcome::Deleted
        } else {
            MembershipOutcome::AlreadyDeleted
        }
    }

    #[must_use]
    pub fn changed(self) -> bool {
        matches!(self, MembershipOutcome::Created | MembershipOutcome::Deleted)
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            MembershipOutcome::Created => "create success",
            MembershipOutcome::AlreadyCreated => "already created.",
            MembershipOutcome::Deleted => "delete success",
            MembershipOutcome::AlreadyDeleted => "already deleted.",
        }
    }

    #[must_use]
    pub fn to_json(self, id: i64) -> OutcomeJson {
        OutcomeJson {
            id,
            message: self.message().to_owned(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatedReply {
    pub json: ReplyJson,
    pub location: String,
}

fn missing_status(err: StorageError) -> FeedError {
    match err {
        StorageError::MissingReference => FeedError::NotFound(Resource::Status),
        other => other.into(),
    }
}

fn missing_reply(err: StorageError) -> FeedError {
    match err {
        StorageError::MissingReference => FeedError::NotFound(Resource::Reply),
        other => other.into(),
    }
}

impl FeedService {
    async fn require_status(&self, id: Id<StatusMarker>) -> FeedResult<()> {
        match self.store.fetch_status(id).await? {
            Some(_) => Ok(()),
            None => Err(FeedError::NotFound(Resource::Status)),
        }
    }

    async fn require_reply(&self, id: Id<ReplyMarker>) -> FeedResult<StatusReply> {
        self.store
            .fetch_reply(id)
            .await?
            .ok_or(FeedError::NotFound(Resource::Reply))
    }

    #[instrument(skip(self))]
    pub async fn like_status(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> FeedResult<MembershipOutcome> {
        self.require_status(status).await?;
        let added = self
            .store
            .add_status_like(status, user)
            .await
            .map_err(missing_status)?;
        let outcome = MembershipOutcome::added(added);

        if outcome.changed() {
            info!(%status, %user, "Liked status");
            self.cache.invalidate_status(status).await;
            self.ranking.push(status).await;
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn unlike_status(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> FeedResult<MembershipOutcome> {
        self.require_status(status).await?;
        let outcome =
            MembershipOutcome::removed(self.store.remove_status_like(status, user).await?);

        if outcome.changed() {
            info!(%status, %user, "Unliked status");
            self.cache.invalidate_status(status).await;
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn like_reply(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> FeedResult<MembershipOutcome> {
        self.require_reply(reply).await?;
        let added = self
            .store
            .add_reply_like(reply, user)
            .await
            .map_err(missing_reply)?;
        let outcome = MembershipOutcome::added(added);

        if outcome.changed() {
            info!(%reply, %user, "Liked reply");
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub async fn unlike_reply(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> FeedResult<MembershipOutcome> {
        self.require_reply(reply).await?;
        let outcome = MembershipOutcome::removed(self.store.remove_reply_like(reply, user).await?);

        if outcome.changed() {
            info!(%reply, %user, "Unliked reply");
        }
        Ok(outcome)
    }

    pub async fn project_reply(
        &self,
        reply: &StatusReply,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<ReplyJson> {
        let user = self
            .cache
            .get_user_json(reply.author)
            .await?
            .ok_or(FeedError::NotFound(Resource::User))?;
        let liked_by_me = match viewer {
            Some(viewer) => self.store.is_reply_liked_by(reply.id, viewer).await?,
            None => false,
        };

        Ok(ReplyJson {
            id: reply.id,
            text: reply.text.get().to_owned(),
            user,
            likes: reply.likes,
            liked_by_me,
            timestamp: reply.timestamp,
        })
    }

    #[instrument(skip(self, text))]
    pub async fn create_reply(
        &self,
        status: Id<StatusMarker>,
        author: Id<UserMarker>,
        text: String,
    ) -> FeedResult<CreatedReply> {
        let text = StatusText::new(text).map_err(|_| StatusValidationError::EmptyText)?;
        self.require_status(status).await?;

        let reply = self
            .store
            .insert_reply(status, author, &text)
            .await
            .map_err(missing_status)?;
        info!(reply = %reply.id, %status, "Created reply");

        self.cache.invalidate_status(status).await;
        self.ranking.push(status).await;

        let json = self.project_reply(&reply, Some(author)).await?;
        Ok(CreatedReply {
            location: format!("/status/reply?id={}", reply.id),
            json,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_reply(
        &self,
        id: Id<ReplyMarker>,
        requester: Id<UserMarker>,
    ) -> FeedResult<Id<ReplyMarker>> {
        let reply = self.require_reply(id).await?;
        if reply.author != requester {
            return Err(FeedError::owner_required());
        }

        if !self.store.delete_reply(id).await? {
            return Err(FeedError::NotFound(Resource::Reply));
        }
        info!(reply = %id, status = %reply.status, "Deleted reply");

        self.cache.invalidate_status(reply.status).await;
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn get_reply(
        &self,
        id: Id<ReplyMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<ReplyJson> {
        let reply = self.require_reply(id).await?;
        self.project_reply(&reply, viewer).await
    }

    /// Replies of a status, oldest first unless `reverse`.
    #[instrument(skip(self))]
    pub async fn list_replies(
        &self,
        status: Id<StatusMarker>,
        reverse: bool,
        page: Page,
        viewer: Option<Id<UserMarker>>,
    ) -> FeedResult<Vec<ReplyJson>> {
        self.require_status(status).await?;

        let replies = self.store.list_replies(status, reverse, page).await?;
        let mut json = Vec::with_capacity(replies.len());
        for reply in &replies {
            json.push(self.project_reply(reply, viewer).await?);
        }
        Ok(json)
    }
}
