use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, Viewer},
    json::{Created, Json},
    query::Query,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{
    Id, Page,
    json::{OutcomeJson, ReplyJson},
    reply::{CreateReply, ReplyMarker},
    status::StatusMarker,
};
use plaza_feed::{FeedError, FeedService};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_replies)
        .typed_post(create_reply)
        .typed_delete(delete_reply)
        .typed_post(like_reply)
        .typed_delete(unlike_reply)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/status/reply", rejection(ServerError))]
struct ReplyPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/status/reply/like", rejection(ServerError))]
struct ReplyLikePath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct ReplyIdQuery {
    id: Id<ReplyMarker>,
}

fn default_limit() -> u32 {
    Page::DEFAULT_LIMIT
}

/// Either one reply by `id`, or a page of the replies to `status_id`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct ReplyQuery {
    id: Option<Id<ReplyMarker>>,
    status_id: Option<Id<StatusMarker>>,
    #[serde(default)]
    reverse: bool,
    #[serde(default)]
    offset: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

async fn get_replies(
    ReplyPath(): ReplyPath,
    State(feed): State<Arc<FeedService>>,
    Viewer(viewer): Viewer,
    Query(query): Query<ReplyQuery>,
) -> Result<Response> {
    if let Some(id) = query.id {
        let reply = feed.get_reply(id, viewer).await?;
        return Ok(Json(reply).into_response());
    }

    let status = query
        .status_id
        .ok_or_else(|| FeedError::Validation("invalid parameters".to_owned()))?;
    let page = Page::new(query.offset, query.limit);
    let replies: Vec<ReplyJson> = feed
        .list_replies(status, query.reverse, page, viewer)
        .await?;

    Ok(Json(replies).into_response())
}

async fn create_reply(
    ReplyPath(): ReplyPath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReply>,
) -> Result<Created<ReplyJson>> {
    let created = feed
        .create_reply(request.status_id, user.user_id(), request.text)
        .await?;

    Ok(Created {
        location: created.location,
        body: created.json,
    })
}

async fn delete_reply(
    ReplyPath(): ReplyPath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Query(ReplyIdQuery { id }): Query<ReplyIdQuery>,
) -> Result<Json<OutcomeJson>> {
    let id = feed.delete_reply(id, user.user_id()).await?;

    Ok(Json(OutcomeJson {
        id: id.get(),
        message: "delete success".to_owned(),
    }))
}

async fn like_reply(
    ReplyLikePath(): ReplyLikePath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Query(ReplyIdQuery { id }): Query<ReplyIdQuery>,
) -> Result<Json<OutcomeJson>> {
    let outcome = feed.like_reply(id, user.user_id()).await?;

    Ok(Json(outcome.to_json(id.get())))
}

async fn unlike_reply(
    ReplyLikePath(): ReplyLikePath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Query(ReplyIdQuery { id }): Query<ReplyIdQuery>,
) -> Result<Json<OutcomeJson>> {
    let outcome = feed.unlike_reply(id, user.user_id()).await?;

    Ok(Json(outcome.to_json(id.get())))
}
