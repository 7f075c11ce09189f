use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, Viewer},
    json::{Created, Json},
    query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{
    Id,
    json::{OutcomeJson, StatusJson},
    status::{CreateStatus, StatusMarker},
};
use plaza_feed::{
    FeedService,
    dispatch::{FeedQuery, FeedResponse},
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_feed)
        .typed_post(create_status)
        .typed_delete(delete_status)
        .typed_post(like_status)
        .typed_delete(unlike_status)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/status", rejection(ServerError))]
struct StatusPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/status/like", rejection(ServerError))]
struct StatusLikePath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct StatusIdQuery {
    id: Id<StatusMarker>,
}

async fn get_feed(
    StatusPath(): StatusPath,
    State(feed): State<Arc<FeedService>>,
    Viewer(viewer): Viewer,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>> {
    Ok(Json(feed.fetch_feed(&query, viewer).await?))
}

async fn create_status(
    StatusPath(): StatusPath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateStatus>,
) -> Result<Created<StatusJson>> {
    let created = feed.create_status(user.user_id(), request).await?;

    Ok(Created {
        location: created.location,
        body: created.json,
    })
}

async fn delete_status(
    StatusPath(): StatusPath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Query(StatusIdQuery { id }): Query<StatusIdQuery>,
) -> Result<Json<OutcomeJson>> {
    let id = feed.delete_status(id, user.user_id()).await?;

    Ok(Json(OutcomeJson {
        id: id.get(),
        message: "delete success".to_owned(),
    }))
}

async fn like_status(
    StatusLikePath(): StatusLikePath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Query(StatusIdQuery { id }): Query<StatusIdQuery>,
) -> Result<Json<OutcomeJson>> {
    let outcome = feed.like_status(id, user.user_id()).await?;

    Ok(Json(outcome.to_json(id.get())))
}

async fn unlike_status(
    StatusLikePath(): StatusLikePath,
    State(feed): State<Arc<FeedService>>,
    user: AuthenticatedUser,
    Query(StatusIdQuery { id }): Query<StatusIdQuery>,
) -> Result<Json<OutcomeJson>> {
    let outcome = feed.unlike_status(id, user.user_id()).await?;

    Ok(Json(outcome.to_json(id.get())))
}
