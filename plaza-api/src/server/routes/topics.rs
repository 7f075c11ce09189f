use crate::server::{Result, ServerError, ServerRouter, json::Json, query::Query};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{Id, json::TopicJson, topic::TopicMarker};
use plaza_feed::{FeedError, FeedService};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_topic)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/topic", rejection(ServerError))]
struct TopicPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct TopicQuery {
    id: Option<Id<TopicMarker>>,
    name: Option<String>,
}

async fn get_topic(
    TopicPath(): TopicPath,
    State(feed): State<Arc<FeedService>>,
    Query(query): Query<TopicQuery>,
) -> Result<Json<TopicJson>> {
    let topic = match (query.id, query.name) {
        (Some(id), _) => feed.get_topic(id).await?,
        (None, Some(name)) => feed.get_topic_by_name(&name).await?,
        (None, None) => return Err(FeedError::Validation("invalid parameters".to_owned()).into()),
    };

    Ok(Json(topic))
}
