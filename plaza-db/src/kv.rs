use plaza_common::{
    model::{Id, status::StatusMarker},
    util::PositiveDuration,
};
use plaza_feed::ports::{BoxFuture, KvError, KvStore, RankingError, RankingNotifier};
use redis::{AsyncCommands, RedisError, aio::ConnectionManager};
use serde::Serialize;
use tracing::debug;

/// Channel the external ranking service subscribes to.
pub const RANKING_CHANNEL: &str = "plaza:ranking";

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum RankingEvent {
    Push { status_id: Id<StatusMarker> },
    Remove { status_id: Id<StatusMarker> },
    Refresh,
}

fn unavailable(err: RedisError) -> KvError {
    KvError::Unavailable(err.to_string())
}

/// Redis backed cache entries and ranking events, over one multiplexed
/// connection that reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url).map_err(unavailable)?;
        let manager = ConnectionManager::new(client).await.map_err(unavailable)?;

        Ok(Self { manager })
    }

    async fn publish(&self, event: RankingEvent) -> Result<(), RankingError> {
        let payload = serde_json::to_string(&event).map_err(|err| RankingError(err.to_string()))?;

        let mut conn = self.manager.clone();
        let receivers: i64 = conn
            .publish(RANKING_CHANNEL, &payload)
            .await
            .map_err(|err| RankingError(err.to_string()))?;
        debug!(%payload, receivers, "Published ranking event");

        Ok(())
    }
}

impl KvStore for RedisStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, KvError>> {
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let value: Option<String> = conn.get(key).await.map_err(unavailable)?;
            Ok(value)
        })
    }

    fn multi_get<'a>(
        &'a self,
        keys: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<Option<String>>, KvError>> {
        Box::pin(async move {
            if keys.is_empty() {
                return Ok(Vec::new());
            }

            let mut conn = self.manager.clone();
            let values: Vec<Option<String>> = redis::cmd("MGET")
                .arg(keys)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            Ok(values)
        })
    }

    fn set_with_expiry<'a>(
        &'a self,
        key: &'a str,
        value: String,
        expiry: PositiveDuration,
    ) -> BoxFuture<'a, Result<(), KvError>> {
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(expiry.whole_seconds_ceil())
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), KvError>> {
        Box::pin(async move {
            let mut conn = self.manager.clone();
            let _: i64 = conn.del(key).await.map_err(unavailable)?;
            Ok(())
        })
    }
}

impl RankingNotifier for RedisStore {
    fn push(&self, status: Id<StatusMarker>) -> BoxFuture<'_, Result<(), RankingError>> {
        Box::pin(self.publish(RankingEvent::Push { status_id: status }))
    }

    fn remove(&self, status: Id<StatusMarker>) -> BoxFuture<'_, Result<(), RankingError>> {
        Box::pin(self.publish(RankingEvent::Remove { status_id: status }))
    }

    fn refresh(&self) -> BoxFuture<'_, Result<(), RankingError>> {
        Box::pin(self.publish(RankingEvent::Refresh))
    }
}
