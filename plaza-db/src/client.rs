use crate::record::{
    ArticleRecord, AuthenticationRecord, GroupRecord, InsertedRecord, PictureRecord, ReplyRecord,
    StatusRecord, TIMELINE_ARTICLE, TIMELINE_STATUS, TimelineRecord, TopicRecord,
    TopicSummaryRecord, UserRecord,
};
use plaza_common::model::{
    Id, ModelValidationError, Page,
    article::{Article, ArticleMarker},
    auth::{AuthTokenHash, Authentication},
    group::{Group, GroupMarker},
    reply::{ReplyMarker, StatusReply},
    status::{NewStatus, Picture, Status, StatusMarker, StatusText, StatusType},
    topic::{Topic, TopicMarker, TopicName, TopicSummary},
    user::{User, UserMarker},
};
use plaza_feed::ports::{
    BoxFuture, Directory, StatusFilter, StatusOrder, StatusStore, StorageError, StorageResult,
    TimelineEntry,
};
use sqlx::{
    PgPool, Postgres, QueryBuilder, migrate::MigrateError, postgres::PgPoolOptions, query,
    query_as, query_scalar,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Distinct topic names, sorted. Every transaction touches the unique index
/// entries of `statuses.topics` in this order, so two inserts naming the same
/// new tags in opposite order cannot deadlock.
fn topic_lock_order(topics: &[TopicName]) -> Vec<&str> {
    let mut names: Vec<&str> = topics.iter().map(TopicName::get).collect();
    names.sort_unstable();
    names.dedup();
    names
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("Migrating the database failed: {0}")]
    Migrate(#[from] MigrateError),
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Data(err) => StorageError::Data(err),
            DbError::Sqlx(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                StorageError::Conflict
            }
            DbError::Sqlx(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => {
                StorageError::MissingReference
            }
            other => StorageError::Backend(other.to_string()),
        }
    }
}

const STATUS_SELECT: &str = "
    SELECT
        statuses.status_id,
        statuses.user_id,
        statuses.type_id,
        statuses.title,
        statuses.text,
        statuses.group_id,
        statuses.timestamp,
        (SELECT count(*) FROM statuses.replies WHERE replies.status_id = statuses.status_id)
            AS replies,
        (SELECT count(*) FROM statuses.likes WHERE likes.status_id = statuses.status_id)
            AS likes
    FROM
        statuses.statuses
    ";

const REPLY_SELECT: &str = "
    SELECT
        replies.reply_id,
        replies.status_id,
        replies.user_id,
        replies.text,
        replies.timestamp,
        (SELECT count(*) FROM statuses.reply_likes WHERE reply_likes.reply_id = replies.reply_id)
            AS likes
    FROM
        statuses.replies
    ";

pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                auth_tokens.user_id,
                auth_tokens.token_hash,
                auth_tokens.created_at,
                auth_tokens.expires_after_seconds
            FROM
                users.auth_tokens
            WHERE
                auth_tokens.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    /// Loads the pictures of all `records` in one query.
    async fn attach_pictures(&self, records: Vec<StatusRecord>) -> Result<Vec<Status>> {
        let ids = records
            .iter()
            .map(|record| record.status_id)
            .collect::<Vec<_>>();

        let picture_records = query_as::<_, PictureRecord>(
            "
            SELECT
                pictures.status_id,
                pictures.url,
                pictures.display_index
            FROM
                statuses.pictures
            WHERE
                pictures.status_id = ANY($1)
            ORDER BY
                pictures.status_id,
                pictures.display_index
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut pictures = HashMap::<i64, Vec<Picture>>::new();
        for record in picture_records {
            let status_id = record.status_id;
            pictures
                .entry(status_id)
                .or_default()
                .push(record.try_into()?);
        }

        let statuses = records
            .into_iter()
            .map(|record| {
                let status_pictures = pictures.remove(&record.status_id).unwrap_or_default();
                record.into_status(status_pictures)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(statuses)
    }

    pub async fn insert_status(&self, status: &NewStatus, topics: &[TopicName]) -> Result<Status> {
        let mut tx = self.pool.begin().await?;

        let inserted = query_as::<_, InsertedRecord>(
            "
            INSERT INTO statuses.statuses (user_id, type_id, title, text, group_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING status_id AS id, timestamp
            ",
        )
        .bind(status.author.get())
        .bind(status.kind.status_type().type_id())
        .bind(status.kind.title().map(|title| title.get()))
        .bind(status.text.get())
        .bind(status.kind.group().map(Id::get))
        .fetch_one(&mut *tx)
        .await?;

        for picture in status.pictures() {
            query(
                "
                INSERT INTO statuses.pictures (status_id, url, display_index)
                VALUES ($1, $2, $3)
                ",
            )
            .bind(inserted.id)
            .bind(&picture.url)
            .bind(picture.index.cast_signed())
            .execute(&mut *tx)
            .await?;
        }

        for name in topic_lock_order(topics) {
            // Concurrent creators of the same name block on the unique index,
            // then see the committed row.
            query(
                "
                INSERT INTO statuses.topics (name)
                VALUES ($1)
                ON CONFLICT (name) DO NOTHING
                ",
            )
            .bind(name)
            .execute(&mut *tx)
            .await?;

            let topic_id = query_scalar::<_, i64>(
                "SELECT topics.topic_id FROM statuses.topics WHERE topics.name = $1",
            )
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            query(
                "
                INSERT INTO statuses.status_topics (status_id, topic_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(inserted.id)
            .bind(topic_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(status = inserted.id, "Inserted status");

        Ok(Status {
            id: inserted.id.into(),
            author: status.author,
            kind: status.kind.clone(),
            text: status.text.clone(),
            timestamp: inserted.timestamp,
            pictures: status.pictures().collect(),
            replies: 0,
            likes: 0,
        })
    }

    pub async fn fetch_status(&self, id: Id<StatusMarker>) -> Result<Option<Status>> {
        let record = query_as::<_, StatusRecord>(&format!(
            "{STATUS_SELECT} WHERE statuses.status_id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        Ok(self.attach_pictures(vec![record]).await?.pop())
    }

    pub async fn fetch_statuses(&self, ids: &[Id<StatusMarker>]) -> Result<Vec<Status>> {
        let ids = ids.iter().map(|id| id.get()).collect::<Vec<_>>();
        let records = query_as::<_, StatusRecord>(&format!(
            "{STATUS_SELECT} WHERE statuses.status_id = ANY($1)"
        ))
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        self.attach_pictures(records).await
    }

    pub async fn list_statuses(
        &self,
        filter: StatusFilter,
        order: StatusOrder,
        page: Page,
    ) -> Result<Vec<Status>> {
        let mut builder = QueryBuilder::<Postgres>::new(STATUS_SELECT);
        match filter {
            StatusFilter::All => {}
            StatusFilter::Author(author) => {
                builder
                    .push(" WHERE statuses.user_id = ")
                    .push_bind(author.get());
            }
            StatusFilter::GroupStatuses(group) => {
                builder
                    .push(" WHERE statuses.type_id = ")
                    .push_bind(StatusType::GroupStatus.type_id())
                    .push(" AND statuses.group_id = ")
                    .push_bind(group.get());
            }
            StatusFilter::UserStatuses => {
                builder
                    .push(" WHERE statuses.type_id = ")
                    .push_bind(StatusType::UserStatus.type_id());
            }
            StatusFilter::GroupPosts(group) => {
                builder
                    .push(" WHERE statuses.type_id = ")
                    .push_bind(StatusType::GroupPost.type_id());
                if let Some(group) = group {
                    builder
                        .push(" AND statuses.group_id = ")
                        .push_bind(group.get());
                }
            }
        }
        builder.push(match order {
            StatusOrder::NewestFirst => {
                " ORDER BY statuses.timestamp DESC, statuses.status_id DESC"
            }
            StatusOrder::HighestIdFirst => " ORDER BY statuses.status_id DESC",
        });
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(page.offset));

        let records = builder
            .build_query_as::<StatusRecord>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_pictures(records).await
    }

    /// Relies on `ON DELETE CASCADE` for pictures, replies, reply likes,
    /// likes and topic associations.
    pub async fn delete_status(&self, id: Id<StatusMarker>) -> Result<bool> {
        let result = query("DELETE FROM statuses.statuses WHERE statuses.status_id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn add_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let result = query(
            "
            INSERT INTO statuses.likes (status_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(status.get())
        .bind(user.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let result = query("DELETE FROM statuses.likes WHERE status_id = $1 AND user_id = $2")
            .bind(status.get())
            .bind(user.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_status_liked_by(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let liked = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM statuses.likes WHERE status_id = $1 AND user_id = $2)",
        )
        .bind(status.get())
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(liked)
    }

    pub async fn insert_reply(
        &self,
        status: Id<StatusMarker>,
        author: Id<UserMarker>,
        text: &StatusText,
    ) -> Result<StatusReply> {
        let inserted = query_as::<_, InsertedRecord>(
            "
            INSERT INTO statuses.replies (status_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING reply_id AS id, timestamp
            ",
        )
        .bind(status.get())
        .bind(author.get())
        .bind(text.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(StatusReply {
            id: inserted.id.into(),
            status,
            author,
            text: text.clone(),
            timestamp: inserted.timestamp,
            likes: 0,
        })
    }

    pub async fn fetch_reply(&self, id: Id<ReplyMarker>) -> Result<Option<StatusReply>> {
        let record = query_as::<_, ReplyRecord>(&format!(
            "{REPLY_SELECT} WHERE replies.reply_id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        let reply = record.map(StatusReply::try_from).transpose()?;
        Ok(reply)
    }

    pub async fn list_replies(
        &self,
        status: Id<StatusMarker>,
        newest_first: bool,
        page: Page,
    ) -> Result<Vec<StatusReply>> {
        let direction = if newest_first { "DESC" } else { "ASC" };
        let records = query_as::<_, ReplyRecord>(&format!(
            "
            {REPLY_SELECT}
            WHERE replies.status_id = $1
            ORDER BY replies.timestamp {direction}, replies.reply_id {direction}
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status.get())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;

        let replies = records
            .into_iter()
            .map(StatusReply::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(replies)
    }

    /// Reply likes go with the reply through `ON DELETE CASCADE`.
    pub async fn delete_reply(&self, id: Id<ReplyMarker>) -> Result<bool> {
        let result = query("DELETE FROM statuses.replies WHERE replies.reply_id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn add_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let result = query(
            "
            INSERT INTO statuses.reply_likes (reply_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(reply.get())
        .bind(user.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let result = query("DELETE FROM statuses.reply_likes WHERE reply_id = $1 AND user_id = $2")
            .bind(reply.get())
            .bind(user.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_reply_liked_by(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> Result<bool> {
        let liked = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM statuses.reply_likes WHERE reply_id = $1 AND user_id = $2)",
        )
        .bind(reply.get())
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(liked)
    }

    pub async fn find_topic(&self, name: &str) -> Result<Option<Topic>> {
        let record = query_as::<_, TopicRecord>(
            "SELECT topics.topic_id, topics.name FROM statuses.topics WHERE topics.name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let topic = record.map(Topic::try_from).transpose()?;
        Ok(topic)
    }

    pub async fn fetch_topic_summary(&self, id: Id<TopicMarker>) -> Result<Option<TopicSummary>> {
        let record = query_as::<_, TopicSummaryRecord>(
            "
            SELECT
                topics.topic_id,
                topics.name,
                (SELECT count(*) FROM statuses.status_topics
                    WHERE status_topics.topic_id = topics.topic_id) AS statuses
            FROM
                statuses.topics
            WHERE
                topics.topic_id = $1
            ",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        let summary = record.map(TopicSummary::try_from).transpose()?;
        Ok(summary)
    }

    pub async fn topic_status_ids(
        &self,
        topic: Id<TopicMarker>,
        page: Page,
    ) -> Result<Vec<Id<StatusMarker>>> {
        let ids = query_scalar::<_, i64>(
            "
            SELECT status_topics.status_id
            FROM statuses.status_topics
            WHERE status_topics.topic_id = $1
            ORDER BY status_topics.status_id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(topic.get())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(Id::new).collect())
    }

    pub async fn timeline_page(
        &self,
        viewer: Id<UserMarker>,
        page: Page,
    ) -> Result<Vec<TimelineEntry>> {
        let records = query_as::<_, TimelineRecord>(
            "
            SELECT timeline.kind, timeline.id, timeline.timestamp
            FROM (
                SELECT $4::SMALLINT AS kind, statuses.status_id AS id, statuses.timestamp
                FROM statuses.statuses
                WHERE statuses.user_id = $1
                    OR statuses.user_id IN (
                        SELECT follows.followed_id FROM users.follows
                        WHERE follows.follower_id = $1
                    )
                UNION ALL
                SELECT $5::SMALLINT AS kind, articles.article_id AS id, articles.timestamp
                FROM articles.articles
                WHERE articles.official_account_id IN (
                    SELECT subscriptions.official_account_id FROM articles.subscriptions
                    WHERE subscriptions.user_id = $1
                )
            ) AS timeline
            ORDER BY timeline.timestamp DESC, timeline.kind, timeline.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(viewer.get())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .bind(TIMELINE_STATUS)
        .bind(TIMELINE_ARTICLE)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(TimelineEntry::from).collect())
    }

    pub async fn fetch_user(&self, id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "SELECT users.user_id, users.handle FROM users.users WHERE users.user_id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_group(&self, id: Id<GroupMarker>) -> Result<Option<Group>> {
        let record = query_as::<_, GroupRecord>(
            "
            SELECT
                groups.group_id,
                groups.name,
                (SELECT count(*) FROM groups.members WHERE members.group_id = groups.group_id)
                    AS members
            FROM
                groups.groups
            WHERE
                groups.group_id = $1
            ",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Group::from))
    }

    pub async fn fetch_group_user_title(
        &self,
        group: Id<GroupMarker>,
        user: Id<UserMarker>,
    ) -> Result<Option<String>> {
        let title = query_scalar::<_, Option<String>>(
            "SELECT members.title FROM groups.members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group.get())
        .bind(user.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(title.flatten())
    }

    pub async fn fetch_articles(&self, ids: &[Id<ArticleMarker>]) -> Result<Vec<Article>> {
        let ids = ids.iter().map(|id| id.get()).collect::<Vec<_>>();
        let records = query_as::<_, ArticleRecord>(
            "
            SELECT
                articles.article_id,
                articles.official_account_id,
                articles.title,
                articles.description,
                articles.timestamp
            FROM
                articles.articles
            WHERE
                articles.article_id = ANY($1)
            ",
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Article::from).collect())
    }
}

impl StatusStore for DbClient {
    fn insert_status<'a>(
        &'a self,
        status: &'a NewStatus,
        topics: &'a [TopicName],
    ) -> BoxFuture<'a, StorageResult<Status>> {
        Box::pin(async move { Ok(self.insert_status(status, topics).await?) })
    }

    fn fetch_status(&self, id: Id<StatusMarker>) -> BoxFuture<'_, StorageResult<Option<Status>>> {
        Box::pin(async move { Ok(self.fetch_status(id).await?) })
    }

    fn fetch_statuses<'a>(
        &'a self,
        ids: &'a [Id<StatusMarker>],
    ) -> BoxFuture<'a, StorageResult<Vec<Status>>> {
        Box::pin(async move { Ok(self.fetch_statuses(ids).await?) })
    }

    fn list_statuses(
        &self,
        filter: StatusFilter,
        order: StatusOrder,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<Status>>> {
        Box::pin(async move { Ok(self.list_statuses(filter, order, page).await?) })
    }

    fn delete_status(&self, id: Id<StatusMarker>) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.delete_status(id).await?) })
    }

    fn add_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.add_status_like(status, user).await?) })
    }

    fn remove_status_like(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.remove_status_like(status, user).await?) })
    }

    fn is_status_liked_by(
        &self,
        status: Id<StatusMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.is_status_liked_by(status, user).await?) })
    }

    fn insert_reply<'a>(
        &'a self,
        status: Id<StatusMarker>,
        author: Id<UserMarker>,
        text: &'a StatusText,
    ) -> BoxFuture<'a, StorageResult<StatusReply>> {
        Box::pin(async move { Ok(self.insert_reply(status, author, text).await?) })
    }

    fn fetch_reply(
        &self,
        id: Id<ReplyMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<StatusReply>>> {
        Box::pin(async move { Ok(self.fetch_reply(id).await?) })
    }

    fn list_replies(
        &self,
        status: Id<StatusMarker>,
        newest_first: bool,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<StatusReply>>> {
        Box::pin(async move { Ok(self.list_replies(status, newest_first, page).await?) })
    }

    fn delete_reply(&self, id: Id<ReplyMarker>) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.delete_reply(id).await?) })
    }

    fn add_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.add_reply_like(reply, user).await?) })
    }

    fn remove_reply_like(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.remove_reply_like(reply, user).await?) })
    }

    fn is_reply_liked_by(
        &self,
        reply: Id<ReplyMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<bool>> {
        Box::pin(async move { Ok(self.is_reply_liked_by(reply, user).await?) })
    }

    fn find_topic<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StorageResult<Option<Topic>>> {
        Box::pin(async move { Ok(self.find_topic(name).await?) })
    }

    fn fetch_topic_summary(
        &self,
        id: Id<TopicMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<TopicSummary>>> {
        Box::pin(async move { Ok(self.fetch_topic_summary(id).await?) })
    }

    fn topic_status_ids(
        &self,
        topic: Id<TopicMarker>,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<Id<StatusMarker>>>> {
        Box::pin(async move { Ok(self.topic_status_ids(topic, page).await?) })
    }

    fn timeline_page(
        &self,
        viewer: Id<UserMarker>,
        page: Page,
    ) -> BoxFuture<'_, StorageResult<Vec<TimelineEntry>>> {
        Box::pin(async move { Ok(self.timeline_page(viewer, page).await?) })
    }
}

impl Directory for DbClient {
    fn fetch_user(&self, id: Id<UserMarker>) -> BoxFuture<'_, StorageResult<Option<User>>> {
        Box::pin(async move { Ok(self.fetch_user(id).await?) })
    }

    fn fetch_group(&self, id: Id<GroupMarker>) -> BoxFuture<'_, StorageResult<Option<Group>>> {
        Box::pin(async move { Ok(self.fetch_group(id).await?) })
    }

    fn fetch_group_user_title(
        &self,
        group: Id<GroupMarker>,
        user: Id<UserMarker>,
    ) -> BoxFuture<'_, StorageResult<Option<String>>> {
        Box::pin(async move { Ok(self.fetch_group_user_title(group, user).await?) })
    }

    fn fetch_articles<'a>(
        &'a self,
        ids: &'a [Id<ArticleMarker>],
    ) -> BoxFuture<'a, StorageResult<Vec<Article>>> {
        Box::pin(async move { Ok(self.fetch_articles(ids).await?) })
    }
}
