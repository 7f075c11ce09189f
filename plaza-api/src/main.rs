use plaza_common::util::PositiveDuration;
use plaza_db::{
    client::{DbClient, DbError},
    kv::RedisStore,
};
use plaza_feed::{FeedConfig, FeedService, ports::KvError};
use serde::Deserialize;
use server::ServerState;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("{0} must be positive")]
    NonPositiveTtl(&'static str),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error connecting to redis: {0}")]
    Redis(#[from] KvError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn default_status_json_ttl_seconds() -> u64 {
    300
}

fn default_cache_ttl_seconds() -> u64 {
    600
}

fn default_database_max_connections() -> u32 {
    10
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    redis_url: String,
    /// Prefix for stored picture URLs, e.g. `https://img.example.com/`.
    #[serde(default)]
    image_server: String,
    #[serde(default = "default_status_json_ttl_seconds")]
    status_json_ttl_seconds: u64,
    #[serde(default = "default_cache_ttl_seconds")]
    topic_id_ttl_seconds: u64,
    #[serde(default = "default_cache_ttl_seconds")]
    user_json_ttl_seconds: u64,
    #[serde(default = "default_database_max_connections")]
    database_max_connections: u32,
}

impl Env {
    fn feed_config(&self) -> Result<FeedConfig, InitError> {
        let ttl = |seconds: u64, name: &'static str| {
            PositiveDuration::from_seconds(seconds).ok_or(InitError::NonPositiveTtl(name))
        };

        Ok(FeedConfig {
            image_server: self.image_server.clone(),
            status_json_ttl: ttl(self.status_json_ttl_seconds, "STATUS_JSON_TTL_SECONDS")?,
            user_json_ttl: ttl(self.user_json_ttl_seconds, "USER_JSON_TTL_SECONDS")?,
            topic_id_ttl: ttl(self.topic_id_ttl_seconds, "TOPIC_ID_TTL_SECONDS")?,
        })
    }
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "plaza_api=debug,\
                plaza_feed=debug,\
                plaza_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();

    let cancel = token.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Could not listen for ctrl-c");
        }
        info!("Shutting down");
        cancel.cancel();
    });

    token
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    let feed_config = env.feed_config()?;

    let db_client =
        Arc::new(DbClient::connect(&env.database_url, env.database_max_connections).await?);
    db_client.migrate().await?;
    let redis = Arc::new(RedisStore::connect(&env.redis_url).await?);

    let feed = Arc::new(FeedService::new(
        db_client.clone(),
        db_client.clone(),
        redis.clone(),
        redis,
        feed_config,
    ));
    let state = ServerState { db_client, feed };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().with_state(state).layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on_ctrl_c().cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
