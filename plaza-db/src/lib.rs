//! Storage adapters for the feed core: Postgres through sqlx, and Redis for
//! the key-value cache and ranking events.

pub mod client;
pub mod kv;
mod record;
