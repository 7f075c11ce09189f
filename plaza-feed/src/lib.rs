//! The feed and engagement core: statuses, topics, likes, replies and the
//! feed strategies, written against the ports in [`ports`].

pub mod cache;
pub mod dispatch;
pub mod engagement;
pub mod error;
pub mod ports;
pub mod ranking;
pub mod service;
pub mod statuses;
pub mod topics;

#[cfg(test)]
mod testing;

pub use error::{FeedError, FeedResult, Resource};
pub use service::{FeedConfig, FeedService};
