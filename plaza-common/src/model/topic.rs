//! Topics are tags written as `#name#` inside status text.

use crate::model::Id;
use regex::Regex;
use serde::Serialize;
use std::{collections::HashSet, sync::LazyLock};
use thiserror::Error;

/// Non-greedy span between two `#`, newlines included.
static TOPIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#([\s\S]+?)#").expect("topic pattern is valid")
});

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TopicMarker;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("Topic name was empty")]
pub struct InvalidTopicNameError;

/// Exact, case-sensitive topic name.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct TopicName(String);

impl TopicName {
    pub fn new(name: String) -> Result<Self, InvalidTopicNameError> {
        if name.is_empty() {
            Err(InvalidTopicNameError)
        } else {
            Ok(Self(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Topic {
    pub id: Id<TopicMarker>,
    pub name: TopicName,
}

/// A topic together with how many statuses reference it.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct TopicSummary {
    pub topic: Topic,
    pub statuses: u64,
}

/// Distinct topic names mentioned in `text`, in order of first mention.
#[must_use]
pub fn extract_topics(text: &str) -> Vec<TopicName> {
    let mut seen = HashSet::new();

    TOPIC_PATTERN
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_str())
        .filter(|name| seen.insert(*name))
        .filter_map(|name| TopicName::new(name.to_owned()).ok())
        .collect()
}
