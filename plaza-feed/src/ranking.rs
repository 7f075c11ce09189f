//! Best-effort notifications to the ranking collaborator, and request-scoped
//! memoization of the scores it computes.

use crate::ports::RankingNotifier;
use plaza_common::model::{
    Id,
    status::{Status, StatusMarker},
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

/// Wraps the notifier so that its failures never reach the caller of a
/// mutation that already committed.
pub(crate) struct Ranking {
    notifier: Arc<dyn RankingNotifier>,
}

impl Ranking {
    pub(crate) fn new(notifier: Arc<dyn RankingNotifier>) -> Self {
        Self { notifier }
    }

    pub(crate) async fn push(&self, status: Id<StatusMarker>) {
        match self.notifier.push(status).await {
            Ok(()) => debug!(%status, "Pushed status to ranking"),
            Err(err) => warn!(%status, error = %err, "Ranking push failed"),
        }
    }

    pub(crate) async fn remove(&self, status: Id<StatusMarker>) {
        if let Err(err) = self.notifier.remove(status).await {
            warn!(%status, error = %err, "Ranking removal failed");
        }
    }

    pub(crate) async fn refresh(&self) {
        if let Err(err) = self.notifier.refresh().await {
            warn!(error = %err, "Ranking refresh failed");
        }
    }
}

/// Computes the popularity score of a status. Owned by the ranking side.
pub trait ScoreSource: Send + Sync {
    fn score(&self, status: &Status) -> f64;
}

/// Scores computed at most once per status for the lifetime of the memo,
/// which is a single feed request.
pub(crate) struct ScoreMemo<'a> {
    source: &'a dyn ScoreSource,
    scores: HashMap<Id<StatusMarker>, f64>,
}

impl<'a> ScoreMemo<'a> {
    pub(crate) fn new(source: &'a dyn ScoreSource) -> Self {
        Self {
            source,
            scores: HashMap::new(),
        }
    }

    pub(crate) fn score(&mut self, status: &Status) -> f64 {
        let source = self.source;
        *self
            .scores
            .entry(status.id)
            .or_insert_with(|| source.score(status))
    }
}
