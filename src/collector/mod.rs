use chrono::NaiveDateTime;
use tracing::debug;

use crate::database::ActivityStore;
use crate::error::TrackerResult;
use crate::types::{ActivityRecord, Environment};

/// Result of scanning one environment's activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    NoChanges,
    Changes(Vec<ActivityRecord>),
}

/// Pulls recent activity for a fixed set of users out of one environment
pub struct ChangeCollector<'a> {
    env: &'a Environment,
    since: NaiveDateTime,
}

impl<'a> ChangeCollector<'a> {
    pub fn new(env: &'a Environment, since: NaiveDateTime) -> Self {
        Self { env, since }
    }

    /// Collect activity by `user_ids`, oldest first. No query is issued for an empty id list.
    pub async fn collect(
        &self,
        store: &mut dyn ActivityStore,
        user_ids: &[u64],
    ) -> TrackerResult<Extraction> {
        if user_ids.is_empty() {
            return Ok(Extraction::NoChanges);
        }
        let table = self.env.stream_table();
        let records = store.activity_since(&table, user_ids, self.since).await?;
        debug!(label = %self.env.label, rows = records.len(), "Fetched activity rows");
        if records.is_empty() {
            Ok(Extraction::NoChanges)
        } else {
            Ok(Extraction::Changes(records))
        }
    }
}
