//! Append-only activity ledger. Source of truth for every progress figure.
//!
//! There is no update or delete: a correction is a new record.

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::persistence::{read_json_array, try_read_json_array, write_json_array, StoreHandle};
use crate::shared::{ActivityRecord, NewActivity, ACTIVITY_LOG_KEY};
use std::sync::Arc;

pub struct ActivityLog {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
}

impl ActivityLog {
    pub fn new(store: StoreHandle, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Validates and appends. Missing id and timestamp are filled in.
    ///
    /// A backend read failure aborts the append; the stored log is left untouched.
    pub fn append(&self, activity: NewActivity) -> EngineResult<ActivityRecord> {
        let record = activity.into_record(self.clock.now_utc())?;
        let mut records = try_read_json_array(self.store.as_ref(), ACTIVITY_LOG_KEY, is_valid)
            .inspect_err(|e| {
                tracing::error!(
                    target: "forest::activity",
                    id = %record.id,
                    error = %e,
                    "activity log unreadable; append aborted"
                );
            })?;
        records.push(record.clone());
        write_json_array(self.store.as_ref(), ACTIVITY_LOG_KEY, &records)?;
        tracing::info!(
            target: "forest::activity",
            id = %record.id,
            kind = %record.kind,
            duration_minutes = record.duration_minutes,
            stress_level = record.stress_level,
            total = records.len(),
            "activity appended"
        );
        Ok(record)
    }

    /// Every valid record, oldest first.
    pub fn all(&self) -> Vec<ActivityRecord> {
        let mut records = self.stored();
        records.sort_by_key(|r| r.occurred_at);
        records
    }

    /// The last `n` records by timestamp, oldest first.
    pub fn recent_n(&self, n: usize) -> Vec<ActivityRecord> {
        let mut records = self.all();
        let skip = records.len().saturating_sub(n);
        records.drain(..skip);
        records
    }

    pub fn len(&self) -> usize {
        self.stored().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stored(&self) -> Vec<ActivityRecord> {
        read_json_array(self.store.as_ref(), ACTIVITY_LOG_KEY, is_valid)
    }
}

fn is_valid(record: &ActivityRecord) -> bool {
    record.validate().is_ok()
}
