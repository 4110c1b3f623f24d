pub mod aggregate;
pub mod budget;
pub mod error;
pub mod locks;
pub mod model;
pub mod store;

use crate::ledger::aggregate::{Rollup, aggregate};
use crate::ledger::budget::ensure_within_budget;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::locks::DateLocks;
use crate::ledger::model::{ActivityDraft, ActivityPatch, ActivityRecord, parse_date};
use crate::ledger::store::LedgerStore;
use crate::mood::{self, MoodPrompt};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub id: i64,
    pub removed: bool,
}

/// Entry point for every ledger operation. Owner and date always arrive as arguments.
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    locks: DateLocks,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            locks: DateLocks::default(),
        }
    }

    pub fn list_by_date(&self, owner: &str, date: &str) -> LedgerResult<Vec<ActivityRecord>> {
        let owner = require_owner(owner)?;
        let date = parse_date(date)?;

        Ok(self.store.list_for_date(owner, date)?)
    }

    pub fn add(&self, owner: &str, draft: &ActivityDraft) -> LedgerResult<ActivityRecord> {
        let owner = require_owner(owner)?;
        let activity = draft.validate()?;

        let _guard = self.locks.hold(owner, &[activity.date])?;
        let existing = self.store.total_for_date(owner, activity.date, None)?;
        ensure_within_budget(existing, activity.duration_minutes).inspect_err(|_| {
            warn!(
                owner,
                date = %activity.date,
                existing,
                requested = activity.duration_minutes,
                "activity rejected: daily budget exceeded"
            );
        })?;

        let record = self.store.insert(owner, &activity)?;
        info!(
            owner,
            id = record.id,
            date = %record.date,
            minutes = record.duration_minutes,
            category = %record.category,
            "activity added"
        );

        Ok(record)
    }

    pub fn update(
        &self,
        owner: &str,
        id: i64,
        patch: &ActivityPatch,
    ) -> LedgerResult<ActivityRecord> {
        let owner = require_owner(owner)?;
        let mut current = self.load(owner, id)?;

        if patch.is_empty() {
            return Ok(current);
        }

        loop {
            let candidate = patch.apply_to(&current)?;
            let _guard = self.locks.hold(owner, &[current.date, candidate.date])?;

            let fresh = self.load(owner, id)?;
            if fresh.date != current.date {
                debug!(owner, id, "activity moved while waiting for its date lock; retrying");
                current = fresh;
                continue;
            }

            let candidate = patch.apply_to(&fresh)?;
            let existing = self.store.total_for_date(owner, candidate.date, Some(id))?;
            ensure_within_budget(existing, candidate.duration_minutes).inspect_err(|_| {
                warn!(
                    owner,
                    id,
                    date = %candidate.date,
                    existing,
                    requested = candidate.duration_minutes,
                    "activity update rejected: daily budget exceeded"
                );
            })?;

            let record = self
                .store
                .update(owner, id, &candidate)?
                .ok_or(LedgerError::NotFound(id))?;
            info!(
                owner,
                id,
                from = %fresh.date,
                to = %record.date,
                minutes = record.duration_minutes,
                "activity updated"
            );

            return Ok(record);
        }
    }

    /// Deleting an id that does not exist for `owner` succeeds with `removed: false`.
    pub fn delete(&self, owner: &str, id: i64) -> LedgerResult<DeleteOutcome> {
        let owner = require_owner(owner)?;
        let removed = self.store.delete(owner, id)?;

        if removed {
            info!(owner, id, "activity deleted");
        } else {
            debug!(owner, id, "delete of absent activity ignored");
        }

        Ok(DeleteOutcome { id, removed })
    }

    pub fn aggregate_for_date(&self, owner: &str, date: &str) -> LedgerResult<Rollup> {
        let records = self.list_by_date(owner, date)?;
        Ok(aggregate(&records))
    }

    pub fn mood_prompt_for_date(&self, owner: &str, date: &str) -> LedgerResult<MoodPrompt> {
        let records = self.list_by_date(owner, date)?;
        mood::synthesize(&records)
    }

    pub fn recent_dates(&self, owner: &str, limit: usize) -> LedgerResult<Vec<NaiveDate>> {
        let owner = require_owner(owner)?;
        Ok(self.store.dates_with_activity(owner, limit.clamp(1, 90))?)
    }

    fn load(&self, owner: &str, id: i64) -> LedgerResult<ActivityRecord> {
        self.store
            .get(owner, id)?
            .ok_or(LedgerError::NotFound(id))
    }
}

fn require_owner(owner: &str) -> LedgerResult<&str> {
    let trimmed = owner.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("owner id is required"));
    }

    Ok(trimmed)
}
