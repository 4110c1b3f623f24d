use crate::ledger::model::{ActivityRecord, NewActivity};
use anyhow::Result;
use chrono::NaiveDate;

/// Durable per-owner activity storage. Every call is scoped by `owner`; a record owned by
/// someone else is indistinguishable from a missing one.
pub trait LedgerStore: Send + Sync {
    /// Records for `(owner, date)` in creation order.
    fn list_for_date(&self, owner: &str, date: NaiveDate) -> Result<Vec<ActivityRecord>>;

    fn total_for_date(&self, owner: &str, date: NaiveDate, excluding: Option<i64>) -> Result<u64>;

    fn get(&self, owner: &str, id: i64) -> Result<Option<ActivityRecord>>;

    /// Assigns `id`, `created_at` and `updated_at`.
    fn insert(&self, owner: &str, activity: &NewActivity) -> Result<ActivityRecord>;

    /// Returns `None` when no such record exists for `owner`.
    fn update(&self, owner: &str, id: i64, activity: &NewActivity)
    -> Result<Option<ActivityRecord>>;

    /// Returns whether a record was removed.
    fn delete(&self, owner: &str, id: i64) -> Result<bool>;

    /// Most recent dates with at least one record, newest first.
    fn dates_with_activity(&self, owner: &str, limit: usize) -> Result<Vec<NaiveDate>>;
}
