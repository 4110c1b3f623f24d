pub mod queries;

use crate::ledger::model::{ActivityRecord, Category, NewActivity};
use crate::ledger::store::LedgerStore;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed ledger store.
pub struct Database {
    conn: Mutex<Connection>,
}

struct ActivityRow {
    id: i64,
    owner_id: String,
    date: NaiveDate,
    name: String,
    category: String,
    duration: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ActivityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            date: row.get(2)?,
            name: row.get(3)?,
            category: row.get(4)?,
            duration: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<ActivityRecord> {
        let category = self
            .category
            .parse::<Category>()
            .with_context(|| format!("Stored activity {} has an unknown category", self.id))?;
        let duration_minutes = u32::try_from(self.duration)
            .with_context(|| format!("Stored activity {} has an invalid duration", self.id))?;

        Ok(ActivityRecord {
            id: self.id,
            owner_id: self.owner_id,
            date: self.date,
            name: self.name,
            category,
            duration_minutes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite DB")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let database = Self {
            conn: Mutex::new(conn),
        };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                conn.execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection poisoned"))
    }

    fn fetch(conn: &Connection, owner: &str, id: i64) -> Result<Option<ActivityRecord>> {
        let sql = format!(
            "SELECT {} FROM activities WHERE id = ?1 AND owner_id = ?2",
            queries::SELECT_COLUMNS
        );

        conn.query_row(&sql, params![id, owner], ActivityRow::from_row)
            .optional()
            .context("Failed to query activity")?
            .map(ActivityRow::into_record)
            .transpose()
    }
}

impl LedgerStore for Database {
    fn list_for_date(&self, owner: &str, date: NaiveDate) -> Result<Vec<ActivityRecord>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "SELECT {}
             FROM activities
             WHERE owner_id = ?1 AND date = ?2
             ORDER BY created_at ASC, id ASC",
            queries::SELECT_COLUMNS
        );
        let mut statement = conn.prepare(&sql)?;

        let rows = statement
            .query_map(params![owner, date], ActivityRow::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query activities")?;

        rows.into_iter().map(ActivityRow::into_record).collect()
    }

    fn total_for_date(&self, owner: &str, date: NaiveDate, excluding: Option<i64>) -> Result<u64> {
        let conn = self.lock_conn()?;
        let total: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(duration), 0)
                 FROM activities
                 WHERE owner_id = ?1 AND date = ?2 AND (?3 IS NULL OR id <> ?3)",
                params![owner, date, excluding],
                |row| row.get(0),
            )
            .context("Failed to sum activity minutes")?;

        Ok(total.max(0) as u64)
    }

    fn get(&self, owner: &str, id: i64) -> Result<Option<ActivityRecord>> {
        let conn = self.lock_conn()?;
        Self::fetch(&conn, owner, id)
    }

    fn insert(&self, owner: &str, activity: &NewActivity) -> Result<ActivityRecord> {
        let conn = self.lock_conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO activities (owner_id, name, category, duration, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                owner,
                &activity.name,
                activity.category.as_str(),
                activity.duration_minutes,
                activity.date,
                now
            ],
        )
        .context("Failed to insert activity")?;

        Ok(ActivityRecord {
            id: conn.last_insert_rowid(),
            owner_id: owner.to_string(),
            date: activity.date,
            name: activity.name.clone(),
            category: activity.category,
            duration_minutes: activity.duration_minutes,
            created_at: now,
            updated_at: now,
        })
    }

    fn update(
        &self,
        owner: &str,
        id: i64,
        activity: &NewActivity,
    ) -> Result<Option<ActivityRecord>> {
        let conn = self.lock_conn()?;

        let changed = conn
            .execute(
                "UPDATE activities
                 SET name = ?1, category = ?2, duration = ?3, date = ?4, updated_at = ?5
                 WHERE id = ?6 AND owner_id = ?7",
                params![
                    &activity.name,
                    activity.category.as_str(),
                    activity.duration_minutes,
                    activity.date,
                    Utc::now(),
                    id,
                    owner
                ],
            )
            .context("Failed to update activity")?;

        if changed == 0 {
            return Ok(None);
        }

        Self::fetch(&conn, owner, id)
    }

    fn delete(&self, owner: &str, id: i64) -> Result<bool> {
        let conn = self.lock_conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM activities WHERE id = ?1 AND owner_id = ?2",
                params![id, owner],
            )
            .context("Failed to delete activity")?;

        Ok(deleted > 0)
    }

    fn dates_with_activity(&self, owner: &str, limit: usize) -> Result<Vec<NaiveDate>> {
        let conn = self.lock_conn()?;
        let mut statement = conn.prepare(
            "SELECT DISTINCT date
             FROM activities
             WHERE owner_id = ?1
             ORDER BY date DESC
             LIMIT ?2",
        )?;

        let dates = statement
            .query_map(params![owner, limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<NaiveDate>, _>>()
            .context("Failed to list activity dates")?;

        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::ledger::model::{ActivityDraft, Category, NewActivity};
    use crate::ledger::store::LedgerStore;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn activity(name: &str, category: &str, minutes: u32, date: &str) -> NewActivity {
        ActivityDraft::new(name, category, minutes, date)
            .validate()
            .expect("valid activity")
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn insert_then_list_in_creation_order() {
        let db = Database::open_in_memory().expect("db");
        let first = db
            .insert("alice", &activity("Sleep", "Sleep", 480, "2024-01-01"))
            .expect("insert");
        let second = db
            .insert("alice", &activity("Email", "Work", 30, "2024-01-01"))
            .expect("insert");
        db.insert("alice", &activity("Gym", "Health", 60, "2024-01-02"))
            .expect("insert");

        let listed = db.list_for_date("alice", day("2024-01-01")).expect("list");

        assert_eq!(
            listed.iter().map(|record| record.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert_eq!(listed[0].category, Category::Sleep);
        assert_eq!(listed[1].duration_minutes, 30);
    }

    #[test]
    fn records_are_scoped_by_owner() {
        let db = Database::open_in_memory().expect("db");
        let record = db
            .insert("alice", &activity("Read", "Study", 45, "2024-01-01"))
            .expect("insert");

        assert!(db.get("bob", record.id).expect("get").is_none());
        assert!(
            db.list_for_date("bob", day("2024-01-01"))
                .expect("list")
                .is_empty()
        );
        assert!(!db.delete("bob", record.id).expect("delete"));
        assert!(
            db.update("bob", record.id, &activity("Hijack", "Work", 1, "2024-01-01"))
                .expect("update")
                .is_none()
        );
        assert_eq!(
            db.get("alice", record.id).expect("get").map(|r| r.name),
            Some("Read".to_string())
        );
    }

    #[test]
    fn total_can_exclude_a_record() {
        let db = Database::open_in_memory().expect("db");
        let sleep = db
            .insert("alice", &activity("Sleep", "Sleep", 480, "2024-01-01"))
            .expect("insert");
        db.insert("alice", &activity("Work", "Work", 240, "2024-01-01"))
            .expect("insert");

        assert_eq!(
            db.total_for_date("alice", day("2024-01-01"), None)
                .expect("total"),
            720
        );
        assert_eq!(
            db.total_for_date("alice", day("2024-01-01"), Some(sleep.id))
                .expect("total"),
            240
        );
        assert_eq!(
            db.total_for_date("alice", day("2024-01-05"), None)
                .expect("total"),
            0
        );
    }

    #[test]
    fn update_rewrites_fields_and_touches_updated_at() {
        let db = Database::open_in_memory().expect("db");
        let record = db
            .insert("alice", &activity("Run", "Health", 30, "2024-01-01"))
            .expect("insert");

        let updated = db
            .update("alice", record.id, &activity("Long run", "Health", 90, "2024-01-02"))
            .expect("update")
            .expect("record exists");

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.name, "Long run");
        assert_eq!(updated.date, day("2024-01-02"));
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at >= record.updated_at);
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let db = Database::open_in_memory().expect("db");
        let record = db
            .insert("alice", &activity("Run", "Health", 30, "2024-01-01"))
            .expect("insert");

        assert!(db.delete("alice", record.id).expect("delete"));
        assert!(!db.delete("alice", record.id).expect("delete again"));
    }

    #[test]
    fn lists_recent_dates_newest_first() {
        let db = Database::open_in_memory().expect("db");
        for date in ["2024-01-01", "2024-01-03", "2024-01-02", "2024-01-03"] {
            db.insert("alice", &activity("Walk", "Health", 10, date))
                .expect("insert");
        }

        let dates = db.dates_with_activity("alice", 2).expect("dates");

        assert_eq!(dates, vec![day("2024-01-03"), day("2024-01-02")]);
    }

    #[test]
    fn file_backed_database_persists_across_opens() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("db").join("ledger.db");

        {
            let db = Database::open(&path).expect("open");
            db.insert("alice", &activity("Read", "Study", 45, "2024-01-01"))
                .expect("insert");
        }

        let reopened = Database::open(&path).expect("reopen");
        assert_eq!(
            reopened
                .total_for_date("alice", day("2024-01-01"), None)
                .expect("total"),
            45
        );
    }
}
