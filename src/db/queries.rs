pub const CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  owner_id    TEXT NOT NULL,
  name        TEXT NOT NULL,
  category    TEXT NOT NULL DEFAULT 'Others',
  duration    INTEGER NOT NULL CHECK (duration > 0),
  date        TEXT NOT NULL,
  created_at  TEXT NOT NULL,
  updated_at  TEXT NOT NULL
);
"#;

pub const INDEX_ACTIVITIES_OWNER_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_activities_owner_date ON activities(owner_id, date);";

pub const SELECT_COLUMNS: &str =
    "id, owner_id, date, name, category, duration, created_at, updated_at";

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_ACTIVITIES, INDEX_ACTIVITIES_OWNER_DATE]
}
