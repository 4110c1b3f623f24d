use crate::ledger::error::{LedgerError, LedgerResult};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Study,
    Health,
    Sleep,
    Leisure,
    Others,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Work,
        Category::Study,
        Category::Health,
        Category::Sleep,
        Category::Leisure,
        Category::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Study => "Study",
            Self::Health => "Health",
            Self::Sleep => "Sleep",
            Self::Leisure => "Leisure",
            Self::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                LedgerError::validation(format!(
                    "unknown category: {trimmed:?}. Expected one of Work, Study, Health, Sleep, Leisure, Others"
                ))
            })
    }
}

/// A stored activity. `id`, `created_at` and `updated_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub owner_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub category: Category,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated user-settable fields of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub name: String,
    pub category: Category,
    pub duration_minutes: u32,
    pub date: NaiveDate,
}

/// An undated activity, as attached to a mood request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub name: String,
    pub category: Category,
    pub duration_minutes: u32,
}

/// Raw create payload as it arrives from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityDraft {
    pub name: Option<String>,
    pub category: Option<String>,
    pub duration: Option<Value>,
    pub date: Option<String>,
}

/// Partial update payload. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub duration: Option<Value>,
    pub date: Option<String>,
}

/// Anything that contributes logged minutes under a category.
pub trait TimedActivity {
    fn name(&self) -> &str;
    fn category(&self) -> Category;
    fn duration_minutes(&self) -> u32;
}

impl TimedActivity for ActivityRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

impl TimedActivity for ActivityEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> Category {
        self.category
    }

    fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

impl ActivityDraft {
    pub fn new(name: &str, category: &str, duration: u32, date: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            category: Some(category.to_string()),
            duration: Some(Value::from(duration)),
            date: Some(date.to_string()),
        }
    }

    pub fn validate(&self) -> LedgerResult<NewActivity> {
        let entry = self.validate_entry()?;
        let date = parse_date(
            self.date
                .as_deref()
                .ok_or_else(|| LedgerError::validation("date is required"))?,
        )?;

        Ok(NewActivity {
            name: entry.name,
            category: entry.category,
            duration_minutes: entry.duration_minutes,
            date,
        })
    }

    /// Validates everything except the date.
    pub fn validate_entry(&self) -> LedgerResult<ActivityEntry> {
        let name = parse_name(
            self.name
                .as_deref()
                .ok_or_else(|| LedgerError::validation("name is required"))?,
        )?;
        let category = self
            .category
            .as_deref()
            .ok_or_else(|| LedgerError::validation("category is required"))?
            .parse::<Category>()?;
        let duration_minutes = parse_duration(
            self.duration
                .as_ref()
                .ok_or_else(|| LedgerError::validation("duration is required"))?,
        )?;

        Ok(ActivityEntry {
            name,
            category,
            duration_minutes,
        })
    }
}

impl ActivityPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.duration.is_none()
            && self.date.is_none()
    }

    /// Merges the supplied fields over `existing` and validates the full result.
    pub fn apply_to(&self, existing: &ActivityRecord) -> LedgerResult<NewActivity> {
        ActivityDraft {
            name: Some(self.name.clone().unwrap_or_else(|| existing.name.clone())),
            category: Some(
                self.category
                    .clone()
                    .unwrap_or_else(|| existing.category.to_string()),
            ),
            duration: Some(
                self.duration
                    .clone()
                    .unwrap_or_else(|| Value::from(existing.duration_minutes)),
            ),
            date: Some(
                self.date
                    .clone()
                    .unwrap_or_else(|| existing.date.format(DATE_FORMAT).to_string()),
            ),
        }
        .validate()
    }
}

pub fn parse_date(input: &str) -> LedgerResult<NaiveDate> {
    let trimmed = input.trim();
    if !DATE_SHAPE.is_match(trimmed) {
        return Err(LedgerError::validation(format!(
            "invalid date format: {trimmed:?}. Example: 2024-01-01"
        )));
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|_| LedgerError::validation(format!("not a calendar date: {trimmed}")))
}

fn parse_name(raw: &str) -> LedgerResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::validation("name must not be empty"));
    }

    Ok(trimmed.to_string())
}

fn parse_duration(value: &Value) -> LedgerResult<u32> {
    let Value::Number(number) = value else {
        return Err(LedgerError::validation(
            "duration must be a whole number of minutes",
        ));
    };

    let minutes = match (number.as_u64(), number.as_i64(), number.as_f64()) {
        (Some(whole), _, _) => whole,
        (None, Some(_negative), _) => 0,
        (None, None, Some(float)) if float.fract() == 0.0 && float >= 0.0 => float as u64,
        (None, None, Some(float)) if float <= 0.0 => 0,
        _ => {
            return Err(LedgerError::validation(format!(
                "duration must be a whole number of minutes, got {number}"
            )));
        }
    };

    if minutes == 0 {
        return Err(LedgerError::validation("duration must be greater than 0"));
    }

    u32::try_from(minutes)
        .map_err(|_| LedgerError::validation(format!("duration is too large: {minutes}")))
}

#[cfg(test)]
mod tests {
    use super::{ActivityDraft, ActivityPatch, ActivityRecord, Category, parse_date};
    use crate::ledger::error::LedgerError;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;

    fn stored(name: &str, category: Category, minutes: u32, date: &str) -> ActivityRecord {
        ActivityRecord {
            id: 7,
            owner_id: "alice".to_string(),
            date: parse_date(date).expect("date"),
            name: name.to_string(),
            category,
            duration_minutes: minutes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn assert_validation<T: std::fmt::Debug>(result: Result<T, LedgerError>, needle: &str) {
        match result {
            Err(LedgerError::Validation(message)) => {
                assert!(message.contains(needle), "{message} should mention {needle}")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_draft_is_normalized() {
        let activity = ActivityDraft::new("  Morning run ", "health", 45, "2024-01-01")
            .validate()
            .expect("valid draft");

        assert_eq!(activity.name, "Morning run");
        assert_eq!(activity.category, Category::Health);
        assert_eq!(activity.duration_minutes, 45);
        assert_eq!(
            activity.date,
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
        );
    }

    #[test]
    fn rejects_empty_name() {
        assert_validation(
            ActivityDraft::new("   ", "Work", 30, "2024-01-01").validate(),
            "name",
        );
    }

    #[test]
    fn rejects_category_outside_the_set() {
        assert_validation(
            ActivityDraft::new("Gaming", "Fun", 30, "2024-01-01").validate(),
            "unknown category",
        );
    }

    #[test]
    fn rejects_non_positive_and_fractional_durations() {
        for duration in [json!(0), json!(-15), json!(12.5), json!("30"), json!(null)] {
            let draft = ActivityDraft {
                duration: Some(duration.clone()),
                ..ActivityDraft::new("Read", "Study", 1, "2024-01-01")
            };
            assert_validation(draft.validate(), "duration");
        }
    }

    #[test]
    fn accepts_integral_float_duration() {
        let draft = ActivityDraft {
            duration: Some(json!(30.0)),
            ..ActivityDraft::new("Read", "Study", 1, "2024-01-01")
        };

        assert_eq!(draft.validate().expect("valid").duration_minutes, 30);
    }

    #[test]
    fn rejects_malformed_and_impossible_dates() {
        assert_validation(parse_date("01-01-2024"), "invalid date format");
        assert_validation(parse_date("2024-1-1"), "invalid date format");
        assert_validation(parse_date("2023-02-29"), "not a calendar date");
        assert!(parse_date("2024-02-29").is_ok());
    }

    #[test]
    fn entry_validation_ignores_the_date() {
        let draft = ActivityDraft {
            date: None,
            ..ActivityDraft::new("Run", "Health", 30, "2024-01-01")
        };

        assert_eq!(draft.validate_entry().expect("entry").duration_minutes, 30);
        assert_validation(draft.validate(), "date is required");
    }

    #[test]
    fn missing_fields_are_reported() {
        assert_validation(ActivityDraft::default().validate(), "name is required");
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let existing = stored("Deep work", Category::Work, 120, "2024-03-10");
        let patch = ActivityPatch {
            category: Some("Study".to_string()),
            ..ActivityPatch::default()
        };

        let merged = patch.apply_to(&existing).expect("merged");

        assert_eq!(merged.name, "Deep work");
        assert_eq!(merged.category, Category::Study);
        assert_eq!(merged.duration_minutes, 120);
        assert_eq!(merged.date, existing.date);
    }

    #[test]
    fn patch_revalidates_supplied_fields() {
        let existing = stored("Deep work", Category::Work, 120, "2024-03-10");
        let patch = ActivityPatch {
            date: Some("2024-13-01".to_string()),
            ..ActivityPatch::default()
        };

        assert_validation(patch.apply_to(&existing), "not a calendar date");
        assert!(ActivityPatch::default().is_empty());
    }

    #[test]
    fn record_serializes_with_api_field_names() {
        let record = stored("Nap", Category::Sleep, 20, "2024-03-10");
        let value = serde_json::to_value(&record).expect("json");

        assert_eq!(value["duration"], 20);
        assert_eq!(value["category"], "Sleep");
        assert_eq!(value["date"], "2024-03-10");
    }
}
