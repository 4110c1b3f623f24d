use crate::ai::Summarizer;
use crate::ledger::aggregate::aggregate;
use crate::ledger::budget::DAY_MINUTES;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::model::TimedActivity;
use serde::Serialize;
use tracing::error;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that analyzes daily activities and provides encouraging feedback and suggestions.";

/// Everything sent to the summarizer for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodPrompt {
    pub system: &'static str,
    pub user: String,
    pub total_minutes: u64,
    pub remaining_minutes: u64,
    pub day_complete: bool,
}

/// Builds the prompt from records in the order given. Pure: same input, same text.
pub fn synthesize<T: TimedActivity>(records: &[T]) -> LedgerResult<MoodPrompt> {
    if records.is_empty() {
        return Err(LedgerError::validation("no activities provided"));
    }

    let rollup = aggregate(records);
    let day_complete = rollup.total_minutes >= u64::from(DAY_MINUTES);
    let list = records
        .iter()
        .map(|record| {
            format!(
                "{} ({} mins, {})",
                record.name(),
                record.duration_minutes(),
                record.category()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let user = if day_complete {
        format!(
            "My completed day activities: {list}.\nGive a short friendly mood summary analyzing how well I spent my day + 3 helpful suggestions for tomorrow.\nMake it positive and encouraging."
        )
    } else {
        format!(
            "My activities so far today ({} minutes logged, {} minutes remaining): {list}.\nGive a short friendly analysis of how well I'm doing so far + 3 helpful suggestions for managing the rest of my day.\nMake it positive and encouraging.",
            rollup.total_minutes, rollup.remaining_minutes
        )
    };

    Ok(MoodPrompt {
        system: SYSTEM_INSTRUCTION,
        user,
        total_minutes: rollup.total_minutes,
        remaining_minutes: rollup.remaining_minutes,
        day_complete,
    })
}

/// Sends the prompt once and returns the summarizer's text untouched.
pub fn analyze(summarizer: &dyn Summarizer, prompt: &MoodPrompt) -> LedgerResult<String> {
    summarizer.summarize(prompt.system, &prompt.user).map_err(|err| {
        error!(error = %format!("{err:#}"), "mood summarization failed");
        LedgerError::Summarizer(format!("{err:#}"))
    })
}
