use thiserror::Error;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid activity: {0}")]
    Validation(String),
    #[error("daily budget exceeded: {requested} minutes requested, {available} minutes available")]
    BudgetExceeded { requested: u32, available: u32 },
    #[error("activity not found: {0}")]
    NotFound(i64),
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
    #[error("could not analyze activities: {0}")]
    Summarizer(String),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(value: anyhow::Error) -> Self {
        Self::Storage(value)
    }
}
