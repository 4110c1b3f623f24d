use crate::ledger::error::{LedgerError, LedgerResult};
use serde::Serialize;

/// Minutes in a calendar day. No owner may log more than this against one date.
pub const DAY_MINUTES: u32 = 1440;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetCheck {
    pub allowed: bool,
    pub available: u32,
}

/// `existing_total` must already exclude the record being edited, if any.
pub fn check_budget(existing_total: u64, candidate_minutes: u32) -> BudgetCheck {
    let available = u64::from(DAY_MINUTES).saturating_sub(existing_total) as u32;

    BudgetCheck {
        allowed: existing_total + u64::from(candidate_minutes) <= u64::from(DAY_MINUTES),
        available,
    }
}

pub fn ensure_within_budget(existing_total: u64, candidate_minutes: u32) -> LedgerResult<()> {
    let check = check_budget(existing_total, candidate_minutes);
    if check.allowed {
        Ok(())
    } else {
        Err(LedgerError::BudgetExceeded {
            requested: candidate_minutes,
            available: check.available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BudgetCheck, DAY_MINUTES, check_budget, ensure_within_budget};
    use crate::ledger::error::LedgerError;

    #[test]
    fn exact_fill_is_allowed() {
        assert_eq!(
            check_budget(1000, 440),
            BudgetCheck {
                allowed: true,
                available: 440
            }
        );
    }

    #[test]
    fn one_minute_over_is_rejected() {
        let check = check_budget(480, 961);
        assert!(!check.allowed);
        assert_eq!(check.available, 960);
    }

    #[test]
    fn available_never_underflows() {
        let check = check_budget(u64::from(DAY_MINUTES) + 300, 1);
        assert!(!check.allowed);
        assert_eq!(check.available, 0);
    }

    #[test]
    fn rejection_carries_available_minutes() {
        match ensure_within_budget(480, 1000) {
            Err(LedgerError::BudgetExceeded {
                requested,
                available,
            }) => {
                assert_eq!(requested, 1000);
                assert_eq!(available, 960);
            }
            other => panic!("expected budget rejection, got {other:?}"),
        }
    }

    #[test]
    fn single_record_longer_than_a_day_is_rejected() {
        assert!(!check_budget(0, DAY_MINUTES + 1).allowed);
        assert!(check_budget(0, DAY_MINUTES).allowed);
    }
}
