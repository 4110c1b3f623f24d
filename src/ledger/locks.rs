use crate::ledger::error::{LedgerError, LedgerResult};
use anyhow::anyhow;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

type DayKey = (String, NaiveDate);

/// Serializes read-check-write sequences per `(owner, date)`.
///
/// A caller claims every key it needs in one step, so two operations touching overlapping
/// dates can never each hold half of what the other wants. Keys held by nobody are not
/// stored at all.
#[derive(Debug, Default)]
pub struct DateLocks {
    held: Mutex<HashSet<DayKey>>,
    released: Condvar,
}

#[derive(Debug)]
pub struct DateGuard<'a> {
    locks: &'a DateLocks,
    keys: Vec<DayKey>,
}

impl DateLocks {
    pub fn hold(&self, owner: &str, dates: &[NaiveDate]) -> LedgerResult<DateGuard<'_>> {
        let mut keys = dates
            .iter()
            .map(|date| (owner.to_string(), *date))
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();

        let mut held = self.held.lock().map_err(|_| poisoned())?;
        while keys.iter().any(|key| held.contains(key)) {
            held = self.released.wait(held).map_err(|_| poisoned())?;
        }
        held.extend(keys.iter().cloned());

        Ok(DateGuard { locks: self, keys })
    }

    #[cfg(test)]
    fn held_count(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for DateGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.keys.iter().for_each(|key| {
            held.remove(key);
        });
        drop(held);
        self.locks.released.notify_all();
    }
}

fn poisoned() -> LedgerError {
    LedgerError::Storage(anyhow!("date lock registry poisoned"))
}

#[cfg(test)]
mod tests {
    use super::DateLocks;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).expect("date")
    }

    #[test]
    fn released_keys_are_forgotten() {
        let locks = DateLocks::default();
        {
            let _guard = locks.hold("alice", &[day(1), day(1), day(2)]).expect("hold");
            assert_eq!(locks.held_count(), 2);
        }
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn different_keys_do_not_contend() {
        let locks = DateLocks::default();
        let _alice = locks.hold("alice", &[day(1)]).expect("hold");
        let _bob = locks.hold("bob", &[day(1)]).expect("hold");
        let _other_day = locks.hold("alice", &[day(2)]).expect("hold");

        assert_eq!(locks.held_count(), 3);
    }

    #[test]
    fn same_key_waits_for_release() {
        let locks = Arc::new(DateLocks::default());
        let entered = Arc::new(AtomicBool::new(false));

        let guard = locks.hold("alice", &[day(1)]).expect("hold");

        let waiter = {
            let locks = Arc::clone(&locks);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _guard = locks.hold("alice", &[day(1)]).expect("hold");
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));

        drop(guard);
        waiter.join().expect("waiter thread");
        assert!(entered.load(Ordering::SeqCst));
    }
}
