//! Per-thread slot holding the failure raised by the most recent verified invocation.

use std::cell::RefCell;

use interpose_engine::Failure;

use crate::verify::Outcome;

thread_local! {
    static LAST_FAILURE: RefCell<Option<Failure>> = const { RefCell::new(None) };
}

/// Failure raised by the most recent verified invocation on this thread
///
/// `None` when that invocation returned normally, or when nothing has been
/// verified on this thread since the last clear.
pub fn last_raised_failure() -> Option<Failure> {
    LAST_FAILURE.with(|slot| slot.borrow().clone())
}

/// Empty this thread's slot
pub fn clear_last_raised_failure() {
    LAST_FAILURE.with(|slot| slot.borrow_mut().take());
}

pub(crate) fn record(outcome: &Outcome) {
    let failure = outcome.failure().cloned();
    LAST_FAILURE.with(|slot| *slot.borrow_mut() = failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_engine::Value;

    #[test]
    fn test_record_and_clear() {
        clear_last_raised_failure();
        assert!(last_raised_failure().is_none());

        record(&Outcome::Raised(Failure::illegal_state("boom")));
        assert_eq!(
            last_raised_failure().and_then(|f| f.message().map(str::to_string)),
            Some("boom".to_string())
        );

        record(&Outcome::Returned(Value::I32(1)));
        assert!(last_raised_failure().is_none());
    }

    #[test]
    fn test_slot_is_per_thread() {
        record(&Outcome::Raised(Failure::illegal_state("here")));
        let other = std::thread::spawn(last_raised_failure).join().unwrap();
        assert!(other.is_none());
        assert!(last_raised_failure().is_some());
        clear_last_raised_failure();
    }
}
