//! Thread local runtime context
use crate::time::SimTime;

use std::cell::Cell;

thread_local! {
    static NOW: Cell<Option<SimTime>> = const { Cell::new(None) };
}

/// Returns the simulated time of the run executing on this thread, if any.
pub(crate) fn try_now() -> Option<SimTime> {
    // note: TLS may be deallocated
    NOW.try_with(|now| now.get()).ok().flatten()
}

pub(crate) fn set_now(time: SimTime) {
    NOW.with(|now| {
        debug_assert!(now.get().is_some(), "{}", MSG);
        now.set(Some(time));
    });
}

/// Mark a run as executing on this thread until the guard is dropped.
pub(crate) fn enter(time: SimTime) -> EnterGuard {
    NOW.with(|now| EnterGuard(now.replace(Some(time))))
}

pub(crate) struct EnterGuard(Option<SimTime>);

impl Drop for EnterGuard {
    fn drop(&mut self) {
        let old = self.0.take();
        let _ = NOW.try_with(|now| now.set(old));
    }
}

const MSG: &str =
    "there is no simulation running, must be called from the context of a bcastsim runtime";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_enter() {
        assert_eq!(try_now(), None);
        {
            let _outer = enter(SimTime::ZERO);
            set_now(SimTime::from_secs(3));
            {
                let _inner = enter(SimTime::ZERO);
                assert_eq!(try_now(), Some(SimTime::ZERO));
            }
            assert_eq!(try_now(), Some(SimTime::from_secs(3)));
        }
        assert_eq!(try_now(), None);
    }
}
