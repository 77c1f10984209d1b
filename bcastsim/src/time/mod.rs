//! Simulated time.
//!
//! Time in a simulation starts at [`SimTime::ZERO`] and only moves forward when the
//! runtime pops the next event from its [`Timer`] queue.

use serde::{Deserialize, Serialize};
#[doc(no_inline)]
pub use std::time::Duration;
use std::{fmt, ops::Add};

mod timer;

pub(crate) use self::timer::Timer;
pub use self::timer::TimerId;

/// A point in simulated time, measured from the start of the run.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(Duration);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(Duration::ZERO);

    /// Creates a time point `secs` seconds after the start of the run.
    pub const fn from_secs(secs: u64) -> Self {
        SimTime(Duration::from_secs(secs))
    }

    /// Returns the amount of time elapsed since the start of the run.
    pub const fn elapsed(&self) -> Duration {
        self.0
    }

    /// Returns the time point as fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Returns the amount of time from `earlier` to `self`,
    /// or `None` if `earlier` is later than `self`.
    pub fn checked_duration_since(&self, earlier: SimTime) -> Option<Duration> {
        self.0.checked_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s", self.0.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let t0 = SimTime::from_secs(1);
        let t1 = t0 + Duration::from_millis(500);
        assert!(t1 > t0);
        assert_eq!(
            t1.checked_duration_since(t0),
            Some(Duration::from_millis(500))
        );
        assert_eq!(t0.checked_duration_since(t1), None);
        assert_eq!(t1.to_string(), "1.500000000s");
    }
}
