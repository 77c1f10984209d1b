//! Utilities for random number generation.
//!
//! Every random decision in a run (payload sizes, bit errors) is drawn from a single
//! [`GlobalRng`] seeded by the runtime, so a seed fully determines a run.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use spin::Mutex;
use std::{ops::RangeInclusive, sync::Arc};

/// Global deterministic random number generator.
#[derive(Clone)]
pub struct GlobalRng {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    seed: u64,
    rng: SmallRng,
    log: Option<Vec<u8>>,
    check: Option<(Vec<u8>, usize)>,
}

impl GlobalRng {
    /// Create a new RNG using the given seed.
    pub fn new_with_seed(seed: u64) -> Self {
        let inner = Inner {
            seed,
            rng: SeedableRng::seed_from_u64(seed),
            log: None,
            check: None,
        };
        GlobalRng {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Call function on the inner RNG.
    pub(crate) fn with<T>(&self, f: impl FnOnce(&mut SmallRng) -> T) -> T {
        let mut lock = self.inner.lock();
        let ret = f(&mut lock.rng);
        // log or check
        if lock.log.is_some() || lock.check.is_some() {
            let t = crate::runtime::context::try_now();
            fn hash_u128(x: u128) -> u8 {
                x.to_ne_bytes().iter().fold(0, |a, b| a ^ b)
            }
            let v = lock.rng.clone().gen::<u8>()
                ^ hash_u128(t.map(|t| t.elapsed().as_nanos()).unwrap_or_default());
            if let Some(log) = &mut lock.log {
                log.push(v);
            }
            if let Some((check, i)) = &mut lock.check {
                if check.get(*i) != Some(&v) {
                    if let Some(time) = t {
                        panic!("non-determinism detected at {time}");
                    }
                    panic!("non-determinism detected");
                }
                *i += 1;
            }
        }
        ret
    }

    /// Returns the seed this RNG was created with.
    pub fn seed(&self) -> u64 {
        self.inner.lock().seed
    }

    /// Draws an integer uniformly from the inclusive `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty.
    pub fn gen_range_inclusive(&self, range: RangeInclusive<u64>) -> u64 {
        self.with(|rng| rng.gen_range(range))
    }

    /// Returns `true` with probability `p`.
    pub fn gen_bool(&self, p: f64) -> bool {
        self.with(|rng| rng.gen_bool(p))
    }

    pub(crate) fn enable_check(&self, log: Log) {
        let mut lock = self.inner.lock();
        lock.check = Some((log.0, 0));
    }

    pub(crate) fn enable_log(&self) {
        let mut lock = self.inner.lock();
        lock.log = Some(Vec::new());
    }

    pub(crate) fn take_log(&self) -> Option<Log> {
        let mut lock = self.inner.lock();
        lock.log
            .take()
            .or_else(|| lock.check.take().map(|(s, _)| s))
            .map(Log)
    }
}

/// Random log for determinism check.
#[derive(Debug, PartialEq, Eq)]
pub struct Log(Vec<u8>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let a = GlobalRng::new_with_seed(7);
        let b = GlobalRng::new_with_seed(7);
        let xs: Vec<_> = (0..16).map(|_| a.gen_range_inclusive(1..=160)).collect();
        let ys: Vec<_> = (0..16).map(|_| b.gen_range_inclusive(1..=160)).collect();
        assert_eq!(xs, ys);
        assert_eq!(a.seed(), 7);
    }

    #[test]
    fn collapsed_range() {
        let rng = GlobalRng::new_with_seed(0);
        for _ in 0..32 {
            assert_eq!(rng.gen_range_inclusive(10..=10), 10);
        }
    }

    #[test]
    fn log_then_check() {
        let rng = GlobalRng::new_with_seed(3);
        rng.enable_log();
        for _ in 0..8 {
            rng.gen_bool(0.5);
        }
        let log = rng.take_log().unwrap();

        let replay = GlobalRng::new_with_seed(3);
        replay.enable_check(log);
        for _ in 0..8 {
            replay.gen_bool(0.5);
        }
    }

    #[test]
    #[should_panic(expected = "non-determinism detected")]
    fn check_detects_divergence() {
        let rng = GlobalRng::new_with_seed(3);
        rng.enable_log();
        rng.gen_bool(0.5);
        let log = rng.take_log().unwrap();

        let replay = GlobalRng::new_with_seed(4);
        replay.enable_check(log);
        for _ in 0..64 {
            replay.gen_bool(0.5);
        }
    }
}
