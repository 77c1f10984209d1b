//! Simulated links between modules.
//!
//! A link is a one-way datarate channel: a propagation delay,
//! an optional datarate that serializes packets through a FIFO transmitter, and a
//! bit-error model that decides per packet whether it arrives intact.

use crate::{
    rand::GlobalRng,
    runtime::NodeId,
    time::{Duration, SimTime},
};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use tracing::*;

/// Channel configurations.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct Config {
    /// Propagation delay.
    #[serde(default)]
    pub delay: Duration,
    /// Transmission rate in bit/s. `None` transmits instantly.
    #[serde(default)]
    pub datarate: Option<u64>,
    /// Bit error rate: probability that a single bit is corrupted.
    #[serde(default)]
    pub ber: f64,
    /// Packet error rate: probability that a packet is corrupted regardless of its size.
    #[serde(default)]
    pub per: f64,
}

impl Hash for Config {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.delay.hash(state);
        self.datarate.hash(state);
        self.ber.to_bits().hash(state);
        self.per.to_bits().hash(state);
    }
}

impl Config {
    /// Returns the probability that a packet of `size_bits` bits is corrupted in transit.
    pub fn error_probability(&self, size_bits: u64) -> f64 {
        let intact = (1.0 - self.ber).powf(size_bits as f64) * (1.0 - self.per);
        (1.0 - intact).clamp(0.0, 1.0)
    }

    /// Returns the time needed to put `size_bits` bits on the wire.
    pub fn transmission_time(&self, size_bits: u64) -> Duration {
        match self.datarate {
            Some(rate) if rate > 0 => {
                let nanos = size_bits as u128 * 1_000_000_000 / rate as u128;
                Duration::from_nanos(nanos as u64)
            }
            _ => Duration::ZERO,
        }
    }

    fn is_lossless(&self) -> bool {
        self.ber == 0.0 && self.per == 0.0
    }
}

/// Link statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    /// Total number of packets put on the link.
    pub msg_count: u64,
    /// Number of packets that arrived corrupted and were dropped.
    pub drop_count: u64,
}

/// Identifies a link in the runtime.
pub(crate) type LinkId = usize;

/// A one-way link from an output gate of `src` to `dst`.
pub(crate) struct Link {
    pub src: NodeId,
    pub dst: NodeId,
    config: Config,
    /// When the transmitter finishes the last packet handed to it.
    busy_until: SimTime,
    stat: Stat,
}

impl Link {
    pub fn new(src: NodeId, dst: NodeId, config: Config) -> Self {
        Link {
            src,
            dst,
            config,
            busy_until: SimTime::ZERO,
            stat: Stat::default(),
        }
    }

    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    /// Puts a packet on the link and returns its arrival time at `dst`.
    pub fn transmit(&mut self, now: SimTime, size_bits: u64) -> SimTime {
        self.stat.msg_count += 1;
        let start = now.max(self.busy_until);
        self.busy_until = start + self.config.transmission_time(size_bits);
        self.busy_until + self.config.delay
    }

    /// Decides whether a packet of `size_bits` bits arrived corrupted.
    pub fn test_bit_error(&mut self, rand: &GlobalRng, size_bits: u64) -> bool {
        if self.config.is_lossless() {
            return false;
        }
        let p = self.config.error_probability(size_bits);
        let lost = rand.gen_bool(p);
        if lost {
            trace!(src = %self.src, dst = %self.dst, size_bits, p, "bit error");
            self.stat.drop_count += 1;
        }
        lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_probability() {
        let ideal = Config::default();
        assert_eq!(ideal.error_probability(1280), 0.0);

        let certain = Config {
            per: 1.0,
            ..Default::default()
        };
        assert_eq!(certain.error_probability(8), 1.0);

        let noisy = Config {
            ber: 0.01,
            ..Default::default()
        };
        let p = noisy.error_probability(80);
        assert!((p - (1.0 - 0.99f64.powi(80))).abs() < 1e-12);
        assert!(noisy.error_probability(160) > p);
    }

    #[test]
    fn fifo_transmitter() {
        let config = Config {
            delay: Duration::from_millis(10),
            datarate: Some(8_000),
            ..Default::default()
        };
        let mut link = Link::new(NodeId(0), NodeId(1), config);
        // 80 bits at 8 kbit/s take 10ms on the wire
        let t0 = SimTime::ZERO;
        assert_eq!(link.transmit(t0, 80), t0 + Duration::from_millis(20));
        // queued behind the first packet
        assert_eq!(link.transmit(t0, 80), t0 + Duration::from_millis(30));
        let t1 = SimTime::from_secs(1);
        assert_eq!(link.transmit(t1, 80), t1 + Duration::from_millis(20));
        assert_eq!(link.stat().msg_count, 3);
    }

    #[test]
    fn lossless_link_never_draws() {
        let rand = GlobalRng::new_with_seed(1);
        let mut link = Link::new(NodeId(0), NodeId(1), Config::default());
        assert!(!link.test_bit_error(&rand, 1280));
        let fresh = GlobalRng::new_with_seed(1);
        assert_eq!(
            rand.gen_range_inclusive(0..=u64::MAX),
            fresh.gen_range_inclusive(0..=u64::MAX)
        );
    }

    #[test]
    fn forced_loss() {
        let rand = GlobalRng::new_with_seed(1);
        let config = Config {
            ber: 1.0,
            ..Default::default()
        };
        let mut link = Link::new(NodeId(0), NodeId(1), config);
        for _ in 0..10 {
            assert!(link.test_bit_error(&rand, 8));
        }
        assert_eq!(link.stat().drop_count, 10);
    }
}
