//! Streaming delay statistics.
//!
//! [`DelayStatistics`] keeps count, mean and variance with Welford's online algorithm
//! plus a fixed-bin [`Histogram`], so memory stays constant no matter how many packets
//! a run measures.

use crate::time::Duration;
use serde::{Deserialize, Serialize};

mod histogram;

pub use self::histogram::Histogram;

/// Histogram settings for delay statistics.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct HistogramConfig {
    /// Lower edge of the first bin, in seconds.
    #[serde(default)]
    pub lower: f64,
    /// Upper edge of the last bin, in seconds.
    #[serde(default = "default_upper")]
    pub upper: f64,
    /// Number of bins.
    #[serde(default = "default_bins")]
    pub bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        HistogramConfig {
            lower: 0.0,
            upper: default_upper(),
            bins: default_bins(),
        }
    }
}

const fn default_upper() -> f64 {
    1.0
}

const fn default_bins() -> usize {
    10
}

impl std::hash::Hash for HistogramConfig {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lower.to_bits().hash(state);
        self.upper.to_bits().hash(state);
        self.bins.hash(state);
    }
}

/// Running delay aggregate owned by one measuring module.
#[derive(Debug, Clone)]
pub struct DelayStatistics {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    histogram: Histogram,
    finished: bool,
}

impl DelayStatistics {
    pub fn new(config: &HistogramConfig) -> Self {
        DelayStatistics {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            histogram: Histogram::new(config.lower, config.upper, config.bins),
            finished: false,
        }
    }

    /// Records one delay sample.
    ///
    /// # Panics
    ///
    /// Panics if the statistics have already been finished.
    pub fn collect(&mut self, delay: Duration) {
        assert!(!self.finished, "delay statistics collected after finish");
        let x = delay.as_secs_f64();
        self.count += 1;
        let d = x - self.mean;
        self.mean += d / self.count as f64;
        self.m2 += d * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        self.histogram.collect(x);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns a snapshot of the statistics collected so far.
    pub fn report(&self) -> Report {
        if self.count == 0 {
            return Report {
                count: 0,
                mean: None,
                stddev: None,
                variance: None,
                min: None,
                max: None,
                histogram: self.histogram.clone(),
            };
        }
        let variance = self.m2 / self.count as f64;
        Report {
            count: self.count,
            mean: Some(self.mean),
            stddev: Some(variance.sqrt()),
            variance: Some(variance),
            min: Some(self.min),
            max: Some(self.max),
            histogram: self.histogram.clone(),
        }
    }

    /// Reduces the statistics to the end-of-run report.
    ///
    /// # Panics
    ///
    /// Panics when called more than once.
    pub fn finish(&mut self) -> Report {
        assert!(!self.finished, "delay statistics finished twice");
        self.finished = true;
        self.report()
    }
}

/// End-of-run summary of a [`DelayStatistics`].
///
/// Every moment is `None` when no sample was collected.
/// All values are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub count: u64,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub variance: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub histogram: Histogram,
}
