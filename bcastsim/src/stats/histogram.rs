use serde::{Deserialize, Serialize};

/// Histogram with equal-width bins over `[lower, upper)`.
///
/// Bounds are fixed at construction. Values outside the range are counted as underflow
/// or overflow instead of growing the histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    lower: f64,
    upper: f64,
    underflow: u64,
    overflow: u64,
    bins: Vec<u64>,
}

impl Histogram {
    /// Creates an empty histogram with `bins` bins.
    ///
    /// # Panics
    ///
    /// Panics if `bins` is zero or the range is empty or not finite.
    /// [`Config::validate`](crate::Config::validate) rejects such settings up front.
    pub fn new(lower: f64, upper: f64, bins: usize) -> Self {
        assert!(bins > 0, "histogram needs at least one bin");
        assert!(
            lower.is_finite() && upper.is_finite() && lower < upper,
            "invalid histogram range [{lower}, {upper})"
        );
        Histogram {
            lower,
            upper,
            underflow: 0,
            overflow: 0,
            bins: vec![0; bins],
        }
    }

    pub fn collect(&mut self, value: f64) {
        if value < self.lower {
            self.underflow += 1;
            return;
        }
        let width = (self.upper - self.lower) / self.bins.len() as f64;
        let index = ((value - self.lower) / width) as usize;
        match self.bins.get_mut(index) {
            Some(bin) if value < self.upper => *bin += 1,
            _ => self.overflow += 1,
        }
    }

    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Total number of collected values, including out-of-range ones.
    pub fn total(&self) -> u64 {
        self.underflow + self.overflow + self.bins.iter().sum::<u64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucketing() {
        let mut h = Histogram::new(0.0, 1.0, 4);
        for v in [0.0, 0.1, 0.25, 0.99, 1.0, -0.5, 7.0] {
            h.collect(v);
        }
        assert_eq!(h.bins(), &[2, 1, 0, 1]);
        assert_eq!(h.underflow(), 1);
        assert_eq!(h.overflow(), 2);
        assert_eq!(h.total(), 7);
    }

    #[test]
    #[should_panic(expected = "at least one bin")]
    fn no_bins() {
        Histogram::new(0.0, 1.0, 0);
    }
}
