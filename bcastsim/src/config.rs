//! Simulation configuration.

use std::{
    fmt,
    hash::{BuildHasher, Hash, Hasher},
    ops::RangeInclusive,
    str::FromStr,
};

use crate::{net, stats::HistogramConfig, time::Duration};
use serde::{Deserialize, Serialize};

/// Simulation configuration.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Hash, Clone)]
pub struct Config {
    /// Packet source configurations.
    #[serde(default)]
    pub source: SourceConfig,

    /// Links from the source to every relay.
    #[serde(default)]
    pub channel: net::Config,

    /// Links from every relay to its collector.
    ///
    /// Collectors apply no loss model, so only `delay` and `datarate` may be set.
    #[serde(default)]
    pub sink_channel: net::Config,

    /// Wiring of the broadcast path.
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Histogram used by every delay statistic.
    #[serde(default)]
    pub histogram: HistogramConfig,
}

/// Packet source configurations.
#[derive(Debug, Serialize, Deserialize, PartialEq, Hash, Clone)]
pub struct SourceConfig {
    /// Number of packets to generate before ending the run.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Time between two generated packets.
    #[serde(default = "default_interval")]
    pub interval: Duration,
    /// Inclusive range of payload sizes in bytes.
    #[serde(default = "default_payload_bytes")]
    pub payload_bytes: RangeInclusive<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            limit: default_limit(),
            interval: default_interval(),
            payload_bytes: default_payload_bytes(),
        }
    }
}

impl SourceConfig {
    /// Checks that the payload range is non-empty and its bit sizes fit in a `u64`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let payload = &self.payload_bytes;
        if payload.start() > payload.end() {
            return Err(ConfigError::PayloadRange {
                min: *payload.start(),
                max: *payload.end(),
            });
        }
        if payload.end().checked_mul(8).is_none() {
            return Err(ConfigError::PayloadTooLarge(*payload.end()));
        }
        Ok(())
    }
}

const fn default_limit() -> u64 {
    10
}

const fn default_interval() -> Duration {
    Duration::from_secs(1)
}

// SMS text messages carry between 1 and 160 bytes
const fn default_payload_bytes() -> RangeInclusive<u64> {
    1..=160
}

/// How relays are connected to collectors.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum CollectorWiring {
    /// Every relay forwards to a single collector.
    #[default]
    Shared,
    /// Every relay forwards to its own collector.
    PerPath,
}

/// Wiring of the broadcast path.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone)]
pub struct TopologyConfig {
    /// Fan-out width of the source, one relay per output.
    #[serde(default = "default_outputs")]
    pub outputs: usize,
    #[serde(default)]
    pub collector: CollectorWiring,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            outputs: default_outputs(),
            collector: CollectorWiring::default(),
        }
    }
}

const fn default_outputs() -> usize {
    2
}

/// Errors raised while loading or validating a [`Config`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The TOML document could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// An environment variable holds a malformed value.
    #[error("{var} should be {expected}, got {value:?}")]
    Env {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    /// The payload range is empty.
    #[error("invalid payload range: {min} > {max} bytes")]
    PayloadRange { min: u64, max: u64 },
    /// A payload size does not fit in a bit count.
    #[error("payload of {0} bytes is too large")]
    PayloadTooLarge(u64),
    /// A probability lies outside `[0, 1]`.
    #[error("`{name}` must be a probability in [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
    /// A loss rate is set on a channel whose receiver applies no loss model.
    #[error("`{name}` must be 0, collectors do not drop packets, got {value}")]
    LossySink { name: &'static str, value: f64 },
    /// A channel has a zero datarate.
    #[error("`{0}.datarate` must be positive")]
    ZeroDatarate(&'static str),
    /// The histogram has no bins.
    #[error("histogram needs at least one bin")]
    NoBins,
    /// The histogram range is empty or not finite.
    #[error("invalid histogram range [{lower}, {upper})")]
    HistogramRange { lower: f64, upper: f64 },
}

impl Config {
    /// Returns the hash value of this config.
    pub fn hash(&self) -> u64 {
        let mut hasher = ahash::RandomState::with_seeds(0, 0, 0, 0).build_hasher();
        Hash::hash(self, &mut hasher);
        hasher.finish()
    }

    /// Checks that every setting is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate()?;
        for (name, value) in [
            ("channel.ber", self.channel.ber),
            ("channel.per", self.channel.per),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        for (name, value) in [
            ("sink_channel.ber", self.sink_channel.ber),
            ("sink_channel.per", self.sink_channel.per),
        ] {
            if value != 0.0 {
                return Err(ConfigError::LossySink { name, value });
            }
        }
        let channels = [("channel", &self.channel), ("sink_channel", &self.sink_channel)];
        for (name, channel) in channels {
            if channel.datarate == Some(0) {
                return Err(ConfigError::ZeroDatarate(name));
            }
        }
        let hist = &self.histogram;
        if hist.bins == 0 {
            return Err(ConfigError::NoBins);
        }
        if !(hist.lower.is_finite() && hist.upper.is_finite() && hist.lower < hist.upper) {
            return Err(ConfigError::HistogramRange {
                lower: hist.lower,
                upper: hist.upper,
            });
        }
        Ok(())
    }
}

/// Parse a config from TOML.
impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

/// Print the config into TOML.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = toml::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}
