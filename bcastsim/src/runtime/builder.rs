use super::{panic_with_info, Runtime, SimReport};
use crate::{
    config::{Config, ConfigError},
    topology,
};
use std::{
    panic::{self, AssertUnwindSafe},
    time::{Duration, SystemTime},
};

/// Builds a broadcast run with custom configuration values.
pub struct Builder {
    /// The random seed of the run.
    pub seed: u64,
    /// The configuration.
    pub config: Config,
    /// The time limit of the run.
    pub time_limit: Option<Duration>,
    /// Enable determinism check.
    pub check: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            seed: 0,
            config: Config::default(),
            time_limit: None,
            check: false,
        }
    }
}

impl Builder {
    /// Create a new builder from the following environment variables:
    ///
    /// - `BCASTSIM_SEED`: Set the random seed.
    ///
    ///     By default, the seed is set to the seconds since the Unix epoch.
    ///
    /// - `BCASTSIM_CONFIG`: Set the config file path.
    ///
    ///     By default, the default configuration is used.
    ///
    /// - `BCASTSIM_TIME_LIMIT`: Set the time limit in simulated seconds.
    ///
    ///     The run will panic if time limit exceeded.
    ///
    ///     By default, there is no time limit.
    ///
    /// - `BCASTSIM_CHECK_DETERMINISM`: Enable determinism check.
    ///
    ///     The run will be executed twice with the same seed.
    ///     If any non-determinism detected, it will panic as soon as possible.
    ///
    ///     By default, it is disabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        let seed = match std::env::var("BCASTSIM_SEED") {
            Ok(s) => s.parse().map_err(|_| ConfigError::Env {
                var: "BCASTSIM_SEED",
                expected: "an integer",
                value: s,
            })?,
            Err(_) => SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };
        let config = match std::env::var("BCASTSIM_CONFIG") {
            Ok(path) => {
                let content = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                content.parse::<Config>()?
            }
            Err(_) => Config::default(),
        };
        let time_limit = match std::env::var("BCASTSIM_TIME_LIMIT") {
            Ok(s) => match s.parse::<f64>().ok().map(Duration::try_from_secs_f64) {
                Some(Ok(limit)) => Some(limit),
                _ => {
                    return Err(ConfigError::Env {
                        var: "BCASTSIM_TIME_LIMIT",
                        expected: "a non-negative number of seconds",
                        value: s,
                    })
                }
            },
            Err(_) => None,
        };
        let check = std::env::var("BCASTSIM_CHECK_DETERMINISM").is_ok();
        Ok(Builder {
            seed,
            config,
            time_limit,
            check,
        })
    }

    /// Wire the broadcast topology and run it with configurations.
    ///
    /// On panic, prints how to reproduce the run before resuming the unwind.
    pub fn run(self) -> Result<SimReport, ConfigError> {
        let time_limit = self.time_limit;
        let setup = move |rt: &mut Runtime| {
            if let Some(limit) = time_limit {
                rt.set_time_limit(limit);
            }
            topology::broadcast(rt).map(drop)
        };
        if self.check {
            return Runtime::check_determinism(self.seed, self.config, setup);
        }
        let hash = self.config.hash();
        let mut rt = Runtime::with_seed_and_config(self.seed, self.config)?;
        setup(&mut rt)?;
        match panic::catch_unwind(AssertUnwindSafe(|| rt.run())) {
            Ok(report) => Ok(report),
            Err(e) => panic_with_info(self.seed, hash, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;

    #[test]
    fn run_default_topology() {
        let builder = Builder {
            seed: 7,
            config: Config {
                source: SourceConfig {
                    limit: 4,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        let report = builder.run().unwrap();
        assert_eq!(report.seed, 7);
        assert!(report.completed);
        assert_eq!(report.modules["collector"].count, 8);
    }

    #[test]
    fn check_determinism() {
        let builder = Builder {
            seed: 3,
            check: true,
            ..Default::default()
        };
        let report = builder.run().unwrap();
        assert_eq!(report.modules["relay[0]"].count, 10);
    }

    #[test]
    #[should_panic(expected = "time limit exceeded")]
    fn time_limit() {
        let builder = Builder {
            time_limit: Some(Duration::from_millis(1500)),
            ..Default::default()
        };
        let _ = builder.run();
    }
}
