//! A discrete-event simulation of a packet broadcast network.
//!
//! A [`Generator`](node::Generator) emits packets of random size at a fixed interval and
//! broadcasts a copy on every output gate. Each copy crosses a lossy channel to a
//! [`RelayNode`](node::RelayNode), which measures its end-to-end delay and forwards it to
//! a [`Collector`](node::Collector). After a configured number of packets the generator
//! ends the run, and every measuring module reports its delay statistics.
//!
//! ```
//! use bcastsim::{runtime::Runtime, topology, Config};
//!
//! let config: Config = "[source]\nlimit = 3".parse().unwrap();
//! let mut rt = Runtime::with_seed_and_config(42, config).unwrap();
//! topology::broadcast(&mut rt).unwrap();
//! let report = rt.run();
//! assert_eq!(report.modules["relay[0]"].count, 3);
//! ```

pub use self::config::{CollectorWiring, Config, ConfigError, SourceConfig, TopologyConfig};
pub use self::module::{Context, Event, Module};
pub use self::packet::{Packet, PacketId};

mod config;
pub mod module;
pub mod net;
pub mod node;
pub mod packet;
pub mod rand;
pub mod runtime;
pub mod stats;
pub mod time;
pub mod topology;
