//! Wiring of the broadcast network.

use crate::{
    config::{CollectorWiring, ConfigError},
    node::{Collector, Generator, RelayNode},
    runtime::{NodeId, Runtime},
};
use tracing::*;

/// Nodes created by [`broadcast`].
#[derive(Debug, Clone)]
pub struct Topology {
    pub source: NodeId,
    /// One relay per output gate of the source, in gate order.
    pub relays: Vec<NodeId>,
    /// A single shared collector, or one per relay.
    pub collectors: Vec<NodeId>,
}

/// Wire a source, its relays and the collectors into `rt` according to its config.
///
/// Gate `i` of `source` leads to `relay[i]` over `[channel]`, and every relay forwards
/// on gate 0 to its collector over `[sink_channel]`.
pub fn broadcast(rt: &mut Runtime) -> Result<Topology, ConfigError> {
    let config = rt.config().clone();
    let generator = Generator::new(&config.source)?;
    let source = rt.add_node("source", generator);

    let outputs = config.topology.outputs;
    let histogram = &config.histogram;
    let collectors: Vec<_> = match config.topology.collector {
        CollectorWiring::Shared => vec![rt.add_node("collector", Collector::new(histogram))],
        CollectorWiring::PerPath => (0..outputs)
            .map(|i| rt.add_node(format!("collector[{i}]"), Collector::new(histogram)))
            .collect(),
    };

    let mut relays = Vec::with_capacity(outputs);
    for i in 0..outputs {
        let relay = rt.add_node(format!("relay[{i}]"), RelayNode::new(histogram));
        rt.connect(source, relay, config.channel.clone());
        let collector = collectors[i % collectors.len()];
        rt.connect(relay, collector, config.sink_channel.clone());
        relays.push(relay);
    }
    info!(
        outputs,
        collectors = collectors.len(),
        "broadcast topology ready"
    );
    Ok(Topology {
        source,
        relays,
        collectors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn per_path_wiring() {
        let mut config = Config::default();
        config.topology.outputs = 3;
        config.topology.collector = CollectorWiring::PerPath;
        let mut rt = Runtime::with_seed_and_config(0, config).unwrap();
        let topo = broadcast(&mut rt).unwrap();
        assert_eq!(topo.relays.len(), 3);
        assert_eq!(topo.collectors.len(), 3);

        let report = rt.run();
        for i in 0..3 {
            assert_eq!(report.modules[&format!("collector[{i}]")].count, 10);
            assert_eq!(report.links[&format!("relay[{i}]->collector[{i}]")].msg_count, 10);
        }
        assert!(!report.modules.contains_key("source"));
    }

    #[test]
    fn zero_outputs() {
        let mut config = Config::default();
        config.topology.outputs = 0;
        config.topology.collector = CollectorWiring::PerPath;
        let mut rt = Runtime::with_seed_and_config(0, config).unwrap();
        let topo = broadcast(&mut rt).unwrap();
        assert!(topo.relays.is_empty());
        assert!(topo.collectors.is_empty());

        let report = rt.run();
        assert!(report.completed);
        assert!(report.modules.is_empty());
        assert_eq!(report.end_time.as_secs_f64(), 10.0);
    }
}
