//! The bcastsim runtime.

use crate::{
    config::{Config, ConfigError},
    module::{Context, Event, Module},
    net::{self, Link, LinkId},
    packet::{Packet, PacketId},
    rand::GlobalRng,
    stats::Report,
    time::{Duration, SimTime, Timer, TimerId},
};
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    ops::RangeInclusive,
    panic::{self, AssertUnwindSafe},
};
use tracing::*;

mod builder;
pub(crate) mod context;

pub use self::builder::Builder;

/// Identifies a module in the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The bcastsim runtime.
///
/// The runtime is the substrate modules run on: it owns the clock, the event queue,
/// the random number generator and the links between modules, and delivers one event
/// to one module at a time in nondecreasing time order.
///
/// # Example
///
/// ```
/// use bcastsim::{runtime::Runtime, topology, Config};
///
/// let mut rt = Runtime::with_seed_and_config(1, Config::default()).unwrap();
/// topology::broadcast(&mut rt).unwrap();
/// let report = rt.run();
/// assert!(report.completed);
/// assert_eq!(report.modules["collector"].count, 20);
/// ```
pub struct Runtime {
    modules: Vec<Box<dyn Module>>,
    core: Core,
}

/// Everything but the modules, so a module can borrow it while handling an event.
struct Core {
    rand: GlobalRng,
    config: Config,
    now: SimTime,
    timer: Timer<Delivery>,
    nodes: Vec<Node>,
    links: Vec<Link>,
    /// Owner of every pending tick.
    ticks: HashMap<TimerId, NodeId>,
    next_packet: u64,
    ended: bool,
    events: u64,
    time_limit: Option<Duration>,
}

struct Node {
    name: String,
    span: Span,
    /// Output gates, indexed by gate number.
    gates: Vec<LinkId>,
}

enum Delivery {
    Tick(NodeId),
    Packet { link: LinkId, packet: Packet },
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a new runtime instance with default seed and config.
    pub fn new() -> Self {
        Self::build(0, Config::default())
    }

    /// Create a new runtime instance with given seed and config.
    ///
    /// Fails before anything is scheduled if the config is out of range.
    pub fn with_seed_and_config(seed: u64, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(seed, config))
    }

    fn build(seed: u64, config: Config) -> Self {
        let core = Core {
            rand: GlobalRng::new_with_seed(seed),
            config,
            now: SimTime::ZERO,
            timer: Timer::default(),
            nodes: vec![],
            links: vec![],
            ticks: HashMap::new(),
            next_packet: 0,
            ended: false,
            events: 0,
            time_limit: None,
        };
        Runtime {
            modules: vec![],
            core,
        }
    }

    /// Returns the random seed of this runtime.
    pub fn seed(&self) -> u64 {
        self.core.rand.seed()
    }

    pub fn config(&self) -> &Config {
        &self.core.config
    }

    /// Add a module under `name`.
    pub fn add_node(&mut self, name: impl Into<String>, module: impl Module + 'static) -> NodeId {
        let name = name.into();
        let id = NodeId(self.modules.len());
        debug!("add node {id}: {name}");
        self.core.nodes.push(Node {
            span: error_span!("node", name = %name),
            name,
            gates: vec![],
        });
        self.modules.push(Box::new(module));
        id
    }

    /// Connect a new output gate of `src` to `dst` over a channel.
    ///
    /// Returns the gate number on `src`.
    pub fn connect(&mut self, src: NodeId, dst: NodeId, channel: net::Config) -> usize {
        assert!(src.0 < self.modules.len(), "node not found: {src}");
        assert!(dst.0 < self.modules.len(), "node not found: {dst}");
        let link = self.core.links.len();
        self.core.links.push(Link::new(src, dst, channel));
        let gates = &mut self.core.nodes[src.0].gates;
        gates.push(link);
        debug!("connect: {src} gate {} -> {dst}", gates.len() - 1);
        gates.len() - 1
    }

    /// Set a time limit of the execution.
    ///
    /// The runtime will panic when time limit exceeded.
    pub fn set_time_limit(&mut self, limit: Duration) {
        self.core.time_limit = Some(limit);
    }

    /// Run the simulation until a module declares the end of the run, then finish every
    /// module exactly once.
    ///
    /// If the event queue drains first, the run ends there and the report is marked as
    /// not completed.
    pub fn run(mut self) -> SimReport {
        let _guard = context::enter(SimTime::ZERO);
        for (i, module) in self.modules.iter_mut().enumerate() {
            let _span = self.core.nodes[i].span.clone().entered();
            let mut ctx = NodeContext {
                core: &mut self.core,
                node: NodeId(i),
                ingress: None,
            };
            module.initialize(&mut ctx);
        }

        while !self.core.ended {
            let Some((time, timer, delivery)) = self.core.timer.pop() else {
                warn!("no more events, ending simulation without end of run");
                break;
            };
            assert!(time >= self.core.now, "event scheduled in the past");
            if let Some(limit) = self.core.time_limit {
                if time.elapsed() > limit {
                    panic!("time limit exceeded: {limit:?}");
                }
            }
            self.core.now = time;
            self.core.events += 1;
            context::set_now(time);

            let (node, event, ingress) = match delivery {
                Delivery::Tick(node) => {
                    self.core.ticks.remove(&timer);
                    (node, Event::Tick, None)
                }
                Delivery::Packet { link, packet } => {
                    (self.core.links[link].dst, Event::Packet(packet), Some(link))
                }
            };
            let _span = self.core.nodes[node.0].span.clone().entered();
            let mut ctx = NodeContext {
                core: &mut self.core,
                node,
                ingress,
            };
            self.modules[node.0].handle_event(event, &mut ctx);
        }
        info!(
            events = self.core.events,
            discarded = self.core.timer.len(),
            "simulation ended at {}",
            self.core.now
        );

        let mut modules = BTreeMap::new();
        for (node, module) in self.core.nodes.iter().zip(&mut self.modules) {
            let _span = node.span.clone().entered();
            if let Some(report) = module.finish() {
                modules.insert(node.name.clone(), report);
            }
        }
        let links = (self.core.links.iter())
            .map(|link| {
                let name = format!(
                    "{}->{}",
                    self.core.nodes[link.src.0].name, self.core.nodes[link.dst.0].name
                );
                (name, link.stat().clone())
            })
            .collect();
        SimReport {
            seed: self.core.rand.seed(),
            end_time: self.core.now,
            events: self.core.events,
            completed: self.core.ended,
            modules,
            links,
        }
    }

    /// Check determinism of a run.
    ///
    /// The run is executed twice with the same seed; the second execution panics as soon
    /// as it draws a different random value than the first one did.
    pub fn check_determinism<F>(seed: u64, config: Config, setup: F) -> Result<SimReport, ConfigError>
    where
        F: Fn(&mut Runtime) -> Result<(), ConfigError>,
    {
        let hash = config.hash();
        let mut rt = Runtime::with_seed_and_config(seed, config.clone())?;
        setup(&mut rt)?;
        let rand = rt.core.rand.clone();
        rand.enable_log();
        let first = panic::catch_unwind(AssertUnwindSafe(|| rt.run()))
            .unwrap_or_else(|e| panic_with_info(seed, hash, e));
        let log = rand.take_log().expect("random log enabled");

        let mut rt = Runtime::with_seed_and_config(seed, config)?;
        setup(&mut rt)?;
        rt.core.rand.enable_check(log);
        let second = panic::catch_unwind(AssertUnwindSafe(|| rt.run()))
            .unwrap_or_else(|e| panic_with_info(seed, hash, e));
        assert_eq!(first, second, "non-determinism detected in the final report");
        Ok(second)
    }
}

pub(crate) fn panic_with_info(seed: u64, hash: u64, payload: Box<dyn Any + Send>) -> ! {
    eprintln!(
        "note: run with `BCASTSIM_SEED={}` environment variable to reproduce this error",
        seed
    );
    eprintln!("      and make sure `BCASTSIM_CONFIG_HASH={:016X}`", hash);
    panic::resume_unwind(payload);
}

/// The [`Context`] of one module while it handles one event.
struct NodeContext<'a> {
    core: &'a mut Core,
    node: NodeId,
    /// The link the current packet arrived on.
    ingress: Option<LinkId>,
}

impl NodeContext<'_> {
    fn name(&self) -> &str {
        &self.core.nodes[self.node.0].name
    }
}

impl Context for NodeContext<'_> {
    fn now(&self) -> SimTime {
        self.core.now
    }

    fn schedule_at(&mut self, deadline: SimTime) -> TimerId {
        assert!(
            deadline >= self.core.now,
            "{} scheduled a tick in the past: {deadline} < {}",
            self.name(),
            self.core.now
        );
        let id = self.core.timer.push(deadline, Delivery::Tick(self.node));
        self.core.ticks.insert(id, self.node);
        trace!("schedule {id} at {deadline}");
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        match self.core.ticks.get(&timer).copied() {
            Some(owner) if owner == self.node => {
                self.core.ticks.remove(&timer);
                self.core.timer.cancel(timer);
                trace!("cancel {timer}");
            }
            Some(owner) => panic!(
                "{} cannot cancel {timer} owned by {}",
                self.name(),
                self.core.nodes[owner.0].name
            ),
            None => trace!("{timer} already fired"),
        }
    }

    fn send(&mut self, packet: Packet, gate: usize) {
        let Some(&link) = self.core.nodes[self.node.0].gates.get(gate) else {
            panic!("{} has no output gate {gate}", self.name());
        };
        let arrival = self.core.links[link].transmit(self.core.now, packet.size_bits());
        trace!(packet = %packet.id(), gate, "send, arrives at {arrival}");
        self.core.timer.push(arrival, Delivery::Packet { link, packet });
    }

    fn num_outputs(&self) -> usize {
        self.core.nodes[self.node.0].gates.len()
    }

    fn sample_uniform_int(&mut self, range: RangeInclusive<u64>) -> u64 {
        self.core.rand.gen_range_inclusive(range)
    }

    fn has_transmission_error(&mut self, size_bits: u64) -> bool {
        let core = &mut *self.core;
        match self.ingress {
            Some(link) => core.links[link].test_bit_error(&core.rand, size_bits),
            None => false,
        }
    }

    fn next_packet_id(&mut self) -> PacketId {
        self.core.next_packet += 1;
        PacketId::new(self.core.next_packet)
    }

    fn end_of_run(&mut self) {
        if !self.core.ended {
            info!("{} ended the run", self.name());
            self.core.ended = true;
        }
    }
}

/// Results of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    /// The random seed of the run.
    pub seed: u64,
    /// Simulated time of the last delivered event.
    pub end_time: SimTime,
    /// Number of delivered events.
    pub events: u64,
    /// Whether a module ended the run, as opposed to the event queue running dry.
    pub completed: bool,
    /// Final report of every measuring module, by module name.
    pub modules: BTreeMap<String, Report>,
    /// Statistics of every link, by `src->dst`.
    pub links: BTreeMap<String, net::Stat>,
}

/// Print the report into TOML.
impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = toml::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

/// Initialize logger.
///
/// Log lines are stamped with the simulated time and filtered by `RUST_LOG`.
pub fn init_logger() {
    use std::sync::Once;
    use tracing_subscriber::{
        fmt::{format::Writer, time::FormatTime},
        EnvFilter,
    };

    struct SimTimer;

    impl FormatTime for SimTimer {
        fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
            match context::try_now() {
                Some(time) => write!(w, "{time}"),
                None => write!(w, "-"),
            }
        }
    }

    static LOGGER_INIT: Once = Once::new();
    LOGGER_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_timer(SimTimer)
            .try_init();
    });
}
