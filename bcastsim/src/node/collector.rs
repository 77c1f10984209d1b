use crate::{
    module::{Context, Event, Module},
    stats::{DelayStatistics, HistogramConfig, Report},
};
use tracing::*;

/// Terminal sink: measures the delay of every packet it receives and retires it.
pub struct Collector {
    stats: DelayStatistics,
}

impl Collector {
    pub fn new(histogram: &HistogramConfig) -> Self {
        Collector {
            stats: DelayStatistics::new(histogram),
        }
    }

    pub fn stats(&self) -> &DelayStatistics {
        &self.stats
    }
}

impl Module for Collector {
    fn handle_event(&mut self, event: Event, ctx: &mut dyn Context) {
        let packet = match event {
            Event::Packet(packet) => packet,
            Event::Tick => panic!("collector received a tick it never scheduled"),
        };
        let delay = packet.delay_at(ctx.now());
        self.stats.collect(delay);
        debug!(packet = %packet.id(), ?delay, "packet received at sink");
    }

    fn finish(&mut self) -> Option<Report> {
        Some(self.stats.finish())
    }
}
