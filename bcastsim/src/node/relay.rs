use crate::{
    module::{Context, Event, Module},
    stats::{DelayStatistics, HistogramConfig, Report},
};
use tracing::*;

/// Measures the delay of packets coming from the source and forwards them.
///
/// Packets corrupted on the input link are dropped without being measured.
pub struct RelayNode {
    stats: DelayStatistics,
    dropped: u64,
}

impl RelayNode {
    pub fn new(histogram: &HistogramConfig) -> Self {
        RelayNode {
            stats: DelayStatistics::new(histogram),
            dropped: 0,
        }
    }

    pub fn stats(&self) -> &DelayStatistics {
        &self.stats
    }

    /// Number of packets lost to bit errors.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Module for RelayNode {
    fn handle_event(&mut self, event: Event, ctx: &mut dyn Context) {
        let packet = match event {
            Event::Packet(packet) => packet,
            Event::Tick => panic!("relay node received a tick it never scheduled"),
        };
        if ctx.has_transmission_error(packet.size_bits()) {
            debug!(packet = %packet.id(), "packet dropped due to bit error");
            self.dropped += 1;
            return;
        }
        let delay = packet.delay_at(ctx.now());
        self.stats.collect(delay);
        debug!(packet = %packet.id(), ?delay, "packet received");
        ctx.send(packet, 0);
    }

    fn finish(&mut self) -> Option<Report> {
        Some(self.stats.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        module::mock::MockContext,
        packet::Packet,
        time::{Duration, SimTime},
    };

    fn packet(ctx: &mut MockContext, generated_at: SimTime) -> Packet {
        let id = ctx.next_packet_id();
        Packet::new(id, 80, generated_at)
    }

    #[test]
    fn measures_and_forwards() {
        let mut relay = RelayNode::new(&HistogramConfig::default());
        let mut ctx = MockContext::new(1);
        ctx.now = SimTime::from_secs(2);
        let pkt = packet(&mut ctx, SimTime::from_secs(1));
        let id = pkt.id();
        relay.handle_event(Event::Packet(pkt), &mut ctx);

        assert_eq!(ctx.sent.len(), 1);
        assert_eq!(ctx.sent[0].0.id(), id, "forwards the same packet");
        assert_eq!(ctx.sent[0].1, 0);
        let report = relay.finish().unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.mean, Some(1.0));
    }

    #[test]
    fn lost_packet_is_not_measured() {
        let mut relay = RelayNode::new(&HistogramConfig::default());
        let mut ctx = MockContext::new(1);
        ctx.errors.extend([true, false, true]);
        for _ in 0..3 {
            let pkt = packet(&mut ctx, SimTime::ZERO);
            relay.handle_event(Event::Packet(pkt), &mut ctx);
        }
        assert_eq!(relay.dropped(), 2);
        assert_eq!(relay.stats().count(), 1);
        assert_eq!(ctx.sent.len(), 1);
    }

    #[test]
    fn nothing_received() {
        let mut relay = RelayNode::new(&HistogramConfig::default());
        let report = relay.finish().unwrap();
        assert_eq!(report.count, 0);
        assert_eq!(report.mean, None);
        assert_eq!(report.stddev, None);
    }

    #[test]
    #[should_panic(expected = "finished twice")]
    fn finish_twice() {
        let mut relay = RelayNode::new(&HistogramConfig::default());
        relay.finish();
        relay.finish();
    }

    #[test]
    #[should_panic(expected = "causality violation")]
    fn packet_from_the_future() {
        let mut relay = RelayNode::new(&HistogramConfig::default());
        let mut ctx = MockContext::new(1);
        let pkt = packet(&mut ctx, SimTime::ZERO + Duration::from_millis(1));
        relay.handle_event(Event::Packet(pkt), &mut ctx);
    }

    #[test]
    #[should_panic(expected = "never scheduled")]
    fn tick_is_a_defect() {
        let mut relay = RelayNode::new(&HistogramConfig::default());
        relay.handle_event(Event::Tick, &mut MockContext::new(1));
    }
}
