use crate::{
    config::{ConfigError, SourceConfig},
    module::{Context, Event, Module},
    packet::Packet,
    time::{Duration, TimerId},
};
use std::ops::RangeInclusive;
use tracing::*;

/// Lifecycle of a [`Generator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Not initialized yet.
    Idle,
    /// A tick is pending.
    Scheduled,
    /// The packet limit was reached and the run was ended.
    Terminal,
}

/// Periodic packet source.
///
/// Every tick creates one packet with a random payload size and sends an independent
/// copy of it on each output gate. After `limit` packets the next tick ends the run.
pub struct Generator {
    limit: u64,
    interval: Duration,
    payload_bytes: RangeInclusive<u64>,
    sent_count: u64,
    state: GeneratorState,
    pending: Option<TimerId>,
}

impl Generator {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Generator {
            limit: config.limit,
            interval: config.interval,
            payload_bytes: config.payload_bytes.clone(),
            sent_count: 0,
            state: GeneratorState::Idle,
            pending: None,
        })
    }

    /// Number of ticks that produced a packet.
    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// The tick this generator is waiting for, if any.
    pub fn pending_tick(&self) -> Option<TimerId> {
        self.pending
    }

    fn tick(&mut self, ctx: &mut dyn Context) {
        self.pending = None;
        if self.state == GeneratorState::Terminal {
            debug!("tick after end of run ignored");
            return;
        }
        if self.sent_count >= self.limit {
            info!("reached packet limit, ending simulation");
            self.state = GeneratorState::Terminal;
            ctx.end_of_run();
            return;
        }

        let now = ctx.now();
        let size_bits = ctx.sample_uniform_int(self.payload_bytes.clone()) * 8;
        let packet = Packet::new(ctx.next_packet_id(), size_bits, now);
        info!(
            "sending packet {} of {} ({size_bits} bits)",
            self.sent_count + 1,
            self.limit
        );
        for gate in 0..ctx.num_outputs() {
            let copy = packet.duplicate(ctx.next_packet_id());
            ctx.send(copy, gate);
        }
        self.sent_count += 1;

        self.pending = Some(ctx.schedule_at(now + self.interval));
        self.state = GeneratorState::Scheduled;
    }
}

impl Module for Generator {
    fn initialize(&mut self, ctx: &mut dyn Context) {
        assert_eq!(self.state, GeneratorState::Idle, "generator initialized twice");
        let now = ctx.now();
        self.pending = Some(ctx.schedule_at(now));
        self.state = GeneratorState::Scheduled;
    }

    fn handle_event(&mut self, event: Event, ctx: &mut dyn Context) {
        match event {
            Event::Tick => self.tick(ctx),
            Event::Packet(packet) => {
                panic!("generator has no input gate, got packet {}", packet.id())
            }
        }
    }
}
