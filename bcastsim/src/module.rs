//! Module framework.
//!
//! A [`Module`] is a simulation entity that reacts to one [`Event`] at a time. Everything
//! it needs from the outside world (the clock, timers, output gates, randomness, the
//! channel's error model) goes through the [`Context`] handed to each call, so modules
//! own their state outright and never touch the runtime directly.

use crate::{
    packet::{Packet, PacketId},
    stats::Report,
    time::{SimTime, TimerId},
};
use std::ops::RangeInclusive;

/// An event delivered to a module.
#[derive(Debug)]
pub enum Event {
    /// A timer scheduled by the module itself fired.
    Tick,
    /// A packet arrived on an input gate.
    Packet(Packet),
}

/// The simulation services available to a module while it handles an event.
pub trait Context {
    /// Returns the current simulated time.
    fn now(&self) -> SimTime;

    /// Schedules an [`Event::Tick`] for the calling module at `deadline`.
    fn schedule_at(&mut self, deadline: SimTime) -> TimerId;

    /// Cancels a tick previously scheduled by the calling module.
    fn cancel(&mut self, timer: TimerId);

    /// Hands `packet` over to the link attached to output `gate`.
    fn send(&mut self, packet: Packet, gate: usize);

    /// Returns the number of connected output gates.
    fn num_outputs(&self) -> usize;

    /// Draws an integer uniformly from `range`.
    fn sample_uniform_int(&mut self, range: RangeInclusive<u64>) -> u64;

    /// Decides whether the packet being handled was corrupted on its input link.
    fn has_transmission_error(&mut self, size_bits: u64) -> bool;

    /// Returns an identity no other packet in the run has.
    fn next_packet_id(&mut self) -> PacketId;

    /// Declares the run complete.
    fn end_of_run(&mut self);
}

/// A simulation entity.
pub trait Module {
    /// Called once before the first event is delivered.
    fn initialize(&mut self, _ctx: &mut dyn Context) {}

    /// Handles one event.
    fn handle_event(&mut self, event: Event, ctx: &mut dyn Context);

    /// Called exactly once when the run is over.
    ///
    /// Measuring modules return their delay report.
    fn finish(&mut self) -> Option<Report> {
        None
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// A scripted [`Context`] that records what a module asked for.
    pub struct MockContext {
        pub now: SimTime,
        pub outputs: usize,
        pub sizes: VecDeque<u64>,
        pub errors: VecDeque<bool>,
        pub scheduled: Vec<(SimTime, TimerId)>,
        pub sent: Vec<(Packet, usize)>,
        pub ended: usize,
        next_timer: u64,
        next_packet: u64,
    }

    impl MockContext {
        pub fn new(outputs: usize) -> Self {
            MockContext {
                now: SimTime::ZERO,
                outputs,
                sizes: VecDeque::new(),
                errors: VecDeque::new(),
                scheduled: vec![],
                sent: vec![],
                ended: 0,
                next_timer: 0,
                next_packet: 0,
            }
        }
    }

    impl Context for MockContext {
        fn now(&self) -> SimTime {
            self.now
        }

        fn schedule_at(&mut self, deadline: SimTime) -> TimerId {
            let id = TimerId(self.next_timer);
            self.next_timer += 1;
            self.scheduled.push((deadline, id));
            id
        }

        fn cancel(&mut self, timer: TimerId) {
            self.scheduled.retain(|(_, id)| *id != timer);
        }

        fn send(&mut self, packet: Packet, gate: usize) {
            assert!(gate < self.outputs, "no output gate {gate}");
            self.sent.push((packet, gate));
        }

        fn num_outputs(&self) -> usize {
            self.outputs
        }

        fn sample_uniform_int(&mut self, range: RangeInclusive<u64>) -> u64 {
            let value = self.sizes.pop_front().unwrap_or(*range.start());
            assert!(range.contains(&value), "{value} outside {range:?}");
            value
        }

        fn has_transmission_error(&mut self, _size_bits: u64) -> bool {
            self.errors.pop_front().unwrap_or(false)
        }

        fn next_packet_id(&mut self) -> PacketId {
            self.next_packet += 1;
            PacketId::new(self.next_packet)
        }

        fn end_of_run(&mut self) {
            self.ended += 1;
        }
    }
}
