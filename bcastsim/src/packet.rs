//! Packets carried through the broadcast path.

use crate::time::{Duration, SimTime};
use std::fmt;

/// Unique identity of a packet instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId(pub(crate) u64);

impl PacketId {
    /// Creates an id from its raw value.
    pub const fn new(raw: u64) -> Self {
        PacketId(raw)
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unit of traffic.
///
/// A packet is immutable once created and is deliberately not `Clone`: a packet has a
/// single owner at a time, and fan-out goes through [`Packet::duplicate`], which hands
/// out a new identity.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet {
    id: PacketId,
    size_bits: u64,
    generated_at: SimTime,
}

impl Packet {
    /// Creates a packet stamped with its generation time.
    pub fn new(id: PacketId, size_bits: u64, generated_at: SimTime) -> Self {
        Packet {
            id,
            size_bits,
            generated_at,
        }
    }

    /// Returns an independent copy of this packet carrying identity `id`.
    pub fn duplicate(&self, id: PacketId) -> Self {
        Packet { id, ..*self }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn size_bits(&self) -> u64 {
        self.size_bits
    }

    pub fn generated_at(&self) -> SimTime {
        self.generated_at
    }

    /// Returns the end-to-end delay of this packet observed at `now`.
    ///
    /// # Panics
    ///
    /// Panics if `now` is earlier than the generation time, which means an event was
    /// delivered before the event that caused it.
    pub fn delay_at(&self, now: SimTime) -> Duration {
        match now.checked_duration_since(self.generated_at) {
            Some(delay) => delay,
            None => panic!(
                "causality violation: packet {} generated at {} observed at {now}",
                self.id, self.generated_at
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_gets_fresh_identity() {
        let pkt = Packet::new(PacketId::new(1), 80, SimTime::from_secs(2));
        let dup = pkt.duplicate(PacketId::new(2));
        assert_ne!(pkt.id(), dup.id());
        assert_eq!(dup.size_bits(), 80);
        assert_eq!(dup.generated_at(), SimTime::from_secs(2));
    }

    #[test]
    fn delay() {
        let pkt = Packet::new(PacketId::new(1), 8, SimTime::from_secs(2));
        assert_eq!(pkt.delay_at(SimTime::from_secs(2)), Duration::ZERO);
        assert_eq!(pkt.delay_at(SimTime::from_secs(5)), Duration::from_secs(3));
    }

    #[test]
    #[should_panic(expected = "causality violation")]
    fn negative_delay() {
        let pkt = Packet::new(PacketId::new(1), 8, SimTime::from_secs(2));
        pkt.delay_at(SimTime::from_secs(1));
    }
}
