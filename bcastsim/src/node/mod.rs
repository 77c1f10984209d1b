//! The modules of the broadcast path: [`Generator`] -> [`RelayNode`] -> [`Collector`].

mod collector;
mod generator;
mod relay;

pub use self::collector::Collector;
pub use self::generator::{Generator, GeneratorState};
pub use self::relay::RelayNode;
