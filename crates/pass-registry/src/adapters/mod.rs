//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the outbound ports.

pub mod clock;
pub mod event_bus;
pub mod funds;

pub use clock::*;
pub use event_bus::*;
pub use funds::*;
