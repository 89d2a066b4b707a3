//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the registry domain and the outside world.
//!
//! - **Driving Ports (Inbound)**: `PassRegistryApi`
//! - **Driven Ports (Outbound)**: `Clock`, `FundsTransfer`, `EventSink`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
