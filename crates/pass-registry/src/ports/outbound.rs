//! # Driven Ports (SPI - Outbound)
//!
//! Collaborators the registry depends on:
//! - Current time for delegation expiry
//! - Payout of custodied funds
//! - Publication of registry events
//!
//! Caller identity is not a port: the transport authenticates and hands the
//! caller to every operation.

use crate::domain::entities::RegistryEvent;
use crate::domain::value_objects::{Address, Timestamp, U256};
use crate::errors::{EventBusError, FundsError};
use async_trait::async_trait;

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the current unix time in seconds.
pub trait Clock: Send + Sync {
    /// Current unix timestamp.
    fn now(&self) -> Timestamp;
}

// =============================================================================
// FUNDS TRANSFER
// =============================================================================

/// Moves value out of registry custody.
///
/// Called while the registry is exclusively locked; a failure aborts the
/// withdrawal and leaves the custodied balance untouched.
pub trait FundsTransfer: Send + Sync {
    /// Pay `amount` to `to`.
    ///
    /// # Errors
    ///
    /// Any `FundsError` aborts the withdrawal.
    fn pay_out(&self, to: Address, amount: U256) -> Result<(), FundsError>;
}

// =============================================================================
// EVENT SINK
// =============================================================================

/// Receives registry events for observers.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one event.
    ///
    /// Delivery failure never rolls back the mutation that produced it.
    ///
    /// # Returns
    ///
    /// The number of observers that received the event.
    async fn publish(&self, event: RegistryEvent) -> Result<usize, EventBusError>;

    /// Total events handed to this sink.
    fn events_published(&self) -> u64;
}
