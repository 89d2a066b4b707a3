//! # Pass Registry - RevPass Digital Pass Ledger
//!
//! A capped registry of transferable digital passes. Each pass binds an
//! owner identifier (owner UIN) and may carry a time-limited usage
//! delegation with its own user identifier (user UIN).
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Issued count never exceeds the supply cap | `domain/registry.rs` - `check_capacity()` |
//! | Pass ids are contiguous from 1 | `domain/registry.rs` - `mint()` |
//! | No pass is owned by the zero address | `domain/registry.rs` - `check_recipient()` |
//! | A delegation is in force only while `now < expires` | `domain/entities.rs` - `Delegation::is_active()` |
//! | Batch issuance is all-or-nothing | `domain/batch.rs` - `mass_issue()` |
//! | Failed operations change nothing and emit nothing | `service.rs` - `mutate()` |
//!
//! ## Roles
//!
//! | Role | Who | Operations |
//! |------|-----|------------|
//! | Admin | Fixed at construction | issue, mass issue, UIN rebinding, base URI, withdraw |
//! | Pass owner | Current owner of the pass | delegation, approvals |
//! | Transfer agent | Owner, approved principal or operator | ownership transfer |
//!
//! ## Outbound Dependencies
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `Clock` | Current time for delegation checks |
//! | `FundsTransfer` | Pays the custodied balance to the admin |
//! | `EventSink` | Publishes registry events |
//!
//! ## Usage Example
//!
//! ```ignore
//! use pass_registry::prelude::*;
//!
//! let service = create_test_service(admin);
//! let id = service.issue(admin, alice, 1001).await?;
//! service.set_delegation(alice, id, bob, expires, 2002).await?;
//! assert_eq!(service.user_of(id).await?, Some(bob));
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{Delegation, IssueOrder, Pass, RegistryEvent};
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };
    pub use crate::domain::registry::PassRegistry;
    pub use crate::domain::value_objects::{Address, PassId, Role, Timestamp, Uin, U256};

    // Ports
    pub use crate::ports::inbound::PassRegistryApi;
    pub use crate::ports::outbound::{Clock, EventSink, FundsTransfer};

    // Events
    pub use crate::events::{
        topics, ErrorPayload, RegistryInfo, RegistryReply, RegistryRequest, RegistryResponse,
    };

    // Errors
    pub use crate::errors::{ConfigError, EventBusError, FundsError, RegistryError};

    // Config
    pub use crate::config::{RegistryConfig, ServiceConfig};

    // Adapters
    pub use crate::adapters::{
        InMemoryEventBus, InMemoryFunds, ManualClock, SystemClock, TopicSubscription,
    };

    // Service
    pub use crate::service::{
        create_test_service, create_test_service_with, PassRegistryService, ServiceStats,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
