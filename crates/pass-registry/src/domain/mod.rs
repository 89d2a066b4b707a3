//! # Domain Layer (Inner Hexagon)
//!
//! Pure business logic for the pass registry.
//! NO I/O, NO async, NO clock reads; time is always passed in.
//!
//! - `registry` - the aggregate: issuance, transfer, approvals, metadata, funds
//! - `delegation` - time-bounded usage grants with lazy expiry
//! - `identifier` - write authority for owner and user UINs
//! - `batch` - all-or-nothing batch issuance
//! - `metadata` - URI composition

pub mod batch;
pub mod delegation;
pub mod entities;
pub mod identifier;
pub mod invariants;
pub mod metadata;
pub mod registry;
pub mod value_objects;

pub use batch::zip_orders;
pub use entities::*;
pub use invariants::*;
pub use metadata::*;
pub use registry::*;
pub use value_objects::*;
