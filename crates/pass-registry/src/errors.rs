//! # Error Types
//!
//! All error types for the pass registry.

use crate::domain::value_objects::{Address, PassId, Role, Timestamp, U256};
use thiserror::Error;

// =============================================================================
// REGISTRY ERRORS
// =============================================================================

/// Errors returned by registry operations.
///
/// Every variant is reported before any state is touched; a failed call
/// leaves the registry exactly as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Issuance would push supply past the cap.
    #[error("capacity exceeded: {issued} issued + {requested} requested > max supply {max_supply}")]
    CapacityExceeded {
        /// Passes already issued.
        issued: u64,
        /// Passes requested by this call.
        requested: u64,
        /// Immutable supply cap.
        max_supply: u64,
    },

    /// Pass id outside `1..=total_issued`.
    #[error("pass not found: {0}")]
    NotFound(PassId),

    /// Caller lacks the role the operation requires.
    #[error("unauthorized: {caller} is not {required}")]
    Unauthorized {
        /// Principal that made the call.
        caller: Address,
        /// Role the operation demands.
        required: Role,
    },

    /// Delegation expiry is not strictly after the call time.
    #[error("invalid expiry: {expiry} is not after {now}")]
    InvalidExpiry {
        /// Requested expiry.
        expiry: Timestamp,
        /// Clock reading at call time.
        now: Timestamp,
    },

    /// Withdraw called with an empty balance.
    #[error("nothing to withdraw")]
    NothingToWithdraw,

    /// Recipient, delegated user or operator is not an acceptable principal.
    #[error("invalid recipient: {0:?}")]
    InvalidRecipient(Address),

    /// Parallel airdrop arrays differ in length.
    #[error("length mismatch: {recipients} recipients, {uins} UINs")]
    LengthMismatch {
        /// Number of recipients.
        recipients: usize,
        /// Number of owner UINs.
        uins: usize,
    },

    /// Deposit of a zero amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(U256),

    /// Deposit would overflow the custodied balance.
    #[error("balance overflow: {balance} + {amount} exceeds U256")]
    BalanceOverflow {
        /// Custodied balance before the deposit.
        balance: U256,
        /// Rejected deposit.
        amount: U256,
    },

    /// The funds collaborator refused the payout; the balance was restored.
    #[error("funds transfer failed: {0}")]
    FundsTransfer(#[from] FundsError),
}

impl RegistryError {
    /// Returns true if the caller was refused for lack of authority.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Stable machine-readable code for the request envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "CapacityExceeded",
            Self::NotFound(_) => "NotFound",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::InvalidExpiry { .. } => "InvalidExpiry",
            Self::NothingToWithdraw => "NothingToWithdraw",
            Self::InvalidRecipient(_) => "InvalidRecipient",
            Self::LengthMismatch { .. } => "LengthMismatch",
            Self::InvalidAmount(_) => "InvalidAmount",
            Self::BalanceOverflow { .. } => "BalanceOverflow",
            Self::FundsTransfer(_) => "FundsTransfer",
        }
    }
}

// =============================================================================
// FUNDS ERRORS
// =============================================================================

/// Errors from the funds-transfer collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FundsError {
    /// The payout was rejected by the collaborator.
    #[error("payout to {to:?} rejected: {reason}")]
    Rejected {
        /// Intended recipient.
        to: Address,
        /// Reason reported by the collaborator.
        reason: String,
    },

    /// The collaborator could not be reached.
    #[error("funds backend unavailable")]
    Unavailable,
}

// =============================================================================
// EVENT BUS ERRORS
// =============================================================================

/// Errors from the event sink.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Nobody is listening; the event was dropped.
    #[error("no subscribers for topic {0}")]
    NoSubscribers(&'static str),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Admin address is the zero address.
    #[error("admin address must not be zero; set REVPASS_ADMIN")]
    ZeroAdmin,

    /// An environment variable held an unparseable value.
    #[error("invalid value for {var}: {reason}")]
    InvalidVar {
        /// Variable name.
        var: &'static str,
        /// Parse failure.
        reason: String,
    },

    /// Config file could not be read or parsed.
    #[error("config file error: {0}")]
    File(String),
}

// =============================================================================
// TESTS
// =============================================================================
