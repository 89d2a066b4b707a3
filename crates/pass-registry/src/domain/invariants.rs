//! # Domain Invariants
//!
//! Properties that hold after every registry operation.
//!
//! - Supply never exceeds the cap.
//! - Every issued pass has a non-zero owner.
//! - Ids are contiguous from 1 and match their arena slot.
//! - A single-pass approval never names the zero address.

use super::registry::PassRegistry;
use super::value_objects::PassId;

/// Supply is within the cap.
#[must_use]
pub fn check_supply_invariant(registry: &PassRegistry) -> bool {
    registry.total_issued() <= registry.max_supply()
}

/// No issued pass is held by the zero address.
#[must_use]
pub fn check_owner_invariant(registry: &PassRegistry) -> bool {
    registry.passes().all(|pass| !pass.owner.is_zero())
}

/// Pass `n` sits at slot `n - 1` for every issued pass.
#[must_use]
pub fn check_contiguity_invariant(registry: &PassRegistry) -> bool {
    registry
        .passes()
        .enumerate()
        .all(|(slot, pass)| pass.id.slot() == Some(slot))
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(registry: &PassRegistry) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_supply_invariant(registry) {
        violations.push(InvariantViolation::SupplyExceedsCap {
            issued: registry.total_issued(),
            max_supply: registry.max_supply(),
        });
    }

    for pass in registry.passes() {
        if pass.owner.is_zero() {
            violations.push(InvariantViolation::ZeroOwner(pass.id));
        }
        if pass.approved.is_some_and(|approved| approved.is_zero()) {
            violations.push(InvariantViolation::ZeroApproval(pass.id));
        }
    }

    if !check_contiguity_invariant(registry) {
        violations.push(InvariantViolation::NonContiguousIds);
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More passes than the cap allows.
    SupplyExceedsCap {
        /// Passes issued.
        issued: u64,
        /// Supply cap.
        max_supply: u64,
    },
    /// A pass is owned by the zero address.
    ZeroOwner(PassId),
    /// A pass approves the zero address.
    ZeroApproval(PassId),
    /// Arena slots and ids disagree.
    NonContiguousIds,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SupplyExceedsCap { issued, max_supply } => {
                write!(f, "supply exceeds cap: {issued} > {max_supply}")
            }
            Self::ZeroOwner(id) => write!(f, "pass {id} owned by zero address"),
            Self::ZeroApproval(id) => write!(f, "pass {id} approves zero address"),
            Self::NonContiguousIds => write!(f, "pass ids are not contiguous from 1"),
        }
    }
}
