//! # Domain Entities
//!
//! Core entities held by the registry aggregate.

use super::value_objects::{Address, PassId, Timestamp, Uin, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
// DELEGATION
// =============================================================================

/// Time-bounded usage grant stored on a pass.
///
/// The stored value is kept after `expires` passes; readers decide whether
/// it is still in force via [`Delegation::is_active`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegated user.
    pub user: Address,
    /// Unix timestamp at which the grant lapses.
    pub expires: Timestamp,
}

impl Delegation {
    /// A grant is in force strictly before its expiry.
    #[must_use]
    pub fn is_active(&self, now: Timestamp) -> bool {
        now < self.expires
    }
}

// =============================================================================
// PASS
// =============================================================================

/// One registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pass {
    /// Sequential id.
    pub id: PassId,
    /// Current title holder. Never the zero address.
    pub owner: Address,
    /// Admin-verified identifier bound to the owner.
    pub owner_uin: Uin,
    /// Current usage grant, if any was set and not cleared.
    pub delegation: Option<Delegation>,
    /// Identifier bound to the delegated user; survives lapse of the grant.
    pub user_uin: Option<Uin>,
    /// Principal approved to transfer this single pass.
    pub approved: Option<Address>,
}

impl Pass {
    /// Creates a freshly issued pass with no delegation.
    #[must_use]
    pub fn issued(id: PassId, owner: Address, owner_uin: Uin) -> Self {
        Self {
            id,
            owner,
            owner_uin,
            delegation: None,
            user_uin: None,
            approved: None,
        }
    }

    /// Delegated user in force at `now`, applying lazy expiry.
    #[must_use]
    pub fn user_at(&self, now: Timestamp) -> Option<Address> {
        self.delegation
            .filter(|grant| grant.is_active(now))
            .map(|grant| grant.user)
    }
}

// =============================================================================
// ISSUE ORDER
// =============================================================================

/// One `(recipient, owner UIN)` entry of a batch issuance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOrder {
    /// Recipient of the new pass.
    pub recipient: Address,
    /// Owner UIN bound at issuance.
    pub owner_uin: Uin,
}

impl IssueOrder {
    /// Creates an issue order.
    #[must_use]
    pub const fn new(recipient: Address, owner_uin: Uin) -> Self {
        Self {
            recipient,
            owner_uin,
        }
    }
}

impl From<(Address, Uin)> for IssueOrder {
    fn from((recipient, owner_uin): (Address, Uin)) -> Self {
        Self::new(recipient, owner_uin)
    }
}

// =============================================================================
// REGISTRY EVENTS
// =============================================================================

/// Observable record of an applied mutation.
///
/// Events are produced only by successful operations, in mutation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A pass was created.
    Issued {
        /// New pass id.
        pass_id: PassId,
        /// First owner.
        recipient: Address,
        /// Owner UIN bound at issuance.
        owner_uin: Uin,
    },
    /// Title moved to a new owner.
    Transferred {
        /// Pass id.
        pass_id: PassId,
        /// Previous owner.
        from: Address,
        /// New owner.
        to: Address,
    },
    /// Single-pass approval changed.
    Approval {
        /// Pass id.
        pass_id: PassId,
        /// Owner at the time of approval.
        owner: Address,
        /// Approved principal, or None when revoked.
        approved: Option<Address>,
    },
    /// Operator grant changed.
    ApprovalForAll {
        /// Granting owner.
        owner: Address,
        /// Operator.
        operator: Address,
        /// Whether the grant is now in force.
        approved: bool,
    },
    /// Admin rebound the owner UIN.
    OwnerUinChanged {
        /// Pass id.
        pass_id: PassId,
        /// Previous value.
        previous: Uin,
        /// New value.
        current: Uin,
    },
    /// Owner set a delegation.
    DelegationUpdated {
        /// Pass id.
        pass_id: PassId,
        /// Delegated user.
        user: Address,
        /// Grant expiry.
        expires: Timestamp,
        /// User UIN bound with the grant.
        user_uin: Uin,
    },
    /// Owner revoked the delegation before it lapsed.
    DelegationCleared {
        /// Pass id.
        pass_id: PassId,
    },
    /// Metadata base path changed.
    BaseUriChanged {
        /// New base.
        base_uri: String,
    },
    /// Funds received into custody.
    Deposited {
        /// Sender.
        from: Address,
        /// Amount received.
        amount: U256,
    },
    /// Custodied balance paid out to the admin.
    Withdrawn {
        /// Recipient (the admin).
        to: Address,
        /// Amount paid out.
        amount: U256,
    },
}

impl RegistryEvent {
    /// Topic this event is published under.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        use crate::events::topics;
        match self {
            Self::Issued { .. } => topics::ISSUANCE,
            Self::Transferred { .. } | Self::Approval { .. } | Self::ApprovalForAll { .. } => {
                topics::TRANSFER
            }
            Self::OwnerUinChanged { .. } => topics::IDENTIFIER,
            Self::DelegationUpdated { .. } | Self::DelegationCleared { .. } => topics::DELEGATION,
            Self::BaseUriChanged { .. } => topics::METADATA,
            Self::Deposited { .. } | Self::Withdrawn { .. } => topics::FUNDS,
        }
    }

    /// Pass the event refers to, if any.
    #[must_use]
    pub fn pass_id(&self) -> Option<PassId> {
        match self {
            Self::Issued { pass_id, .. }
            | Self::Transferred { pass_id, .. }
            | Self::Approval { pass_id, .. }
            | Self::OwnerUinChanged { pass_id, .. }
            | Self::DelegationUpdated { pass_id, .. }
            | Self::DelegationCleared { pass_id } => Some(*pass_id),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_delegation_active_strictly_before_expiry() {
        let grant = Delegation {
            user: addr(2),
            expires: 1_000,
        };
        assert!(grant.is_active(999));
        assert!(!grant.is_active(1_000));
        assert!(!grant.is_active(1_001));
    }

    #[test]
    fn test_pass_user_at_applies_lazy_expiry() {
        let mut pass = Pass::issued(PassId::FIRST, addr(1), 123_456);
        assert_eq!(pass.user_at(0), None);

        pass.delegation = Some(Delegation {
            user: addr(2),
            expires: 500,
        });
        assert_eq!(pass.user_at(499), Some(addr(2)));
        assert_eq!(pass.user_at(500), None);
        // Stored value is untouched by the read
        assert!(pass.delegation.is_some());
    }

    #[test]
    fn test_event_topics() {
        let issued = RegistryEvent::Issued {
            pass_id: PassId::FIRST,
            recipient: addr(1),
            owner_uin: 1,
        };
        assert_eq!(issued.topic(), crate::events::topics::ISSUANCE);
        assert_eq!(issued.pass_id(), Some(PassId::FIRST));

        let base = RegistryEvent::BaseUriChanged {
            base_uri: "ipfs://x/".to_string(),
        };
        assert_eq!(base.pass_id(), None);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = RegistryEvent::DelegationCleared {
            pass_id: PassId::new(3),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"kind":"delegation_cleared","pass_id":3}"#);
    }
}
