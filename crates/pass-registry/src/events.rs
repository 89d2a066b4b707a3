//! # Request Envelope & Event Topics
//!
//! Defines the request/response payloads the registry service accepts and
//! the topics registry events are published under.
//!
//! ## Caller Identity
//!
//! Payloads carry NO caller field. The transport collaborator authenticates
//! the caller and passes it alongside the payload to
//! `PassRegistryService::handle_request`.

use crate::domain::entities::IssueOrder;
use crate::domain::value_objects::{Address, PassId, Timestamp, Uin, U256};
use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// REQUESTS
// =============================================================================

/// Every operation the registry exposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryRequest {
    // ---- mutations ---------------------------------------------------------
    /// Issue one pass (admin).
    Issue {
        /// Recipient.
        recipient: Address,
        /// Owner UIN.
        owner_uin: Uin,
    },
    /// Issue a batch of passes atomically (admin).
    MassIssue {
        /// Orders in id order.
        orders: Vec<IssueOrder>,
    },
    /// Parallel-array batch issuance (admin).
    MassAirdrop {
        /// Recipients.
        recipients: Vec<Address>,
        /// Owner UINs, same length as `recipients`.
        owner_uins: Vec<Uin>,
    },
    /// Rebind an owner UIN (admin).
    ChangeOwnerUin {
        /// Pass id.
        pass_id: PassId,
        /// New owner UIN.
        owner_uin: Uin,
    },
    /// Move title (owner, approved or operator).
    TransferOwnership {
        /// Pass id.
        pass_id: PassId,
        /// New owner.
        new_owner: Address,
    },
    /// Set or revoke single-pass approval (owner or operator).
    Approve {
        /// Pass id.
        pass_id: PassId,
        /// Approved principal, None to revoke.
        approved: Option<Address>,
    },
    /// Grant or revoke an operator over all of the caller's passes.
    SetApprovalForAll {
        /// Operator.
        operator: Address,
        /// Grant when true.
        approved: bool,
    },
    /// Delegate usage until `expires` (owner).
    SetDelegation {
        /// Pass id.
        pass_id: PassId,
        /// Delegated user.
        user: Address,
        /// Unix expiry, strictly in the future.
        expires: Timestamp,
        /// User UIN bound with the grant.
        user_uin: Uin,
    },
    /// Revoke the delegation (owner).
    ClearDelegation {
        /// Pass id.
        pass_id: PassId,
    },
    /// Replace the metadata base path (admin).
    SetBaseUri {
        /// New base.
        base_uri: String,
    },
    /// Send funds into custody (anyone).
    Deposit {
        /// Amount.
        amount: U256,
    },
    /// Pay the whole custodied balance to the admin (admin).
    Withdraw,

    // ---- reads -------------------------------------------------------------
    /// Owner of a pass.
    OwnerOf {
        /// Pass id.
        pass_id: PassId,
    },
    /// Owner UIN of a pass.
    OwnerUin {
        /// Pass id.
        pass_id: PassId,
    },
    /// User UIN of a pass.
    UserUin {
        /// Pass id.
        pass_id: PassId,
    },
    /// Delegated user in force now.
    UserOf {
        /// Pass id.
        pass_id: PassId,
    },
    /// Stored delegation expiry.
    UserExpires {
        /// Pass id.
        pass_id: PassId,
    },
    /// Metadata URI of a pass.
    TokenUri {
        /// Pass id.
        pass_id: PassId,
    },
    /// Passes held by an owner.
    BalanceOf {
        /// Owner.
        owner: Address,
    },
    /// Supply figures and labels.
    Info,
}

impl RegistryRequest {
    /// Whether the request mutates registry state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::OwnerOf { .. }
                | Self::OwnerUin { .. }
                | Self::UserUin { .. }
                | Self::UserOf { .. }
                | Self::UserExpires { .. }
                | Self::TokenUri { .. }
                | Self::BalanceOf { .. }
                | Self::Info
        )
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Successful result of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryReply {
    /// Mutation applied, nothing to return.
    Ack,
    /// One pass issued.
    Issued {
        /// New pass id.
        pass_id: PassId,
    },
    /// Batch issued.
    BatchIssued {
        /// New pass ids in input order.
        pass_ids: Vec<PassId>,
    },
    /// Funds paid out.
    Withdrawn {
        /// Amount paid to the admin.
        amount: U256,
    },
    /// A principal.
    Owner {
        /// Owner address.
        owner: Address,
    },
    /// An optional delegated user.
    User {
        /// User in force, if any.
        user: Option<Address>,
    },
    /// A UIN.
    Uin {
        /// Value, None if never set.
        uin: Option<Uin>,
    },
    /// An optional timestamp.
    Expiry {
        /// Stored expiry, if any.
        expires: Option<Timestamp>,
    },
    /// A metadata URI.
    Uri {
        /// Resolved URI.
        uri: String,
    },
    /// A pass count with ids.
    Holdings {
        /// Number of passes.
        balance: u64,
        /// Pass ids, ascending.
        pass_ids: Vec<PassId>,
    },
    /// Registry summary.
    Info(RegistryInfo),
}

/// Registry summary returned by [`RegistryRequest::Info`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInfo {
    /// Collection name.
    pub name: String,
    /// Collection symbol.
    pub symbol: String,
    /// Administrator.
    pub admin: Address,
    /// Passes issued.
    pub total_supply: u64,
    /// Supply cap.
    pub max_supply: u64,
    /// Metadata base path.
    pub base_uri: String,
    /// Custodied funds.
    pub balance: U256,
}

/// Failure payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Stable error code (e.g. `CapacityExceeded`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&RegistryError> for ErrorPayload {
    fn from(err: &RegistryError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Response to one request, matched by correlation id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryResponse {
    /// Correlation id of the request.
    pub correlation_id: Uuid,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<RegistryReply>,
    /// Error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl RegistryResponse {
    /// Build a response from an operation result.
    #[must_use]
    pub fn from_result(correlation_id: Uuid, result: Result<RegistryReply, RegistryError>) -> Self {
        match result {
            Ok(reply) => Self {
                correlation_id,
                success: true,
                reply: Some(reply),
                error: None,
            },
            Err(err) => Self {
                correlation_id,
                success: false,
                reply: None,
                error: Some(ErrorPayload::from(&err)),
            },
        }
    }
}

// =============================================================================
// EVENT BUS TOPICS
// =============================================================================

/// Event topics for the pass registry.
pub mod topics {
    /// Pass creation.
    pub const ISSUANCE: &str = "revpass.issuance";

    /// Title moves and approvals.
    pub const TRANSFER: &str = "revpass.transfer";

    /// Owner UIN rebinding.
    pub const IDENTIFIER: &str = "revpass.identifier";

    /// Delegation set/cleared.
    pub const DELEGATION: &str = "revpass.delegation";

    /// Base URI changes.
    pub const METADATA: &str = "revpass.metadata";

    /// Deposits and withdrawals.
    pub const FUNDS: &str = "revpass.funds";
}

// =============================================================================
// TESTS
// =============================================================================
