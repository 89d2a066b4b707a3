//! # Driving Ports (API - Inbound)
//!
//! The registry's contract surface. Every mutating method takes the
//! authenticated `caller`; authorization is checked against it, never
//! against anything in the payload.

use crate::domain::entities::IssueOrder;
use crate::domain::value_objects::{Address, PassId, Timestamp, Uin, U256};
use crate::errors::RegistryError;
use crate::events::RegistryInfo;
use async_trait::async_trait;

/// Primary API of the pass registry.
///
/// ## Usage
///
/// ```ignore
/// let id = api.issue(admin, holder, 123_456).await?;
/// api.set_delegation(holder, id, renter, expires, 234_567).await?;
/// assert_eq!(api.user_of(id).await?, Some(renter));
/// ```
#[async_trait]
pub trait PassRegistryApi: Send + Sync {
    // ---- Registry Store ---------------------------------------------------

    /// Issue one pass (admin only).
    async fn issue(
        &self,
        caller: Address,
        recipient: Address,
        owner_uin: Uin,
    ) -> Result<PassId, RegistryError>;

    /// Rebind the owner UIN (admin only).
    async fn change_owner_uin(
        &self,
        caller: Address,
        pass_id: PassId,
        owner_uin: Uin,
    ) -> Result<(), RegistryError>;

    /// Move title to `new_owner` (owner, approved or operator).
    async fn transfer_ownership(
        &self,
        caller: Address,
        pass_id: PassId,
        new_owner: Address,
    ) -> Result<(), RegistryError>;

    /// Set or revoke single-pass approval.
    async fn approve(
        &self,
        caller: Address,
        pass_id: PassId,
        approved: Option<Address>,
    ) -> Result<(), RegistryError>;

    /// Grant or revoke an operator over all the caller's passes.
    async fn set_approval_for_all(
        &self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), RegistryError>;

    /// Replace the metadata base path (admin only).
    async fn set_base_uri(&self, caller: Address, base_uri: String) -> Result<(), RegistryError>;

    /// Take funds into custody.
    async fn deposit(&self, from: Address, amount: U256) -> Result<(), RegistryError>;

    /// Pay the whole balance to the admin (admin only).
    async fn withdraw(&self, caller: Address) -> Result<U256, RegistryError>;

    /// Metadata URI of an issued pass.
    async fn resolve_uri(&self, pass_id: PassId) -> Result<String, RegistryError>;

    /// Current owner.
    async fn owner_of(&self, pass_id: PassId) -> Result<Address, RegistryError>;

    /// Owner UIN.
    async fn owner_uin(&self, pass_id: PassId) -> Result<Uin, RegistryError>;

    /// Number of passes held and their ids.
    async fn holdings(&self, owner: Address) -> (u64, Vec<PassId>);

    /// Supply figures and labels.
    async fn info(&self) -> RegistryInfo;

    // ---- Delegation Engine ------------------------------------------------

    /// Delegate usage until `expires` (owner only).
    async fn set_delegation(
        &self,
        caller: Address,
        pass_id: PassId,
        user: Address,
        expires: Timestamp,
        user_uin: Uin,
    ) -> Result<(), RegistryError>;

    /// Revoke the delegation (owner only).
    async fn clear_delegation(&self, caller: Address, pass_id: PassId) -> Result<(), RegistryError>;

    /// Delegated user in force at the clock's current time.
    async fn user_of(&self, pass_id: PassId) -> Result<Option<Address>, RegistryError>;

    /// Delegated user in force at an explicit time.
    async fn effective_user(
        &self,
        pass_id: PassId,
        now: Timestamp,
    ) -> Result<Option<Address>, RegistryError>;

    /// Stored delegation expiry.
    async fn user_expires(&self, pass_id: PassId) -> Result<Option<Timestamp>, RegistryError>;

    /// User UIN; None until a delegation was set.
    async fn user_uin(&self, pass_id: PassId) -> Result<Option<Uin>, RegistryError>;

    // ---- Batch Issuance ---------------------------------------------------

    /// Issue a batch atomically (admin only).
    async fn mass_issue(
        &self,
        caller: Address,
        orders: Vec<IssueOrder>,
    ) -> Result<Vec<PassId>, RegistryError>;

    /// Parallel-array batch issuance (admin only).
    async fn mass_airdrop(
        &self,
        caller: Address,
        recipients: Vec<Address>,
        owner_uins: Vec<Uin>,
    ) -> Result<Vec<PassId>, RegistryError>;
}
