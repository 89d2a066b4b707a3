//! # Registry Store
//!
//! The single aggregate owning every pass, the supply counter, the metadata
//! base path and the custodied balance.
//!
//! All mutations take `&mut self` and validate completely before writing,
//! so a returned error always means "nothing changed". Successful mutations
//! queue a [`RegistryEvent`] which the caller drains with
//! [`PassRegistry::drain_events`].

use super::entities::{IssueOrder, Pass, RegistryEvent};
use super::metadata::compose_uri;
use super::value_objects::{Address, PassId, Role, Uin, U256};
use crate::config::RegistryConfig;
use crate::errors::{FundsError, RegistryError};
use std::collections::HashSet;

/// Default collection name.
pub const DEFAULT_NAME: &str = "RevPass";

/// Default collection symbol.
pub const DEFAULT_SYMBOL: &str = "REV";

/// The pass registry aggregate.
#[derive(Clone, Debug)]
pub struct PassRegistry {
    name: String,
    symbol: String,
    admin: Address,
    max_supply: u64,
    base_uri: String,
    /// Arena indexed by `id - 1`; ids are contiguous so the length is the supply.
    passes: Vec<Pass>,
    /// `(owner, operator)` grants.
    operators: HashSet<(Address, Address)>,
    custodied: U256,
    events: Vec<RegistryEvent>,
}

impl PassRegistry {
    /// Creates an empty registry with the default labels.
    #[must_use]
    pub fn new(admin: Address, max_supply: u64) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            admin,
            max_supply,
            base_uri: String::new(),
            passes: Vec::new(),
            operators: HashSet::new(),
            custodied: U256::zero(),
            events: Vec::new(),
        }
    }

    /// Creates an empty registry from configuration.
    #[must_use]
    pub fn from_config(config: &RegistryConfig) -> Self {
        let mut registry = Self::new(config.admin, config.max_supply);
        registry.name.clone_from(&config.name);
        registry.symbol.clone_from(&config.symbol);
        registry.base_uri.clone_from(&config.base_uri);
        registry
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Administrator principal.
    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Immutable supply cap.
    #[must_use]
    pub fn max_supply(&self) -> u64 {
        self.max_supply
    }

    /// Passes issued so far (also the current supply).
    #[must_use]
    pub fn total_issued(&self) -> u64 {
        self.passes.len() as u64
    }

    /// Passes that can still be issued.
    #[must_use]
    pub fn remaining_supply(&self) -> u64 {
        self.max_supply.saturating_sub(self.total_issued())
    }

    /// Current metadata base path.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Funds currently held by the registry.
    #[must_use]
    pub fn custodied_balance(&self) -> U256 {
        self.custodied
    }

    /// Looks up a pass.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is outside `1..=total_issued`.
    pub fn pass(&self, id: PassId) -> Result<&Pass, RegistryError> {
        id.slot()
            .and_then(|slot| self.passes.get(slot))
            .ok_or(RegistryError::NotFound(id))
    }

    pub(crate) fn pass_mut(&mut self, id: PassId) -> Result<&mut Pass, RegistryError> {
        id.slot()
            .and_then(|slot| self.passes.get_mut(slot))
            .ok_or(RegistryError::NotFound(id))
    }

    /// All passes in id order.
    pub fn passes(&self) -> impl Iterator<Item = &Pass> {
        self.passes.iter()
    }

    /// Current owner of a pass.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn owner_of(&self, id: PassId) -> Result<Address, RegistryError> {
        self.pass(id).map(|pass| pass.owner)
    }

    /// Number of passes held by `owner`.
    #[must_use]
    pub fn balance_of(&self, owner: Address) -> u64 {
        self.passes.iter().filter(|pass| pass.owner == owner).count() as u64
    }

    /// Ids of the passes held by `owner`, ascending.
    #[must_use]
    pub fn passes_of(&self, owner: Address) -> Vec<PassId> {
        self.passes
            .iter()
            .filter(|pass| pass.owner == owner)
            .map(|pass| pass.id)
            .collect()
    }

    /// Principal approved for a single pass.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn approved_for(&self, id: PassId) -> Result<Option<Address>, RegistryError> {
        self.pass(id).map(|pass| pass.approved)
    }

    /// Whether `operator` may transfer every pass of `owner`.
    #[must_use]
    pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.operators.contains(&(owner, operator))
    }

    /// Metadata URI of a pass: base path, decimal id, `.json`.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn resolve_uri(&self, id: PassId) -> Result<String, RegistryError> {
        self.pass(id)?;
        Ok(compose_uri(&self.base_uri, id))
    }

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================

    /// Whether `caller` holds `role`, relative to `pass` for pass-scoped roles.
    #[must_use]
    pub fn holds_role(&self, caller: Address, role: Role, pass: Option<&Pass>) -> bool {
        match (role, pass) {
            (Role::Admin, _) => caller == self.admin,
            (Role::PassOwner, Some(pass)) => caller == pass.owner,
            (Role::TransferAgent, Some(pass)) => {
                caller == pass.owner
                    || pass.approved == Some(caller)
                    || self.is_approved_for_all(pass.owner, caller)
            }
            (Role::PassOwner | Role::TransferAgent, None) => false,
        }
    }

    pub(crate) fn require(
        &self,
        caller: Address,
        role: Role,
        pass: Option<&Pass>,
    ) -> Result<(), RegistryError> {
        if self.holds_role(caller, role, pass) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized {
                caller,
                required: role,
            })
        }
    }

    // =========================================================================
    // ISSUANCE
    // =========================================================================

    /// Issues one pass to `recipient`. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidRecipient` for the zero address, or
    /// `CapacityExceeded` when the cap is reached.
    pub fn issue(
        &mut self,
        caller: Address,
        recipient: Address,
        owner_uin: Uin,
    ) -> Result<PassId, RegistryError> {
        self.require(caller, Role::Admin, None)?;
        check_recipient(recipient)?;
        self.check_capacity(1)?;
        Ok(self.mint(IssueOrder::new(recipient, owner_uin)))
    }

    /// Fails unless `requested` more passes fit under the cap.
    pub(crate) fn check_capacity(&self, requested: u64) -> Result<(), RegistryError> {
        let issued = self.total_issued();
        match issued.checked_add(requested) {
            Some(total) if total <= self.max_supply => Ok(()),
            _ => Err(RegistryError::CapacityExceeded {
                issued,
                requested,
                max_supply: self.max_supply,
            }),
        }
    }

    /// Appends a pass. Callers have already validated role, recipient and cap.
    pub(crate) fn mint(&mut self, order: IssueOrder) -> PassId {
        let id = PassId::new(self.total_issued() + 1);
        self.passes
            .push(Pass::issued(id, order.recipient, order.owner_uin));
        self.events.push(RegistryEvent::Issued {
            pass_id: id,
            recipient: order.recipient,
            owner_uin: order.owner_uin,
        });
        id
    }

    // =========================================================================
    // TRANSFER
    // =========================================================================

    /// Moves title of a pass to `new_owner`.
    ///
    /// Delegation and both UINs are kept; the single-pass approval is cleared.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized` unless the caller is the owner, the approved
    /// principal or an operator of the owner, `InvalidRecipient` for zero.
    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        id: PassId,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        let pass = self.pass(id)?;
        self.require(caller, Role::TransferAgent, Some(pass))?;
        check_recipient(new_owner)?;

        let pass = self.pass_mut(id)?;
        let from = pass.owner;
        pass.owner = new_owner;
        pass.approved = None;

        self.events.push(RegistryEvent::Transferred {
            pass_id: id,
            from,
            to: new_owner,
        });
        Ok(())
    }

    /// Sets or revokes the single-pass approval.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `Unauthorized` unless the caller is the owner or an
    /// operator of the owner.
    pub fn approve(
        &mut self,
        caller: Address,
        id: PassId,
        approved: Option<Address>,
    ) -> Result<(), RegistryError> {
        let pass = self.pass(id)?;
        let owner = pass.owner;
        if caller != owner && !self.is_approved_for_all(owner, caller) {
            return Err(RegistryError::Unauthorized {
                caller,
                required: Role::PassOwner,
            });
        }
        let approved = approved.filter(|principal| !principal.is_zero());

        self.pass_mut(id)?.approved = approved;
        self.events.push(RegistryEvent::Approval {
            pass_id: id,
            owner,
            approved,
        });
        Ok(())
    }

    /// Grants or revokes `operator` over every pass of the caller.
    ///
    /// # Errors
    ///
    /// `InvalidRecipient` if the operator is zero or the caller itself.
    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<(), RegistryError> {
        if operator.is_zero() || operator == caller {
            return Err(RegistryError::InvalidRecipient(operator));
        }
        if approved {
            self.operators.insert((caller, operator));
        } else {
            self.operators.remove(&(caller, operator));
        }
        self.events.push(RegistryEvent::ApprovalForAll {
            owner: caller,
            operator,
            approved,
        });
        Ok(())
    }

    // =========================================================================
    // METADATA
    // =========================================================================

    /// Replaces the metadata base path. Admin only.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-admin callers.
    pub fn set_base_uri(&mut self, caller: Address, base_uri: String) -> Result<(), RegistryError> {
        self.require(caller, Role::Admin, None)?;
        self.base_uri.clone_from(&base_uri);
        self.events.push(RegistryEvent::BaseUriChanged { base_uri });
        Ok(())
    }

    // =========================================================================
    // FUNDS
    // =========================================================================

    /// Takes `amount` into custody.
    ///
    /// # Errors
    ///
    /// `InvalidAmount` for zero, `BalanceOverflow` if the custodied balance
    /// cannot hold `amount`.
    pub fn deposit(&mut self, from: Address, amount: U256) -> Result<(), RegistryError> {
        if amount.is_zero() {
            return Err(RegistryError::InvalidAmount(amount));
        }
        self.custodied = self
            .custodied
            .checked_add(amount)
            .ok_or(RegistryError::BalanceOverflow {
                balance: self.custodied,
                amount,
            })?;
        self.events.push(RegistryEvent::Deposited { from, amount });
        Ok(())
    }

    /// Pays the whole custodied balance to the admin through `payout`.
    ///
    /// The balance is only zeroed once `payout` succeeds.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NothingToWithdraw` on a zero balance, or
    /// `FundsTransfer` when `payout` fails.
    pub fn withdraw<P>(&mut self, caller: Address, payout: P) -> Result<U256, RegistryError>
    where
        P: FnOnce(Address, U256) -> Result<(), FundsError>,
    {
        self.require(caller, Role::Admin, None)?;
        let amount = self.custodied;
        if amount.is_zero() {
            return Err(RegistryError::NothingToWithdraw);
        }
        payout(self.admin, amount)?;

        self.custodied = U256::zero();
        self.events.push(RegistryEvent::Withdrawn {
            to: self.admin,
            amount,
        });
        Ok(amount)
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    pub(crate) fn record(&mut self, event: RegistryEvent) {
        self.events.push(event);
    }

    /// Takes the events queued by successful mutations, oldest first.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Recipients and delegated users must be real principals.
pub(crate) fn check_recipient(recipient: Address) -> Result<(), RegistryError> {
    if recipient.is_zero() {
        Err(RegistryError::InvalidRecipient(recipient))
    } else {
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = Address::new([0xAD; 20]);
    const ADDR1: Address = Address::new([1u8; 20]);
    const ADDR2: Address = Address::new([2u8; 20]);
    const ADDR3: Address = Address::new([3u8; 20]);

    fn registry(max_supply: u64) -> PassRegistry {
        PassRegistry::new(ADMIN, max_supply)
    }

    #[test]
    fn test_issue_first_pass() {
        let mut reg = registry(1000);
        let id = reg.issue(ADMIN, ADDR1, 123_456).unwrap();

        assert_eq!(id, PassId::FIRST);
        assert_eq!(reg.total_issued(), 1);
        assert_eq!(reg.owner_of(id).unwrap(), ADDR1);
        assert_eq!(reg.pass(id).unwrap().owner_uin, 123_456);
        assert_eq!(
            reg.drain_events(),
            vec![RegistryEvent::Issued {
                pass_id: id,
                recipient: ADDR1,
                owner_uin: 123_456,
            }]
        );
    }

    #[test]
    fn test_issue_requires_admin() {
        let mut reg = registry(1000);
        let err = reg.issue(ADDR1, ADDR1, 1).unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(reg.total_issued(), 0);
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn test_issue_rejects_zero_recipient() {
        let mut reg = registry(10);
        assert_eq!(
            reg.issue(ADMIN, Address::ZERO, 1),
            Err(RegistryError::InvalidRecipient(Address::ZERO))
        );
        assert_eq!(reg.total_issued(), 0);
    }

    #[test]
    fn test_issue_stops_at_cap() {
        let mut reg = registry(2);
        reg.issue(ADMIN, ADDR1, 1).unwrap();
        reg.issue(ADMIN, ADDR1, 2).unwrap();

        let err = reg.issue(ADMIN, ADDR1, 3).unwrap_err();
        assert_eq!(
            err,
            RegistryError::CapacityExceeded {
                issued: 2,
                requested: 1,
                max_supply: 2,
            }
        );
        assert_eq!(reg.total_issued(), 2);
        assert_eq!(reg.remaining_supply(), 0);
    }

    #[test]
    fn test_zero_cap_registry_issues_nothing() {
        let mut reg = registry(0);
        assert!(matches!(
            reg.issue(ADMIN, ADDR1, 1),
            Err(RegistryError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_unknown_pass_not_found() {
        let reg = registry(10);
        assert_eq!(
            reg.owner_of(PassId::new(0)),
            Err(RegistryError::NotFound(PassId::new(0)))
        );
        assert_eq!(
            reg.owner_of(PassId::FIRST),
            Err(RegistryError::NotFound(PassId::FIRST))
        );
    }

    #[test]
    fn test_transfer_by_owner_keeps_rental_state() {
        let mut reg = registry(10);
        let id = reg.issue(ADMIN, ADDR1, 11).unwrap();
        reg.set_delegation(ADDR1, id, ADDR2, 5_000, 22, 100).unwrap();
        reg.drain_events();

        reg.transfer_ownership(ADDR1, id, ADDR3).unwrap();

        let pass = reg.pass(id).unwrap();
        assert_eq!(pass.owner, ADDR3);
        assert_eq!(pass.owner_uin, 11);
        assert_eq!(pass.user_uin, Some(22));
        assert_eq!(pass.user_at(100), Some(ADDR2));
        assert_eq!(
            reg.drain_events(),
            vec![RegistryEvent::Transferred {
                pass_id: id,
                from: ADDR1,
                to: ADDR3,
            }]
        );
    }

    #[test]
    fn test_transfer_by_stranger_rejected() {
        let mut reg = registry(10);
        let id = reg.issue(ADMIN, ADDR1, 1).unwrap();

        let err = reg.transfer_ownership(ADDR2, id, ADDR2).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unauthorized {
                caller: ADDR2,
                required: Role::TransferAgent,
            }
        );
        // The admin holds no title either
        assert!(reg.transfer_ownership(ADMIN, id, ADDR2).is_err());
        assert_eq!(reg.owner_of(id).unwrap(), ADDR1);
    }

    #[test]
    fn test_transfer_to_zero_rejected() {
        let mut reg = registry(10);
        let id = reg.issue(ADMIN, ADDR1, 1).unwrap();
        assert_eq!(
            reg.transfer_ownership(ADDR1, id, Address::ZERO),
            Err(RegistryError::InvalidRecipient(Address::ZERO))
        );
        assert_eq!(reg.owner_of(id).unwrap(), ADDR1);
    }

    #[test]
    fn test_approved_principal_can_transfer_once() {
        let mut reg = registry(10);
        let id = reg.issue(ADMIN, ADDR1, 1).unwrap();
        reg.approve(ADDR1, id, Some(ADDR2)).unwrap();
        assert_eq!(reg.approved_for(id).unwrap(), Some(ADDR2));

        reg.transfer_ownership(ADDR2, id, ADDR3).unwrap();
        assert_eq!(reg.owner_of(id).unwrap(), ADDR3);
        // Approval is consumed by the transfer
        assert_eq!(reg.approved_for(id).unwrap(), None);
        assert!(reg.transfer_ownership(ADDR2, id, ADDR2).is_err());
    }

    #[test]
    fn test_operator_can_transfer_and_approve() {
        let mut reg = registry(10);
        let first = reg.issue(ADMIN, ADDR1, 1).unwrap();
        let second = reg.issue(ADMIN, ADDR1, 2).unwrap();
        reg.set_approval_for_all(ADDR1, ADDR2, true).unwrap();
        assert!(reg.is_approved_for_all(ADDR1, ADDR2));

        reg.transfer_ownership(ADDR2, first, ADDR3).unwrap();
        reg.approve(ADDR2, second, Some(ADDR3)).unwrap();
        assert_eq!(reg.approved_for(second).unwrap(), Some(ADDR3));

        reg.set_approval_for_all(ADDR1, ADDR2, false).unwrap();
        assert!(reg.transfer_ownership(ADDR2, second, ADDR2).is_err());
    }

    #[test]
    fn test_set_approval_for_all_rejects_self() {
        let mut reg = registry(10);
        assert_eq!(
            reg.set_approval_for_all(ADDR1, ADDR1, true),
            Err(RegistryError::InvalidRecipient(ADDR1))
        );
    }

    #[test]
    fn test_approve_by_stranger_rejected() {
        let mut reg = registry(10);
        let id = reg.issue(ADMIN, ADDR1, 1).unwrap();
        assert!(reg.approve(ADDR2, id, Some(ADDR2)).unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_balance_and_passes_of() {
        let mut reg = registry(10);
        reg.issue(ADMIN, ADDR1, 1).unwrap();
        reg.issue(ADMIN, ADDR2, 2).unwrap();
        reg.issue(ADMIN, ADDR1, 3).unwrap();

        assert_eq!(reg.balance_of(ADDR1), 2);
        assert_eq!(reg.passes_of(ADDR1), vec![PassId::new(1), PassId::new(3)]);
        assert_eq!(reg.balance_of(ADDR3), 0);
    }

    #[test]
    fn test_set_base_uri_admin_only() {
        let mut reg = registry(10);
        assert!(reg
            .set_base_uri(ADDR1, "https://evil/".to_string())
            .unwrap_err()
            .is_unauthorized());

        reg.set_base_uri(ADMIN, "https://example.com/metadata/".to_string())
            .unwrap();
        assert_eq!(reg.base_uri(), "https://example.com/metadata/");
    }

    #[test]
    fn test_resolve_uri() {
        let mut reg = registry(10);
        reg.set_base_uri(ADMIN, "https://example.com/metadata/".to_string())
            .unwrap();
        assert_eq!(
            reg.resolve_uri(PassId::FIRST),
            Err(RegistryError::NotFound(PassId::FIRST))
        );

        reg.issue(ADMIN, ADDR1, 1).unwrap();
        assert_eq!(
            reg.resolve_uri(PassId::FIRST).unwrap(),
            "https://example.com/metadata/1.json"
        );
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let mut reg = registry(10);
        reg.deposit(ADDR1, U256::from(1_000u64)).unwrap();
        reg.deposit(ADDR2, U256::from(500u64)).unwrap();
        assert_eq!(reg.custodied_balance(), U256::from(1_500u64));

        let mut paid = None;
        let amount = reg
            .withdraw(ADMIN, |to, amount| {
                paid = Some((to, amount));
                Ok(())
            })
            .unwrap();

        assert_eq!(amount, U256::from(1_500u64));
        assert_eq!(paid, Some((ADMIN, U256::from(1_500u64))));
        assert!(reg.custodied_balance().is_zero());
    }

    #[test]
    fn test_deposit_overflow_rejected() {
        let mut reg = registry(10);
        reg.deposit(ADDR1, U256::MAX).unwrap();
        reg.drain_events();

        assert_eq!(
            reg.deposit(ADDR2, U256::from(5u64)),
            Err(RegistryError::BalanceOverflow {
                balance: U256::MAX,
                amount: U256::from(5u64),
            })
        );
        assert_eq!(reg.custodied_balance(), U256::MAX);
        assert!(reg.drain_events().is_empty());

        let paid = reg.withdraw(ADMIN, |_, _| Ok(())).unwrap();
        assert_eq!(paid, U256::MAX);
    }

    #[test]
    fn test_withdraw_rules() {
        let mut reg = registry(10);
        assert_eq!(
            reg.withdraw(ADMIN, |_, _| Ok(())),
            Err(RegistryError::NothingToWithdraw)
        );

        reg.deposit(ADDR1, U256::from(7u64)).unwrap();
        assert!(reg.withdraw(ADDR1, |_, _| Ok(())).unwrap_err().is_unauthorized());
        assert_eq!(reg.custodied_balance(), U256::from(7u64));
    }

    #[test]
    fn test_failed_payout_keeps_balance() {
        let mut reg = registry(10);
        reg.deposit(ADDR1, U256::from(7u64)).unwrap();
        reg.drain_events();

        let err = reg
            .withdraw(ADMIN, |_, _| Err(FundsError::Unavailable))
            .unwrap_err();
        assert_eq!(err, RegistryError::FundsTransfer(FundsError::Unavailable));
        assert_eq!(reg.custodied_balance(), U256::from(7u64));
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let mut reg = registry(10);
        assert_eq!(
            reg.deposit(ADDR1, U256::zero()),
            Err(RegistryError::InvalidAmount(U256::zero()))
        );
    }

    #[test]
    fn test_from_config_labels() {
        let config = RegistryConfig {
            name: "Backstage".to_string(),
            symbol: "BKS".to_string(),
            max_supply: 5,
            base_uri: "ipfs://cid/".to_string(),
            admin: ADMIN,
        };
        let reg = PassRegistry::from_config(&config);
        assert_eq!(reg.name(), "Backstage");
        assert_eq!(reg.symbol(), "BKS");
        assert_eq!(reg.max_supply(), 5);
        assert_eq!(reg.base_uri(), "ipfs://cid/");
        assert_eq!(reg.admin(), ADMIN);
    }
}
