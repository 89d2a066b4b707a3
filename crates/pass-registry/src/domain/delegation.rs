//! # Delegation Engine
//!
//! Time-bounded usage grants, kept separate from title.
//!
//! Expiry is lazy: nothing ever clears a lapsed grant. Every read compares
//! the stored expiry against the `now` it is handed, so two reads that
//! straddle the expiry are each correct for their own clock reading.

use super::entities::{Delegation, RegistryEvent};
use super::identifier::check_user_uin_binding;
use super::registry::PassRegistry;
use super::value_objects::{Address, PassId, Role, Timestamp, Uin};
use crate::errors::RegistryError;

impl PassRegistry {
    /// Grants `user` usage of a pass until `expires`, binding `user_uin`.
    ///
    /// Owner only. The user, expiry and user UIN are written together.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `InvalidRecipient` for a zero user, or
    /// `InvalidExpiry` unless `expires > now`.
    pub fn set_delegation(
        &mut self,
        caller: Address,
        id: PassId,
        user: Address,
        expires: Timestamp,
        user_uin: Uin,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let pass = self.pass(id)?;
        self.require(caller, Role::PassOwner, Some(pass))?;
        check_user_uin_binding(user)?;
        if expires <= now {
            return Err(RegistryError::InvalidExpiry { expiry: expires, now });
        }

        let pass = self.pass_mut(id)?;
        pass.delegation = Some(Delegation { user, expires });
        pass.user_uin = Some(user_uin);

        self.record(RegistryEvent::DelegationUpdated {
            pass_id: id,
            user,
            expires,
            user_uin,
        });
        Ok(())
    }

    /// Revokes the grant before it lapses. Owner only.
    ///
    /// The user UIN keeps its last written value.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Unauthorized`.
    pub fn clear_delegation(&mut self, caller: Address, id: PassId) -> Result<(), RegistryError> {
        let pass = self.pass(id)?;
        self.require(caller, Role::PassOwner, Some(pass))?;

        self.pass_mut(id)?.delegation = None;
        self.record(RegistryEvent::DelegationCleared { pass_id: id });
        Ok(())
    }

    /// Delegated user in force at `now`; None once `now >= expiry`.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn effective_user(
        &self,
        id: PassId,
        now: Timestamp,
    ) -> Result<Option<Address>, RegistryError> {
        self.pass(id).map(|pass| pass.user_at(now))
    }

    /// Stored grant expiry, whether or not it has passed.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn delegation_expiry(&self, id: PassId) -> Result<Option<Timestamp>, RegistryError> {
        self.pass(id)
            .map(|pass| pass.delegation.map(|grant| grant.expires))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = Address::new([0xAD; 20]);
    const OWNER: Address = Address::new([1u8; 20]);
    const RENTER: Address = Address::new([2u8; 20]);
    const OTHER: Address = Address::new([3u8; 20]);

    const NOW: Timestamp = 1_700_000_000;
    const FUTURE: Timestamp = 1_893_456_000;

    fn registry_with_pass() -> (PassRegistry, PassId) {
        let mut reg = PassRegistry::new(ADMIN, 1000);
        let id = reg.issue(ADMIN, OWNER, 123_456).unwrap();
        reg.drain_events();
        (reg, id)
    }

    #[test]
    fn test_set_delegation_by_owner() {
        let (mut reg, id) = registry_with_pass();
        reg.set_delegation(OWNER, id, RENTER, FUTURE, 234_567, NOW)
            .unwrap();

        assert_eq!(reg.effective_user(id, NOW).unwrap(), Some(RENTER));
        assert_eq!(reg.effective_user(id, FUTURE - 1).unwrap(), Some(RENTER));
        assert_eq!(reg.effective_user(id, FUTURE).unwrap(), None);
        assert_eq!(reg.user_uin(id).unwrap(), Some(234_567));
        assert_eq!(reg.delegation_expiry(id).unwrap(), Some(FUTURE));
        assert_eq!(
            reg.drain_events(),
            vec![RegistryEvent::DelegationUpdated {
                pass_id: id,
                user: RENTER,
                expires: FUTURE,
                user_uin: 234_567,
            }]
        );
    }

    #[test]
    fn test_user_uin_survives_lapse() {
        let (mut reg, id) = registry_with_pass();
        reg.set_delegation(OWNER, id, RENTER, NOW + 10, 9, NOW)
            .unwrap();

        assert_eq!(reg.effective_user(id, NOW + 10).unwrap(), None);
        assert_eq!(reg.user_uin(id).unwrap(), Some(9));
        // Lapse is read-only; the stored grant is still there
        assert_eq!(reg.delegation_expiry(id).unwrap(), Some(NOW + 10));
    }

    #[test]
    fn test_expiry_must_be_strictly_future() {
        let (mut reg, id) = registry_with_pass();

        for expires in [NOW - 1, NOW] {
            assert_eq!(
                reg.set_delegation(OWNER, id, RENTER, expires, 1, NOW),
                Err(RegistryError::InvalidExpiry {
                    expiry: expires,
                    now: NOW,
                })
            );
        }
        assert_eq!(reg.effective_user(id, NOW).unwrap(), None);
        assert_eq!(reg.user_uin(id).unwrap(), None);
    }

    #[test]
    fn test_non_owner_cannot_delegate() {
        let (mut reg, id) = registry_with_pass();

        for caller in [ADMIN, RENTER] {
            let err = reg
                .set_delegation(caller, id, RENTER, FUTURE, 1, NOW)
                .unwrap_err();
            assert_eq!(
                err,
                RegistryError::Unauthorized {
                    caller,
                    required: Role::PassOwner,
                }
            );
        }
    }

    #[test]
    fn test_zero_user_rejected() {
        let (mut reg, id) = registry_with_pass();
        assert_eq!(
            reg.set_delegation(OWNER, id, Address::ZERO, FUTURE, 1, NOW),
            Err(RegistryError::InvalidRecipient(Address::ZERO))
        );
    }

    #[test]
    fn test_unknown_pass() {
        let (mut reg, _) = registry_with_pass();
        let missing = PassId::new(2);
        assert_eq!(
            reg.set_delegation(OWNER, missing, RENTER, FUTURE, 1, NOW),
            Err(RegistryError::NotFound(missing))
        );
        assert_eq!(
            reg.effective_user(missing, NOW),
            Err(RegistryError::NotFound(missing))
        );
        assert_eq!(
            reg.clear_delegation(OWNER, missing),
            Err(RegistryError::NotFound(missing))
        );
    }

    #[test]
    fn test_new_delegation_overwrites_previous() {
        let (mut reg, id) = registry_with_pass();
        reg.set_delegation(OWNER, id, RENTER, FUTURE, 1, NOW)
            .unwrap();
        reg.set_delegation(OWNER, id, OTHER, NOW + 60, 2, NOW)
            .unwrap();

        assert_eq!(reg.effective_user(id, NOW).unwrap(), Some(OTHER));
        assert_eq!(reg.effective_user(id, NOW + 60).unwrap(), None);
        assert_eq!(reg.user_uin(id).unwrap(), Some(2));
    }

    #[test]
    fn test_clear_delegation() {
        let (mut reg, id) = registry_with_pass();
        reg.set_delegation(OWNER, id, RENTER, FUTURE, 5, NOW)
            .unwrap();

        assert!(reg.clear_delegation(RENTER, id).unwrap_err().is_unauthorized());
        reg.clear_delegation(OWNER, id).unwrap();

        assert_eq!(reg.effective_user(id, NOW).unwrap(), None);
        assert_eq!(reg.delegation_expiry(id).unwrap(), None);
        assert_eq!(reg.user_uin(id).unwrap(), Some(5));
    }

    #[test]
    fn test_new_owner_inherits_delegation_rights() {
        let (mut reg, id) = registry_with_pass();
        reg.set_delegation(OWNER, id, RENTER, FUTURE, 5, NOW)
            .unwrap();
        reg.transfer_ownership(OWNER, id, OTHER).unwrap();

        // Former owner lost the right to manage the grant
        assert!(reg.clear_delegation(OWNER, id).is_err());
        reg.clear_delegation(OTHER, id).unwrap();
    }
}
