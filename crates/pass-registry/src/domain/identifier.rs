//! # Identifier Binding
//!
//! Field-level write authority for the two UINs.
//!
//! | Field | Writer | When |
//! |-------|--------|------|
//! | `owner_uin` | admin | at issuance, or via `change_owner_uin` |
//! | `user_uin` | pass owner | only together with a delegation |

use super::entities::RegistryEvent;
use super::registry::{check_recipient, PassRegistry};
use super::value_objects::{Address, PassId, Role, Uin};
use crate::errors::RegistryError;

/// A user UIN is only ever bound to a real delegated user.
pub(crate) fn check_user_uin_binding(user: Address) -> Result<(), RegistryError> {
    check_recipient(user)
}

impl PassRegistry {
    /// Rebinds the owner UIN of a pass. Admin only.
    ///
    /// Owner and delegation are untouched.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-admin callers, `NotFound` for unknown ids.
    pub fn change_owner_uin(
        &mut self,
        caller: Address,
        id: PassId,
        owner_uin: Uin,
    ) -> Result<(), RegistryError> {
        self.require(caller, Role::Admin, None)?;
        let pass = self.pass_mut(id)?;
        let previous = std::mem::replace(&mut pass.owner_uin, owner_uin);

        self.record(RegistryEvent::OwnerUinChanged {
            pass_id: id,
            previous,
            current: owner_uin,
        });
        Ok(())
    }

    /// Owner UIN of a pass.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn owner_uin(&self, id: PassId) -> Result<Uin, RegistryError> {
        self.pass(id).map(|pass| pass.owner_uin)
    }

    /// User UIN of a pass; None until a delegation has been set.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown ids.
    pub fn user_uin(&self, id: PassId) -> Result<Option<Uin>, RegistryError> {
        self.pass(id).map(|pass| pass.user_uin)
    }
}
