//! # Batch Issuance
//!
//! All-or-nothing issuance of many passes in one call.
//!
//! The whole batch is checked against the cap and every recipient before the
//! first pass is written; ids are then assigned consecutively in input order.

use super::entities::IssueOrder;
use super::registry::{check_recipient, PassRegistry};
use super::value_objects::{Address, PassId, Role, Uin};
use crate::errors::RegistryError;

impl PassRegistry {
    /// Issues one pass per order, in order. Admin only.
    ///
    /// An empty batch succeeds and issues nothing.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InvalidRecipient` if any recipient is zero, or
    /// `CapacityExceeded` if the batch does not fit; no pass is created
    /// in any failure case.
    pub fn mass_issue(
        &mut self,
        caller: Address,
        orders: &[IssueOrder],
    ) -> Result<Vec<PassId>, RegistryError> {
        self.require(caller, Role::Admin, None)?;
        orders
            .iter()
            .try_for_each(|order| check_recipient(order.recipient))?;
        self.check_capacity(orders.len() as u64)?;

        Ok(orders.iter().map(|order| self.mint(*order)).collect())
    }

    /// Parallel-array form of [`PassRegistry::mass_issue`].
    ///
    /// # Errors
    ///
    /// `LengthMismatch` when the arrays differ in length, otherwise as
    /// [`PassRegistry::mass_issue`].
    pub fn mass_airdrop(
        &mut self,
        caller: Address,
        recipients: &[Address],
        owner_uins: &[Uin],
    ) -> Result<Vec<PassId>, RegistryError> {
        let orders = zip_orders(recipients, owner_uins)?;
        self.mass_issue(caller, &orders)
    }
}

/// Pairs recipients with UINs, rejecting ragged input.
pub fn zip_orders(
    recipients: &[Address],
    owner_uins: &[Uin],
) -> Result<Vec<IssueOrder>, RegistryError> {
    if recipients.len() != owner_uins.len() {
        return Err(RegistryError::LengthMismatch {
            recipients: recipients.len(),
            uins: owner_uins.len(),
        });
    }
    Ok(recipients
        .iter()
        .zip(owner_uins)
        .map(|(recipient, uin)| IssueOrder::new(*recipient, *uin))
        .collect())
}
