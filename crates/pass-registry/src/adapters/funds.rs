//! # Funds Adapter
//!
//! In-memory payout ledger. A real deployment would hand payouts to the
//! settlement layer that holds the registry's account.

use crate::domain::value_objects::{Address, U256};
use crate::errors::FundsError;
use crate::ports::outbound::FundsTransfer;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Records every payout per recipient.
#[derive(Debug, Default)]
pub struct InMemoryFunds {
    paid: RwLock<HashMap<Address, U256>>,
    should_fail: AtomicBool,
}

impl InMemoryFunds {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total paid out to `to` so far.
    #[must_use]
    pub fn paid_to(&self, to: Address) -> U256 {
        self.paid.read().get(&to).copied().unwrap_or_default()
    }

    /// Make subsequent payouts fail (for failure-path tests).
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::Relaxed);
    }
}

impl FundsTransfer for InMemoryFunds {
    fn pay_out(&self, to: Address, amount: U256) -> Result<(), FundsError> {
        if self.should_fail.load(Ordering::Relaxed) {
            warn!(to = %to, amount = %amount, "Payout rejected by ledger");
            return Err(FundsError::Rejected {
                to,
                reason: "ledger configured to fail".to_string(),
            });
        }

        let mut paid = self.paid.write();
        let entry = paid.entry(to).or_insert_with(U256::zero);
        let Some(total) = entry.checked_add(amount) else {
            warn!(to = %to, amount = %amount, "Payout would overflow ledger");
            return Err(FundsError::Rejected {
                to,
                reason: "ledger total overflow".to_string(),
            });
        };
        *entry = total;
        debug!(to = %to, amount = %amount, "Payout recorded");
        Ok(())
    }
}
