//! Single-token balance ledger.
//!
//! Stands in for the ERC-20 contract the aggregator and its venues hold
//! balances in. Only the operations the aggregator needs are modelled:
//! balance lookup, minting for seeding, and transfers.

use alloy::primitives::{Address, U256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error(
        "insufficient balance for {holder}: requested {requested}, but only {available} available"
    )]
    InsufficientBalance {
        holder: Address,
        requested: U256,
        available: U256,
    },
    #[error("total supply overflow minting {amount} to {holder}")]
    SupplyOverflow { holder: Address, amount: U256 },
}

/// Balances of one token keyed by holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLedger {
    token: Address,
    total_supply: U256,
    balances: BTreeMap<Address, U256>,
}

impl TokenLedger {
    pub fn new(token: Address) -> Self {
        Self {
            token,
            total_supply: U256::ZERO,
            balances: BTreeMap::new(),
        }
    }

    /// Rebuilds a ledger from saved holder balances.
    pub fn from_balances(
        token: Address,
        balances: impl IntoIterator<Item = (Address, U256)>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new(token);
        for (holder, amount) in balances {
            ledger.mint(holder, amount)?;
        }

        Ok(ledger)
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: Address) -> U256 {
        self.balances.get(&holder).copied().unwrap_or(U256::ZERO)
    }

    /// Non-zero balances in holder order.
    pub fn balances(&self) -> impl Iterator<Item = (Address, U256)> + '_ {
        self.balances
            .iter()
            .filter(|(_, balance)| !balance.is_zero())
            .map(|(holder, balance)| (*holder, *balance))
    }

    /// Credits `amount` to `to`, growing the total supply.
    ///
    /// Per-holder balances never exceed the total supply, so checking the
    /// supply is enough to rule out overflow.
    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), LedgerError> {
        let total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow { holder: to, amount })?;

        self.total_supply = total_supply;
        *self.balances.entry(to).or_insert(U256::ZERO) += amount;

        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let available = self.balance_of(from);

        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: from,
                requested: amount,
                available,
            });
        }

        if from == to || amount.is_zero() {
            return Ok(());
        }

        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_insert(U256::ZERO) += amount;

        Ok(())
    }
}
