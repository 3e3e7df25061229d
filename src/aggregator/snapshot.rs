//! Point-in-time view of where the aggregated funds sit.
//!
//! Snapshots are never cached: any actor can move funds into or out of a
//! venue between operations, so each operation reads balances afresh.

use alloy::primitives::{Address, U256};

use super::registry::DepositRegistry;
use crate::amount::{checked_add, checked_sum};
use crate::environment::PcvEnvironment;
use crate::error::AggregatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositBalance {
    pub deposit: Address,
    pub balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Idle funds held by the aggregator itself.
    pub aggregator: U256,
    /// Per-deposit balances in registry order.
    pub deposits: Vec<DepositBalance>,
    /// Sum of `deposits`.
    pub underlying: U256,
}

impl BalanceSnapshot {
    pub(crate) fn take(
        aggregator: Address,
        registry: &DepositRegistry,
        env: &PcvEnvironment,
    ) -> Result<Self, AggregatorError> {
        let deposits = registry
            .entries()
            .iter()
            .map(|entry| {
                Ok(DepositBalance {
                    deposit: entry.deposit,
                    balance: env.venue_balance(entry.deposit)?,
                })
            })
            .collect::<Result<Vec<_>, AggregatorError>>()?;

        let underlying = checked_sum(deposits.iter().map(|deposit| deposit.balance))?;

        Ok(Self {
            aggregator: env.balance_of(aggregator),
            deposits,
            underlying,
        })
    }

    pub fn total(&self) -> Result<U256, AggregatorError> {
        Ok(checked_add(self.aggregator, self.underlying)?)
    }

    pub fn balance_of(&self, deposit: Address) -> Option<U256> {
        self.deposits
            .iter()
            .find(|entry| entry.deposit == deposit)
            .map(|entry| entry.balance)
    }
}
